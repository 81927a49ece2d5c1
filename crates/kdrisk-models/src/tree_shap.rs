//! Exact path-dependent TreeSHAP
//!
//! Polynomial-time Shapley values for a single tree (Lundberg et al., 2018).
//! Each root-to-leaf walk carries the set of unique features split on so far
//! together with the fraction of "zero" (feature absent, follow cover) and
//! "one" (feature present, follow `x`) paths that reach the node. Conditional
//! expectations use node covers, so the result explains the model's raw
//! output and sums to `f(x) - E[f(x)]`.

use crate::ensemble::{DecisionRule, Node, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the root placeholder
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Add the Shapley contributions of one tree to `phi`.
///
/// `phi` is indexed `[output][feature]`, one row per leaf value.
pub fn accumulate(tree: &Tree, rule: DecisionRule, x: &[f64], phi: &mut [Vec<f64>]) {
    let walk = Walk { tree, rule, x };
    walk.recurse(0, &[], 1.0, 1.0, None, phi);
}

struct Walk<'a> {
    tree: &'a Tree,
    rule: DecisionRule,
    x: &'a [f64],
}

impl Walk<'_> {
    fn recurse(
        &self,
        index: usize,
        parent_path: &[PathElement],
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
        phi: &mut [Vec<f64>],
    ) {
        let mut path = parent_path.to_vec();
        extend(&mut path, zero_fraction, one_fraction, feature);

        match &self.tree.nodes[index] {
            Node::Leaf { values, .. } => {
                for i in 1..path.len() {
                    let element = path[i];
                    let Some(f) = element.feature else { continue };
                    let scale =
                        unwound_sum(&path, i) * (element.one_fraction - element.zero_fraction);
                    for (row, value) in phi.iter_mut().zip(values) {
                        row[f] += scale * value;
                    }
                }
            }
            Node::Split {
                feature: split,
                threshold,
                left,
                right,
                default_left,
                cover,
            } => {
                let (hot, cold) =
                    if self
                        .rule
                        .goes_left(self.x[*split], *threshold, *default_left)
                    {
                        (*left, *right)
                    } else {
                        (*right, *left)
                    };
                let hot_zero = self.tree.nodes[hot].cover() / cover;
                let cold_zero = self.tree.nodes[cold].cover() / cover;

                // A feature split on twice is tracked once; undo the earlier
                // split and carry its fractions forward.
                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = path.iter().position(|e| e.feature == Some(*split)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind(&mut path, k);
                }

                self.recurse(
                    hot,
                    &path,
                    hot_zero * incoming_zero,
                    incoming_one,
                    Some(*split),
                    phi,
                );
                self.recurse(
                    cold,
                    &path,
                    cold_zero * incoming_zero,
                    0.0,
                    Some(*split),
                    phi,
                );
            }
        }
    }
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].weight += one_fraction * path[i].weight * (fi + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * path[i].weight * (d - fi) / (d + 1.0);
    }
}

fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next = path[depth].weight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next * (d + 1.0) / ((fi + 1.0) * one);
            next = tmp - path[i].weight * zero * (d - fi) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one != 0.0 {
            let tmp = next * (d + 1.0) / ((fi + 1.0) * one);
            total += tmp;
            next = path[i].weight - tmp * zero * (d - fi) / (d + 1.0);
        } else {
            total += path[i].weight / (zero * (d - fi) / (d + 1.0));
        }
    }

    total
}

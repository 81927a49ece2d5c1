//! Tree ensemble model artifacts
//!
//! Gradient-boosted and random-forest classifiers exported to JSON. Nodes are
//! stored flat per tree with forward-pointing child indices, so evaluation
//! always terminates.

use kdrisk_core::{Error, OutputSpace, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative tolerance for `cover(left) + cover(right) == cover(split)`
const COVER_TOLERANCE: f64 = 1e-6;

/// How leaf outputs combine into class probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Sum one-value leaves onto `base_score`, then apply the logistic link
    BinaryLogistic,
    /// Average two-value class-probability leaves across trees
    MeanProbability,
}

impl Objective {
    /// Number of values each leaf carries
    pub fn leaf_arity(&self) -> usize {
        match self {
            Self::BinaryLogistic => 1,
            Self::MeanProbability => 2,
        }
    }

    pub fn output_space(&self) -> OutputSpace {
        match self {
            Self::BinaryLogistic => OutputSpace::LogOdds,
            Self::MeanProbability => OutputSpace::Probability,
        }
    }
}

/// Comparison applied at split nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionRule {
    /// `x < threshold` goes left (XGBoost)
    #[default]
    Lt,
    /// `x <= threshold` goes left (scikit-learn)
    Le,
}

impl DecisionRule {
    pub fn goes_left(&self, value: f64, threshold: f64, default_left: bool) -> bool {
        if value.is_nan() {
            return default_left;
        }
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Branch taken when the feature is missing (NaN)
        #[serde(default)]
        default_left: bool,
        cover: f64,
    },
    Leaf {
        values: Vec<f64>,
        cover: f64,
    },
}

impl Node {
    /// Training weight that reached this node
    pub fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf values reached by `x`
    pub fn leaf(&self, x: &[f64], rule: DecisionRule) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { values, .. } => return values,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                    ..
                } => {
                    index = if rule.goes_left(x[*feature], *threshold, *default_left) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Cover-weighted mean leaf value, per output
    pub fn expected_value(&self, arity: usize) -> Vec<f64> {
        let mut expected = vec![0.0; arity];
        self.accumulate_expected(0, 1.0, &mut expected);
        expected
    }

    fn accumulate_expected(&self, index: usize, weight: f64, expected: &mut [f64]) {
        match &self.nodes[index] {
            Node::Leaf { values, .. } => {
                for (e, v) in expected.iter_mut().zip(values) {
                    *e += weight * v;
                }
            }
            Node::Split {
                left, right, cover, ..
            } => {
                let left_weight = self.nodes[*left].cover() / cover;
                let right_weight = self.nodes[*right].cover() / cover;
                self.accumulate_expected(*left, weight * left_weight, expected);
                self.accumulate_expected(*right, weight * right_weight, expected);
            }
        }
    }

    fn validate(&self, tree_index: usize, n_features: usize, arity: usize) -> Result<()> {
        let fail = |node: usize, msg: String| {
            Err(Error::artifact(format!(
                "tree {} node {}: {}",
                tree_index, node, msg
            )))
        };

        if self.nodes.is_empty() {
            return Err(Error::artifact(format!("tree {} has no nodes", tree_index)));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !(cover.is_finite() && cover > 0.0) {
                return fail(i, format!("cover must be positive, got {}", cover));
            }

            match node {
                Node::Leaf { values, .. } => {
                    if values.len() != arity {
                        return fail(
                            i,
                            format!("leaf has {} values, objective needs {}", values.len(), arity),
                        );
                    }
                    if values.iter().any(|v| !v.is_finite()) {
                        return fail(i, "leaf value is not finite".to_string());
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return fail(
                            i,
                            format!("feature {} out of range ({} features)", feature, n_features),
                        );
                    }
                    if !threshold.is_finite() {
                        return fail(i, "threshold is not finite".to_string());
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return fail(i, format!("child index {} is invalid", child));
                        }
                    }
                    if left == right {
                        return fail(i, "left and right children are the same node".to_string());
                    }

                    let children = self.nodes[*left].cover() + self.nodes[*right].cover();
                    if (children - cover).abs() > COVER_TOLERANCE * cover {
                        return fail(
                            i,
                            format!("children cover {} does not sum to {}", children, cover),
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// A trained tree ensemble classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub name: String,

    /// Training column names, when the exporter recorded them
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,

    pub n_features: usize,

    pub objective: Objective,

    #[serde(default)]
    pub decision: DecisionRule,

    /// Margin offset for `binary_logistic`
    #[serde(default)]
    pub base_score: f64,

    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Parse and validate an ensemble from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let ensemble: Self = serde_json::from_str(json)?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Load and validate an ensemble file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Structural checks run once at load time
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(Error::artifact(format!("{}: n_features is zero", self.name)));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(Error::artifact(format!(
                    "{}: {} feature names for {} features",
                    self.name,
                    names.len(),
                    self.n_features
                )));
            }
        }
        if self.trees.is_empty() {
            return Err(Error::artifact(format!("{}: ensemble has no trees", self.name)));
        }
        if !self.base_score.is_finite() {
            return Err(Error::artifact(format!("{}: base_score is not finite", self.name)));
        }

        let arity = self.objective.leaf_arity();
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_features, arity)?;
        }

        Ok(())
    }

    /// Untransformed model output: margin for logistic, class probabilities
    /// for forests
    pub fn raw_output(&self, x: &[f64]) -> Vec<f64> {
        match self.objective {
            Objective::BinaryLogistic => {
                let margin: f64 = self
                    .trees
                    .iter()
                    .map(|t| t.leaf(x, self.decision)[0])
                    .sum();
                vec![self.base_score + margin]
            }
            Objective::MeanProbability => {
                let mut sums = vec![0.0; 2];
                for tree in &self.trees {
                    for (s, v) in sums.iter_mut().zip(tree.leaf(x, self.decision)) {
                        *s += v;
                    }
                }
                let n = self.trees.len() as f64;
                sums.into_iter().map(|s| s / n).collect()
            }
        }
    }

    /// Two-class probabilities `[p(negative), p(positive)]`
    pub fn class_probabilities(&self, x: &[f64]) -> Vec<f64> {
        let raw = self.raw_output(x);
        match self.objective {
            Objective::BinaryLogistic => {
                let p = sigmoid(raw[0]);
                vec![1.0 - p, p]
            }
            Objective::MeanProbability => raw,
        }
    }

    /// Expected raw output over the training distribution, per output
    pub fn expected_value(&self) -> Vec<f64> {
        let arity = self.objective.leaf_arity();
        let mut total = vec![0.0; arity];
        for tree in &self.trees {
            for (t, e) in total.iter_mut().zip(tree.expected_value(arity)) {
                *t += e;
            }
        }

        match self.objective {
            Objective::BinaryLogistic => total.into_iter().map(|t| t + self.base_score).collect(),
            Objective::MeanProbability => {
                let n = self.trees.len() as f64;
                total.into_iter().map(|t| t / n).collect()
            }
        }
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

//! Per-feature attribution
//!
//! Explainers compute SHAP values against the same feature vector the model
//! scored. Some return a single row of values, others one row per class; the
//! [`explain`] adapter hides that difference and always reports the positive
//! class, so the chart direction matches the probability shown.

use crate::catalog::Catalog;
use crate::ensemble::{Objective, TreeEnsemble};
use crate::predictor::POSITIVE_CLASS;
use crate::tree_shap;
use kdrisk_core::{Attribution, AttributionEntry, Error, FeatureVector, OutputSpace, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Raw explainer output
#[derive(Debug, Clone, PartialEq)]
pub enum ShapValues {
    /// One contribution per feature
    Single { base_value: f64, values: Vec<f64> },

    /// One row of contributions per class
    PerClass {
        base_values: Vec<f64>,
        values: Vec<Vec<f64>>,
    },
}

/// Trait for SHAP explainers
pub trait Explainer: Send + Sync {
    /// Explainer name, for logs
    fn name(&self) -> &str;

    /// Number of inputs the explainer was fit on
    fn n_features(&self) -> usize;

    /// Training column names, when known
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Space the values are expressed in
    fn output_space(&self) -> OutputSpace;

    /// Compute SHAP values for one row
    fn shap_values(&self, x: &[f64]) -> Result<ShapValues>;
}

/// Attribute a prediction to its inputs.
///
/// Entries come back in feature vector order, labelled from the catalog.
/// Any failure is reported as [`Error::Explanation`]; it never affects the
/// prediction it explains.
pub fn explain(
    explainer: &dyn Explainer,
    vector: &FeatureVector,
    catalog: &Catalog,
) -> Result<Attribution> {
    if vector.len() != catalog.len() || explainer.n_features() != catalog.len() {
        return Err(Error::explanation(format!(
            "{} expects {} features, vector has {}, catalog {} declares {}",
            explainer.name(),
            explainer.n_features(),
            vector.len(),
            catalog.id,
            catalog.len()
        )));
    }

    let shap = explainer.shap_values(vector.as_slice()).map_err(|e| match e {
        Error::Explanation(_) => e,
        other => Error::explanation(other.to_string()),
    })?;

    let (base_value, values) = match shap {
        ShapValues::Single { base_value, values } => (base_value, values),
        ShapValues::PerClass {
            mut base_values,
            mut values,
        } => {
            if values.len() <= POSITIVE_CLASS || base_values.len() <= POSITIVE_CLASS {
                return Err(Error::explanation(format!(
                    "{} returned {} classes, need at least {}",
                    explainer.name(),
                    values.len(),
                    POSITIVE_CLASS + 1
                )));
            }
            (
                base_values.swap_remove(POSITIVE_CLASS),
                values.swap_remove(POSITIVE_CLASS),
            )
        }
    };

    if values.len() != catalog.len() {
        return Err(Error::explanation(format!(
            "{} returned {} values for {} features",
            explainer.name(),
            values.len(),
            catalog.len()
        )));
    }
    if !base_value.is_finite() || values.iter().any(|v| !v.is_finite()) {
        return Err(Error::explanation(format!(
            "{} returned non-finite values",
            explainer.name()
        )));
    }

    let entries = catalog
        .fields
        .iter()
        .zip(vector.as_slice())
        .zip(values)
        .map(|((spec, &value), shap_value)| AttributionEntry {
            name: spec.name.to_string(),
            label: spec.display_label.to_string(),
            value,
            display_value: if value.is_nan() {
                "missing".to_string()
            } else {
                spec.format_value(value)
            },
            shap_value,
        })
        .collect();

    Ok(Attribution {
        base_value,
        output_space: explainer.output_space(),
        entries,
    })
}

/// TreeSHAP over a tree ensemble
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    ensemble: TreeEnsemble,
}

impl TreeExplainer {
    pub fn new(ensemble: TreeEnsemble) -> Result<Self> {
        ensemble.validate()?;
        Ok(Self { ensemble })
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }
}

impl Explainer for TreeExplainer {
    fn name(&self) -> &str {
        &self.ensemble.name
    }

    fn n_features(&self) -> usize {
        self.ensemble.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.ensemble.feature_names.as_deref()
    }

    fn output_space(&self) -> OutputSpace {
        self.ensemble.objective.output_space()
    }

    fn shap_values(&self, x: &[f64]) -> Result<ShapValues> {
        if x.len() != self.ensemble.n_features {
            return Err(Error::explanation(format!(
                "expected {} features, got {}",
                self.ensemble.n_features,
                x.len()
            )));
        }

        let outputs = self.ensemble.objective.leaf_arity();
        let mut phi = vec![vec![0.0; x.len()]; outputs];
        for tree in &self.ensemble.trees {
            tree_shap::accumulate(tree, self.ensemble.decision, x, &mut phi);
        }
        let base_values = self.ensemble.expected_value();

        match self.ensemble.objective {
            Objective::BinaryLogistic => Ok(ShapValues::Single {
                base_value: base_values[0],
                values: phi.swap_remove(0),
            }),
            Objective::MeanProbability => {
                let n = self.ensemble.trees.len() as f64;
                for row in &mut phi {
                    row.iter_mut().for_each(|v| *v /= n);
                }
                Ok(ShapValues::PerClass {
                    base_values,
                    values: phi,
                })
            }
        }
    }
}

/// Exact SHAP values for a linear model with independent features:
/// `phi_i = w_i * (x_i - mean_i)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearExplainer {
    pub name: String,

    #[serde(default)]
    pub feature_names: Option<Vec<String>>,

    pub coefficients: Vec<f64>,

    /// Background feature means
    pub means: Vec<f64>,

    #[serde(default)]
    pub intercept: f64,

    #[serde(default = "default_linear_output")]
    pub output_space: OutputSpace,
}

fn default_linear_output() -> OutputSpace {
    OutputSpace::LogOdds
}

impl LinearExplainer {
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() || self.coefficients.len() != self.means.len() {
            return Err(Error::artifact(format!(
                "{}: {} coefficients and {} means",
                self.name,
                self.coefficients.len(),
                self.means.len()
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.coefficients.len() {
                return Err(Error::artifact(format!(
                    "{}: {} feature names for {} coefficients",
                    self.name,
                    names.len(),
                    self.coefficients.len()
                )));
            }
        }
        let all_finite = self
            .coefficients
            .iter()
            .chain(&self.means)
            .chain(std::iter::once(&self.intercept))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::artifact(format!("{}: non-finite parameter", self.name)));
        }
        Ok(())
    }
}

impl Explainer for LinearExplainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn output_space(&self) -> OutputSpace {
        self.output_space
    }

    fn shap_values(&self, x: &[f64]) -> Result<ShapValues> {
        if x.len() != self.coefficients.len() {
            return Err(Error::explanation(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                x.len()
            )));
        }

        let values = self
            .coefficients
            .iter()
            .zip(&self.means)
            .zip(x)
            .map(|((w, mean), value)| w * (value - mean))
            .collect();
        let base_value = self.intercept
            + self
                .coefficients
                .iter()
                .zip(&self.means)
                .map(|(w, mean)| w * mean)
                .sum::<f64>();

        Ok(ShapValues::Single { base_value, values })
    }
}

/// On-disk explainer artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum ExplainerArtifact {
    Tree { ensemble: TreeEnsemble },
    Linear(LinearExplainer),
}

impl ExplainerArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Validate and build the explainer
    pub fn into_explainer(self) -> Result<Arc<dyn Explainer>> {
        match self {
            Self::Tree { ensemble } => Ok(Arc::new(TreeExplainer::new(ensemble)?)),
            Self::Linear(linear) => {
                linear.validate()?;
                Ok(Arc::new(linear))
            }
        }
    }
}

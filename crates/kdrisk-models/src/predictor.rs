//! Probability model trait and the prediction step

use crate::ensemble::TreeEnsemble;
use crate::model_loader::ArtifactSlot;
use kdrisk_core::{Error, FeatureVector, Result, Task};
use std::sync::Arc;

/// Index of the positive class in two-class output
pub const POSITIVE_CLASS: usize = 1;

/// Trait for all binary classifiers
pub trait ProbabilityModel: Send + Sync {
    /// Get the model name
    fn name(&self) -> &str;

    /// Number of inputs the model was fit on
    fn n_features(&self) -> usize;

    /// Training column names, when the artifact recorded them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Class probabilities, `[p(negative), p(positive)]`
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>>;
}

impl ProbabilityModel for TreeEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.n_features {
            return Err(Error::inference(format!(
                "{} expects {} features, got {}",
                self.name,
                self.n_features,
                x.len()
            )));
        }
        Ok(self.class_probabilities(x))
    }
}

/// Model slot held per task
pub type ModelSlot = ArtifactSlot<Arc<dyn ProbabilityModel>>;

/// Probability of the positive outcome.
///
/// Fails with [`Error::ModelUnavailable`] when the task's model never loaded,
/// and with [`Error::Inference`] when the model misbehaves. Pure in the
/// vector: repeated calls return the same value.
pub fn predict(task: Task, model: &ModelSlot, vector: &FeatureVector) -> Result<f64> {
    let model = match model {
        ArtifactSlot::Loaded(model) => model,
        ArtifactSlot::Unavailable(reason) => {
            return Err(Error::model_unavailable(task.as_str(), reason.clone()))
        }
    };
    predict_with(model.as_ref(), vector)
}

/// Run a loaded model and check its output
pub fn predict_with(model: &dyn ProbabilityModel, vector: &FeatureVector) -> Result<f64> {
    if vector.len() != model.n_features() {
        return Err(Error::inference(format!(
            "{} expects {} features, got {}",
            model.name(),
            model.n_features(),
            vector.len()
        )));
    }

    let proba = model.predict_proba(vector.as_slice()).map_err(|e| match e {
        Error::Inference(_) => e,
        other => Error::inference(format!("{}: {}", model.name(), other)),
    })?;

    if proba.len() != 2 {
        return Err(Error::inference(format!(
            "{} returned {} class probabilities, expected 2",
            model.name(),
            proba.len()
        )));
    }

    let p = proba[POSITIVE_CLASS];
    if !(p.is_finite() && (0.0..=1.0).contains(&p)) {
        return Err(Error::inference(format!(
            "{} returned probability {} outside [0, 1]",
            model.name(),
            p
        )));
    }

    Ok(p)
}

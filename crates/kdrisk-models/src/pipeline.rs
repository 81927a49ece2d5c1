//! Prediction pipeline
//!
//! One submission makes one sequential pass:
//! validate -> assemble -> predict -> explain -> classify.
//!
//! Validation failures stop the pass before any model is touched. Once a
//! probability exists it is always returned; a missing or failing explainer
//! only changes the [`ExplanationStatus`] carried next to it.

use crate::catalog::{Catalog, CatalogId};
use crate::collector::{collect, FormSource};
use crate::explainer::explain;
use crate::model_loader::ArtifactSlot;
use crate::predictor::predict;
use crate::registry::ModelRegistry;
use crate::{assembler, risk, validator};
use kdrisk_core::{
    Attribution, FeatureVector, PredictionResult, RawInput, Result, RiskTier, Task,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Whether and how a prediction was explained
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ExplanationStatus {
    /// Attribution in feature vector order
    Explained(Attribution),

    /// The task has no loaded explainer
    Unavailable(String),

    /// The explainer ran and failed
    Failed(String),
}

impl ExplanationStatus {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explained(_) => "explained",
            Self::Unavailable(_) => "unavailable",
            Self::Failed(_) => "failed",
        }
    }
}

/// Complete result of one submission
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub task: Task,

    /// Catalog the vector was assembled against
    pub catalog: CatalogId,

    /// Values exactly as the model saw them
    pub features: FeatureVector,

    pub prediction: PredictionResult,

    pub explanation: ExplanationStatus,

    /// Total pipeline execution time
    pub latency_us: u64,
}

impl PipelineOutcome {
    pub fn probability(&self) -> f64 {
        self.prediction.probability
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.prediction.risk_tier
    }

    pub fn attribution(&self) -> Option<&Attribution> {
        match &self.explanation {
            ExplanationStatus::Explained(attribution) => Some(attribution),
            _ => None,
        }
    }

    /// Binary headline, e.g. "High Risk" or "Responsive"
    pub fn outcome_label(&self) -> &'static str {
        self.task.outcome_label(self.prediction.probability)
    }

    pub fn guidance(&self) -> &'static str {
        self.task.guidance(self.prediction.risk_tier)
    }
}

/// Runs submissions against a shared registry
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    registry: Arc<ModelRegistry>,
}

impl PredictionPipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Catalog submissions for `task` are read against
    pub fn catalog(&self, task: Task) -> &'static Catalog {
        self.registry.catalog(task)
    }

    /// Collect a submitted form, then run it
    pub fn run_form<F: FormSource + ?Sized>(&self, task: Task, form: &F) -> Result<PipelineOutcome> {
        let input = collect(self.catalog(task), form)?;
        self.run(task, input)
    }

    /// Run one submission through every step
    pub fn run(&self, task: Task, input: RawInput) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let catalog = self.catalog(task);

        let input = validator::validate(input, catalog)?;
        let features = assembler::assemble(&input, catalog)?;
        debug!(task = %task, catalog = %catalog.id, "Assembled {} features", features.len());

        let models = self.registry.task(task)?;
        let probability = predict(task, &models.model, &features)?;

        let explanation = match &models.explainer {
            ArtifactSlot::Unavailable(reason) => ExplanationStatus::Unavailable(reason.clone()),
            ArtifactSlot::Loaded(explainer) => {
                match explain(explainer.as_ref(), &features, catalog) {
                    Ok(attribution) => ExplanationStatus::Explained(attribution),
                    Err(e) => {
                        warn!(task = %task, "Explanation failed: {}", e);
                        ExplanationStatus::Failed(e.to_string())
                    }
                }
            }
        };

        let prediction = risk::assess(probability);
        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            task = %task,
            probability,
            tier = %prediction.risk_tier,
            explanation = explanation.as_str(),
            latency_us,
            "Pipeline complete"
        );

        Ok(PipelineOutcome {
            task,
            catalog: catalog.id,
            features,
            prediction,
            explanation,
            latency_us,
        })
    }
}

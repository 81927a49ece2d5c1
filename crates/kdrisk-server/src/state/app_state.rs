use kdrisk_models::{ModelRegistry, PredictionPipeline};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Prediction pipeline over the immutable model registry
    pub pipeline: PredictionPipeline,

    /// Prometheus handle for `/metrics`, absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,

    /// Origins allowed to call the API cross-origin
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            pipeline: PredictionPipeline::new(registry),
            metrics: None,
            cors_origins: Vec::new(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.pipeline.registry()
    }
}

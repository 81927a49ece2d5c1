//! Logging and metrics setup

use kdrisk_core::{Error, Task};
use kdrisk_models::PipelineOutcome;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const PREDICTIONS_TOTAL: &str = "kdrisk_predictions_total";
pub const PIPELINE_ERRORS_TOTAL: &str = "kdrisk_pipeline_errors_total";
pub const EXPLANATIONS_TOTAL: &str = "kdrisk_explanations_total";
pub const PIPELINE_LATENCY_US: &str = "kdrisk_pipeline_latency_us";

/// Initialize tracing/logging
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        "kdrisk=debug,kdrisk_server=debug,kdrisk_models=debug,tower_http=debug"
    } else {
        "kdrisk=info,kdrisk_server=info,kdrisk_models=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return the handle for rendering
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(PREDICTIONS_TOTAL, "Completed predictions by task and tier");
    metrics::describe_counter!(
        PIPELINE_ERRORS_TOTAL,
        "Submissions that ended without a prediction, by task and error kind"
    );
    metrics::describe_counter!(
        EXPLANATIONS_TOTAL,
        "Explanation outcomes by task and status"
    );
    metrics::describe_histogram!(
        PIPELINE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Pipeline execution latency in microseconds by task"
    );

    tracing::info!("Metrics exporter initialized");
    Ok(handle)
}

/// Record a completed submission
pub fn record_outcome(outcome: &PipelineOutcome) {
    let task = outcome.task.as_str();
    metrics::counter!(PREDICTIONS_TOTAL, "task" => task, "tier" => outcome.risk_tier().as_str())
        .increment(1);
    metrics::counter!(EXPLANATIONS_TOTAL, "task" => task, "status" => outcome.explanation.as_str())
        .increment(1);
    metrics::histogram!(PIPELINE_LATENCY_US, "task" => task).record(outcome.latency_us as f64);
}

/// Record a submission that produced no prediction
pub fn record_error(task: Task, error: &Error) {
    metrics::counter!(
        PIPELINE_ERRORS_TOTAL,
        "task" => task.as_str(),
        "kind" => error.kind().as_str()
    )
    .increment(1);
}

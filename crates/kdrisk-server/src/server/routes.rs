use crate::server::pages::{self, FormNotice};
use crate::state::AppState;
use crate::telemetry;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use kdrisk_core::{Error, ErrorKind, RawInput, Task};
use kdrisk_models::PipelineOutcome;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Body of `POST /api/predict/:task`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub values: RawInput,
}

pub fn status_for(error: &Error) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Evaluation | ErrorKind::Setup => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// One pipeline pass under a request-id span, with metrics recorded
fn run_submission<F>(task: Task, request_id: Uuid, run: F) -> Result<PipelineOutcome, Error>
where
    F: FnOnce() -> Result<PipelineOutcome, Error>,
{
    let span = tracing::info_span!("submission", %request_id, %task);
    span.in_scope(|| match run() {
        Ok(outcome) => {
            telemetry::record_outcome(&outcome);
            tracing::info!(
                tier = outcome.risk_tier().as_str(),
                probability = outcome.probability(),
                explanation = outcome.explanation.as_str(),
                latency_us = outcome.latency_us,
                "Prediction completed"
            );
            Ok(outcome)
        }
        Err(e) => {
            telemetry::record_error(task, &e);
            if e.is_recoverable() {
                tracing::info!(kind = e.kind().as_str(), "Submission rejected: {}", e);
            } else {
                tracing::warn!(kind = e.kind().as_str(), "Submission failed: {}", e);
            }
            Err(e)
        }
    })
}

fn unknown_task(uri: &Uri) -> Response {
    (StatusCode::NOT_FOUND, Html(pages::not_found(uri.path()))).into_response()
}

// ============================================================================
// HTML pages
// ============================================================================

pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    Html(pages::home(&state.registry().status()))
}

pub async fn show_form(
    State(state): State<AppState>,
    Path(task): Path<String>,
    uri: Uri,
) -> Response {
    let Ok(task) = task.parse::<Task>() else {
        return unknown_task(&uri);
    };

    let catalog = state.pipeline.catalog(task);
    let notice = match state.registry().task(task) {
        Err(e) => Some(unavailable_notice(&e)),
        Ok(models) => models
            .model
            .reason()
            .map(|reason| unavailable_notice(&Error::model_unavailable(task.as_str(), reason))),
    };

    Html(pages::form(task, catalog, &HashMap::new(), notice.as_ref())).into_response()
}

fn unavailable_notice(error: &Error) -> FormNotice {
    let detail = match error {
        Error::ModelUnavailable { reason, .. } => Some(reason.clone()),
        _ => None,
    };
    FormNotice {
        headline: "Model not loaded properly.".to_string(),
        detail,
    }
}

fn error_notice(task: Task, error: &Error) -> FormNotice {
    match error {
        Error::MissingFields(missing) => pages::missing_notice(task, missing.len()),
        Error::ModelUnavailable { .. } => unavailable_notice(error),
        e if e.kind() == ErrorKind::Validation => FormNotice {
            headline: e.to_string(),
            detail: None,
        },
        e => FormNotice {
            headline: format!("Prediction error: {}", e),
            detail: None,
        },
    }
}

pub async fn submit_form(
    State(state): State<AppState>,
    Path(task): Path<String>,
    uri: Uri,
    Form(entered): Form<HashMap<String, String>>,
) -> Response {
    let Ok(task) = task.parse::<Task>() else {
        return unknown_task(&uri);
    };

    let request_id = Uuid::new_v4();
    let catalog = state.pipeline.catalog(task);
    let result = run_submission(task, request_id, || state.pipeline.run_form(task, &entered));

    match result {
        Ok(outcome) => {
            let created_at = chrono::Utc::now().to_rfc3339();
            Html(pages::result(
                &outcome,
                catalog,
                &request_id.to_string(),
                &created_at,
            ))
            .into_response()
        }
        Err(e) => (
            status_for(&e),
            Html(pages::form(
                task,
                catalog,
                &entered,
                Some(&error_notice(task, &e)),
            )),
        )
            .into_response(),
    }
}

pub async fn not_found(uri: Uri) -> Response {
    (StatusCode::NOT_FOUND, Html(pages::not_found(uri.path()))).into_response()
}

// ============================================================================
// JSON API
// ============================================================================

pub async fn predict_json(
    State(state): State<AppState>,
    Path(task): Path<String>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let Ok(task) = task.parse::<Task>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": { "kind": "not_found", "message": format!("unknown task: {}", task) } })),
        )
            .into_response();
    };

    let request_id = Uuid::new_v4();
    let result = run_submission(task, request_id, || state.pipeline.run(task, request.values));

    match result {
        Ok(outcome) => Json(serde_json::json!({
            "request_id": request_id.to_string(),
            "created_at": chrono::Utc::now(),
            "outcome_label": outcome.outcome_label(),
            "guidance": outcome.guidance(),
            "outcome": outcome,
        }))
        .into_response(),
        Err(e) => {
            let missing = match &e {
                Error::MissingFields(names) => names.clone(),
                _ => Vec::new(),
            };
            (
                status_for(&e),
                Json(serde_json::json!({
                    "request_id": request_id.to_string(),
                    "error": {
                        "kind": e.kind().as_str(),
                        "message": e.to_string(),
                        "missing_fields": missing,
                    }
                })),
            )
                .into_response()
        }
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let tasks: Vec<_> = state
        .registry()
        .status()
        .into_iter()
        .map(|status| {
            let catalog = status.catalog.catalog();
            serde_json::json!({
                "task": status.task,
                "title": status.task.title(),
                "catalog": catalog.id,
                "fields": catalog.fields,
                "model_loaded": status.model_loaded,
                "explainer_loaded": status.explainer_loaded,
            })
        })
        .collect();

    Json(tasks)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry();
    let status = if registry.is_ready() { "ok" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "tasks": registry.status(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Error::MissingFields(vec!["CRP_before".into()])),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&Error::model_unavailable("caa", "file not found")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::inference("probability out of range")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_fields_notice() {
        let notice = error_notice(
            Task::Ivig,
            &Error::MissingFields(vec!["PLT_before".into(), "CO2_before".into()]),
        );
        assert_eq!(
            notice.headline,
            "Please fill in all required fields. 2 field(s) are missing."
        );
        assert!(notice.detail.is_some());
    }
}

//! HTTP route tests against an in-memory registry

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use kdrisk_models::{
    ArtifactSlot, CatalogId, Explainer, ModelRegistry, ProbabilityModel, TaskModels,
    TreeEnsemble, TreeExplainer,
};
use kdrisk_server::{build_app, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    build_app(test_state())
}

/// CAA stump on CRP_before (column 9); IVIG artifacts are missing
fn test_state() -> AppState {
    let ensemble = TreeEnsemble::from_json(
        &json!({
            "name": "caa-stump",
            "n_features": 15,
            "objective": "binary_logistic",
            "base_score": 0.0,
            "trees": [{"nodes": [
                {"type": "split", "feature": 9, "threshold": 5.0, "left": 1, "right": 2,
                 "default_left": true, "cover": 50.0},
                {"type": "leaf", "values": [-0.8], "cover": 35.0},
                {"type": "leaf", "values": [1.2], "cover": 15.0}
            ]}]
        })
        .to_string(),
    )
    .unwrap();

    let explainer: Arc<dyn Explainer> = Arc::new(TreeExplainer::new(ensemble.clone()).unwrap());
    let model: Arc<dyn ProbabilityModel> = Arc::new(ensemble);

    let registry = ModelRegistry::new()
        .register(
            TaskModels::new(
                CatalogId::CaaV1,
                ArtifactSlot::Loaded(model),
                ArtifactSlot::Loaded(explainer),
            )
            .unwrap(),
        )
        .register(
            TaskModels::new(
                CatalogId::IvigV2,
                ArtifactSlot::Unavailable("rf_model.json: file not found".into()),
                ArtifactSlot::Unavailable("shap_explainer_rf.json: file not found".into()),
            )
            .unwrap(),
        );

    AppState::new(Arc::new(registry))
}

fn caa_values(crp: Option<f64>) -> Value {
    let mut values = serde_json::Map::new();
    for name in CatalogId::CaaV1.catalog().names() {
        values.insert(name.to_string(), json!(0.0));
    }
    values.insert("Sex".into(), json!(1.0));
    values.insert("CRP_before".into(), json!(crp));
    Value::Object(values)
}

fn caa_form(crp: &str) -> String {
    CatalogId::CaaV1
        .catalog()
        .names()
        .map(|name| match name {
            "Sex" => "Sex=Male".to_string(),
            "CRP_before" => format!("CRP_before={}", crp),
            "HCT_before" => "HCT_before=36.5".to_string(),
            other => format!("{}=0", other),
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_home_page() {
    let (status, body) = send(test_app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Kawasaki Disease Prediction System"));
    assert!(body.contains("/predict/caa"));
    assert!(body.contains("Model not loaded"));
}

#[tokio::test]
async fn test_form_pages() {
    let (status, body) = send(test_app(), get("/predict/caa")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"name="CRP_before""#));
    assert!(body.contains("XGBoost"));

    let (status, body) = send(test_app(), get("/predict/ivig")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Model not loaded properly."));

    let (status, _) = send(test_app(), get("/predict/home")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_submission_renders_result() {
    let (status, body) = send(test_app(), post_form("/predict/caa", caa_form("10"))).await;
    assert_eq!(status, StatusCode::OK);

    // sigmoid(1.2)
    assert!(body.contains("76.9%"), "{}", body);
    assert!(body.contains("High Risk"));
    assert!(body.contains("High risk: Enhanced monitoring recommended"));
    assert!(body.contains("C-Reactive Protein (mg/dL)"));
    assert!(body.contains("log-odds"));
}

#[tokio::test]
async fn test_incomplete_form_is_rerendered() {
    let (status, body) = send(test_app(), post_form("/predict/caa", caa_form(""))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("1 field(s) are missing"));
    assert!(body.contains(r#"value="36.5""#));
    assert!(body.contains(r#"<option value="Male" selected>"#));
}

#[tokio::test]
async fn test_api_predict() {
    let (status, body) = send(
        test_app(),
        post_json("/api/predict/caa", json!({"values": caa_values(Some(1.0))})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    let p = body["outcome"]["prediction"]["probability"].as_f64().unwrap();
    assert!((p - 1.0 / (1.0 + 0.8_f64.exp())).abs() < 1e-9);
    assert_eq!(body["outcome"]["prediction"]["risk_tier"], "moderate");
    assert_eq!(body["outcome"]["explanation"]["status"], "explained");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_api_predict_errors() {
    let (status, body) = send(
        test_app(),
        post_json("/api/predict/caa", json!({"values": caa_values(None)})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["missing_fields"], json!(["CRP_before"]));

    let mut ivig = serde_json::Map::new();
    for name in CatalogId::IvigV2.catalog().names() {
        ivig.insert(name.to_string(), json!(1.0));
    }
    let (status, body) = send(
        test_app(),
        post_json("/api/predict/ivig", json!({"values": ivig})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["kind"], "unavailable");

    let (status, _) = send(
        test_app(),
        post_json("/api/predict/home", json!({"values": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_tasks() {
    let (status, body) = send(test_app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["tasks"][0]["model_loaded"], true);
    assert_eq!(body["tasks"][1]["model_loaded"], false);

    let (status, body) = send(test_app(), get("/api/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    let tasks: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(tasks[0]["catalog"], "caa-v1");
    assert_eq!(tasks[0]["fields"].as_array().unwrap().len(), 15);
    assert_eq!(tasks[1]["fields"].as_array().unwrap().len(), 13);
}

#[tokio::test]
async fn test_assets_and_fallback() {
    let response = test_app().oneshot(get("/assets/style.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    let (status, _) = send(test_app(), get("/assets/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(test_app(), get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No recorder installed in tests
    let (status, _) = send(test_app(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_configured_listener_only() {
    let config = ServerConfig::default().with_listener(None, Some(9000));
    let app = build_app(test_state().with_cors_origins(config.cors_origins()));

    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:9000")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:9000"
    );

    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:8501")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

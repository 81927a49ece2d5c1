//! Mock models for testing
//!
//! Counting implementations of `ProbabilityModel` and `Explainer` used to
//! check which pipeline steps run for a given submission.

use kdrisk_core::{Error, OutputSpace, RawInput, Result, RiskTier, Task};
use kdrisk_models::{
    classify, ArtifactSlot, CatalogId, Explainer, ExplanationStatus, ModelRegistry,
    PredictionPipeline, ProbabilityModel, ShapValues, TaskModels,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A mock model returning a fixed positive-class probability
pub struct MockModel {
    n_features: usize,
    probability: f64,
    fail: bool,
    call_count: AtomicU32,
}

impl MockModel {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            probability: 0.5,
            fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl ProbabilityModel for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Error::inference("mock failure"));
        }
        // Depends only on the input, like a real model
        let nudge = if x.iter().any(|v| *v > 100.0) { 0.1 } else { 0.0 };
        let p = (self.probability + nudge).min(1.0);
        Ok(vec![1.0 - p, p])
    }
}

/// A mock explainer that attributes everything to the first feature
pub struct MockExplainer {
    n_features: usize,
    per_class: bool,
    fail: bool,
    call_count: AtomicU32,
}

impl MockExplainer {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            per_class: false,
            fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn per_class(mut self) -> Self {
        self.per_class = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Explainer for MockExplainer {
    fn name(&self) -> &str {
        "mock-explainer"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn output_space(&self) -> OutputSpace {
        OutputSpace::Probability
    }

    fn shap_values(&self, _x: &[f64]) -> Result<ShapValues> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Error::explanation("mock failure"));
        }

        let mut values = vec![0.0; self.n_features];
        values[0] = 0.2;
        if self.per_class {
            let negative = values.iter().map(|v| -v).collect();
            Ok(ShapValues::PerClass {
                base_values: vec![0.7, 0.3],
                values: vec![negative, values],
            })
        } else {
            Ok(ShapValues::Single {
                base_value: 0.3,
                values,
            })
        }
    }
}

fn pipeline(
    catalog: CatalogId,
    model: Option<Arc<MockModel>>,
    explainer: Arc<MockExplainer>,
) -> PredictionPipeline {
    let model = match model {
        Some(model) => ArtifactSlot::Loaded(model as Arc<dyn ProbabilityModel>),
        None => ArtifactSlot::Unavailable("xgb_model.json: No such file".to_string()),
    };
    let explainer = ArtifactSlot::Loaded(explainer as Arc<dyn Explainer>);
    let registry =
        ModelRegistry::new().register(TaskModels::new(catalog, model, explainer).unwrap());
    PredictionPipeline::new(Arc::new(registry))
}

fn complete(catalog: CatalogId, value: f64) -> RawInput {
    catalog
        .catalog()
        .names()
        .fold(RawInput::new(), |input, name| {
            input.with(name, if name == "Sex" { 1.0 } else { value })
        })
}

#[test]
fn test_caa_all_zeros_scenario() {
    let model = Arc::new(MockModel::new(15).with_probability(0.82));
    let explainer = Arc::new(MockExplainer::new(15));
    let pipeline = pipeline(CatalogId::CaaV1, Some(model.clone()), explainer.clone());

    let outcome = pipeline.run(Task::Caa, complete(CatalogId::CaaV1, 0.0)).unwrap();

    let mut expected = vec![0.0; 15];
    expected[5] = 1.0;
    assert_eq!(outcome.features.as_slice(), expected.as_slice());

    let p = outcome.probability();
    assert!((0.0..=1.0).contains(&p));
    assert_eq!(outcome.risk_tier(), classify(p));
    assert_eq!(outcome.risk_tier(), RiskTier::High);
    assert_eq!(
        outcome.guidance(),
        "High risk: Enhanced monitoring recommended"
    );

    assert_eq!(model.call_count(), 1);
    assert_eq!(explainer.call_count(), 1);
    let attribution = outcome.attribution().unwrap();
    assert_eq!(attribution.entries[0].label, "Left Anterior Descending Z-score");
    assert_eq!(attribution.entries[5].display_value, "Male");
}

#[test]
fn test_ivig_missing_field_never_calls_model() {
    let model = Arc::new(MockModel::new(13));
    let explainer = Arc::new(MockExplainer::new(13));
    let pipeline = pipeline(CatalogId::IvigV2, Some(model.clone()), explainer.clone());

    let mut input = complete(CatalogId::IvigV2, 2.5);
    input.unset("AST_before");

    match pipeline.run(Task::Ivig, input) {
        Err(Error::MissingFields(names)) => assert_eq!(names, vec!["AST_before"]),
        other => panic!("expected MissingFields, got {:?}", other),
    }
    assert_eq!(model.call_count(), 0);
    assert_eq!(explainer.call_count(), 0);
}

#[test]
fn test_unavailable_model_never_calls_explainer() {
    let explainer = Arc::new(MockExplainer::new(15));
    let pipeline = pipeline(CatalogId::CaaV1, None, explainer.clone());

    let result = pipeline.run(Task::Caa, complete(CatalogId::CaaV1, 1.0));

    match result {
        Err(Error::ModelUnavailable { task, reason }) => {
            assert_eq!(task, "caa");
            assert!(reason.contains("xgb_model.json"));
        }
        other => panic!("expected ModelUnavailable, got {:?}", other),
    }
    assert_eq!(explainer.call_count(), 0);
}

#[test]
fn test_predict_is_idempotent() {
    let model = Arc::new(MockModel::new(13).with_probability(0.31));
    let explainer = Arc::new(MockExplainer::new(13).per_class());
    let pipeline = pipeline(CatalogId::IvigV2, Some(model.clone()), explainer);

    let input = complete(CatalogId::IvigV2, 150.0);
    let first = pipeline.run(Task::Ivig, input.clone()).unwrap();
    let second = pipeline.run(Task::Ivig, input).unwrap();

    assert_eq!(first.probability(), second.probability());
    assert_eq!(first.features, second.features);
    assert_eq!(model.call_count(), 2);
}

#[test]
fn test_per_class_explainer_reports_positive_class() {
    let model = Arc::new(MockModel::new(13).with_probability(0.2));
    let explainer = Arc::new(MockExplainer::new(13).per_class());
    let pipeline = pipeline(CatalogId::IvigV2, Some(model), explainer);

    let outcome = pipeline.run(Task::Ivig, complete(CatalogId::IvigV2, 1.0)).unwrap();
    let attribution = outcome.attribution().unwrap();

    assert_eq!(attribution.base_value, 0.3);
    assert_eq!(attribution.entries[0].name, "PLT_before");
    assert_eq!(attribution.entries[0].shap_value, 0.2);
    assert_eq!(outcome.outcome_label(), "Responsive");
}

#[test]
fn test_explanation_failure_keeps_prediction() {
    let model = Arc::new(MockModel::new(15).with_probability(0.5));
    let explainer = Arc::new(MockExplainer::new(15).failing());
    let pipeline = pipeline(CatalogId::CaaV1, Some(model), explainer.clone());

    let outcome = pipeline.run(Task::Caa, complete(CatalogId::CaaV1, 1.0)).unwrap();

    assert_eq!(outcome.probability(), 0.5);
    assert_eq!(outcome.risk_tier(), RiskTier::Moderate);
    match &outcome.explanation {
        ExplanationStatus::Failed(reason) => assert!(reason.contains("mock failure")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(explainer.call_count(), 1);
}

#[test]
fn test_inference_error_is_reported() {
    let model = Arc::new(MockModel::new(15).failing());
    let explainer = Arc::new(MockExplainer::new(15));
    let pipeline = pipeline(CatalogId::CaaV1, Some(model), explainer.clone());

    let err = pipeline
        .run(Task::Caa, complete(CatalogId::CaaV1, 1.0))
        .unwrap_err();

    assert!(matches!(err, Error::Inference(_)));
    assert_eq!(err.kind(), kdrisk_core::ErrorKind::Evaluation);
    assert_eq!(explainer.call_count(), 0);
}

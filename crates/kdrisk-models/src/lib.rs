//! kdrisk models
//!
//! Risk prediction for Kawasaki disease patients.
//!
//! Two tasks share one pipeline:
//! - CAA: coronary artery aneurysm, a gradient-boosted tree ensemble
//! - IVIG: resistance to the first IVIG dose, a random forest
//!
//! Each task reads its inputs against a versioned feature catalog, assembles
//! them in the model's column order, predicts a probability, attributes it to
//! the inputs with SHAP and maps it to a risk tier.

pub mod assembler;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod ensemble;
pub mod explainer;
pub mod model_loader;
pub mod pipeline;
pub mod predictor;
pub mod registry;
pub mod risk;
pub mod tree_shap;
pub mod validator;

pub use assembler::assemble;
pub use catalog::{
    get_fields, Catalog, CatalogId, FeatureSpec, FieldKind, Section, CAA_V1, IVIG_V1, IVIG_V2,
};
pub use collector::{collect, FormSource};
pub use config::{ArtifactConfig, TaskArtifacts};
pub use ensemble::{DecisionRule, Node, Objective, Tree, TreeEnsemble};
pub use explainer::{
    explain, Explainer, ExplainerArtifact, LinearExplainer, ShapValues, TreeExplainer,
};
pub use model_loader::{load_explainer, load_model, ArtifactSlot};
pub use pipeline::{ExplanationStatus, PipelineOutcome, PredictionPipeline};
pub use predictor::{predict, predict_with, ModelSlot, ProbabilityModel, POSITIVE_CLASS};
pub use registry::{ExplainerSlot, ModelRegistry, TaskModels, TaskStatus};
pub use risk::{assess, classify};
pub use validator::validate;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogId, FeatureSpec};
    pub use crate::explainer::Explainer;
    pub use crate::pipeline::{ExplanationStatus, PipelineOutcome, PredictionPipeline};
    pub use crate::predictor::ProbabilityModel;
    pub use crate::registry::ModelRegistry;
}

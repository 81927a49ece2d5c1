//! kdrisk core
//!
//! Types and errors shared across the Kawasaki disease risk components.
//!
//! This crate provides:
//! - The error taxonomy of the prediction pipeline
//! - Input, feature vector, prediction and attribution types
//! - Task identifiers with their user-facing wording

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{
    Attribution, AttributionEntry, FeatureVector, OutputSpace, PredictionResult, RawInput,
    RiskTier, Task,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Attribution, FeatureVector, PredictionResult, RawInput, RiskTier, Task};
}

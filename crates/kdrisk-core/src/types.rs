//! Core types for the risk prediction pipeline

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A prediction task backed by one trained classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Coronary artery aneurysm development
    Caa,
    /// Resistance to the first IVIG administration
    Ivig,
}

impl Task {
    /// All tasks, in the order they are presented
    pub const ALL: [Task; 2] = [Task::Caa, Task::Ivig];

    /// Stable identifier used in URLs, config keys and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caa => "caa",
            Self::Ivig => "ivig",
        }
    }

    /// Page title
    pub fn title(&self) -> &'static str {
        match self {
            Self::Caa => "Coronary Aneurysm Prediction",
            Self::Ivig => "IVIG Resistance Prediction",
        }
    }

    /// Label for the predicted probability
    pub fn probability_label(&self) -> &'static str {
        match self {
            Self::Caa => "Coronary Aneurysm Probability",
            Self::Ivig => "IVIG Resistance Probability",
        }
    }

    /// Binary headline shown next to the probability (0.5 cut)
    pub fn outcome_label(&self, probability: f64) -> &'static str {
        let positive = probability > 0.5;
        match (self, positive) {
            (Self::Caa, true) => "High Risk",
            (Self::Caa, false) => "Low Risk",
            (Self::Ivig, true) => "Resistant",
            (Self::Ivig, false) => "Responsive",
        }
    }

    /// Clinical guidance for a risk tier
    pub fn guidance(&self, tier: RiskTier) -> &'static str {
        match (self, tier) {
            (Self::Caa, RiskTier::High) => "High risk: Enhanced monitoring recommended",
            (Self::Caa, RiskTier::Moderate) => "Moderate risk: Careful surveillance required",
            (Self::Caa, RiskTier::Low) => "Low risk: Standard monitoring",
            (Self::Ivig, RiskTier::High) => {
                "High resistance likelihood: Consider alternative therapy"
            }
            (Self::Ivig, RiskTier::Moderate) => {
                "Moderate resistance risk: Enhanced monitoring advised"
            }
            (Self::Ivig, RiskTier::Low) => "Low resistance probability: IVIG likely effective",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caa" => Ok(Self::Caa),
            "ivig" => Ok(Self::Ivig),
            other => Err(Error::config(format!("unknown task '{}'", other))),
        }
    }
}

/// Discrete risk tier derived from a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values entered for one submission, keyed by feature name.
///
/// `None` marks a field that was not entered, which is distinct from an
/// honest zero measurement. Sex is encoded as Female = 0, Male = 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    values: BTreeMap<String, Option<f64>>,
}

impl RawInput {
    /// Create an empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entered value
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), Some(value));
    }

    /// Record a field as shown but not entered
    pub fn unset(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), None);
    }

    /// Builder-style variant of [`RawInput::set`]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Entered value for a field, if any
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Whether the field carries a value
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All keys present, set or not, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Option<f64>)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (String, Option<f64>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Model-ready values in the column order the model was trained on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}

/// Predicted probability and its tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Probability mass on the positive class
    pub probability: f64,

    /// Tier derived from the probability
    pub risk_tier: RiskTier,
}

/// Units the attribution values are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpace {
    /// Raw margin of a logistic model
    LogOdds,
    /// Class probability
    Probability,
}

/// One feature's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionEntry {
    /// Feature name as known to the model
    pub name: String,

    /// Human-readable label
    pub label: String,

    /// Value the model saw
    pub value: f64,

    /// Value as shown to the user (e.g. "Male" for Sex = 1)
    pub display_value: String,

    /// Signed SHAP contribution
    pub shap_value: f64,
}

/// Per-feature attribution aligned with the feature vector order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    /// Expected model output the contributions are measured from
    pub base_value: f64,

    /// Output space of `base_value` and the contributions
    pub output_space: OutputSpace,

    /// Entries in feature vector order
    pub entries: Vec<AttributionEntry>,
}

impl Attribution {
    /// `(label, shap_value)` pairs in feature vector order
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.entries
            .iter()
            .map(|e| (e.label.as_str(), e.shap_value))
            .collect()
    }

    /// Base value plus all contributions; equals the explained model output
    pub fn total(&self) -> f64 {
        self.base_value + self.entries.iter().map(|e| e.shap_value).sum::<f64>()
    }

    /// Up to `max_display` entries ordered by absolute contribution.
    ///
    /// This is a view for charts; `entries` keeps the canonical order.
    pub fn ranked(&self, max_display: usize) -> Vec<&AttributionEntry> {
        let mut ranked: Vec<&AttributionEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.shap_value
                .abs()
                .partial_cmp(&a.shap_value.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(max_display);
        ranked
    }
}

//! Field catalogs: the ordered feature lists each model was trained on
//!
//! A catalog's order is the model's training-time column order. The form
//! layout groups fields by [`Section`] and never affects that order.

use kdrisk_core::{Error, Result, Task};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Form section a field is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Laboratory,
    Echocardiographic,
    Clinical,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::Laboratory,
        Section::Echocardiographic,
        Section::Clinical,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Laboratory => "Laboratory Parameters",
            Self::Echocardiographic => "Echocardiographic Parameters",
            Self::Clinical => "Clinical Parameters",
        }
    }

    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::Laboratory => {
                Some("Results within 3 days prior to the 1st IVIG administration")
            }
            Self::Echocardiographic => Some(
                "Initial echocardiography Z-scores calculated using Dallaire and Dahdah nomograms",
            ),
            Self::Clinical => None,
        }
    }
}

/// How a field's value is entered and encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free numeric entry shown with `decimals` places
    Numeric { decimals: u8 },
    /// Female = 0, Male = 1
    Sex,
}

/// Declaration of one model input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    /// Column name the model was trained with
    pub name: &'static str,

    /// Measurement unit, empty for unitless values
    pub unit: &'static str,

    /// Label shown on forms and charts
    pub display_label: &'static str,

    /// Whether a value must be entered
    pub required: bool,

    pub kind: FieldKind,

    pub section: Section,
}

impl FeatureSpec {
    const fn lab(name: &'static str, display_label: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            unit,
            display_label,
            required: true,
            kind: FieldKind::Numeric { decimals: 2 },
            section: Section::Laboratory,
        }
    }

    const fn echo(name: &'static str, display_label: &'static str) -> Self {
        Self {
            name,
            unit: "Z",
            display_label,
            required: true,
            kind: FieldKind::Numeric { decimals: 2 },
            section: Section::Echocardiographic,
        }
    }

    const FEVER_DURATION: Self = Self {
        name: "fever_duration",
        unit: "days",
        display_label: "Fever Duration (days)",
        required: true,
        kind: FieldKind::Numeric { decimals: 1 },
        section: Section::Clinical,
    };

    const SEX: Self = Self {
        name: "Sex",
        unit: "",
        display_label: "Sex",
        required: true,
        kind: FieldKind::Sex,
        section: Section::Clinical,
    };

    /// Text shown for a value of this field
    pub fn format_value(&self, value: f64) -> String {
        match self.kind {
            FieldKind::Sex if value == 1.0 => "Male".to_string(),
            FieldKind::Sex if value == 0.0 => "Female".to_string(),
            FieldKind::Sex => format!("{}", value),
            FieldKind::Numeric { decimals } => format!("{:.*}", decimals as usize, value),
        }
    }
}

/// Catalog version identifier, pinned per deployed model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogId {
    #[serde(rename = "caa-v1")]
    CaaV1,
    /// 14 inputs, with Mean Platelet Volume
    #[serde(rename = "ivig-v1")]
    IvigV1,
    /// 13 inputs, with Plateletcrit
    #[serde(rename = "ivig-v2")]
    IvigV2,
}

impl CatalogId {
    pub const ALL: [CatalogId; 3] = [CatalogId::CaaV1, CatalogId::IvigV1, CatalogId::IvigV2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaaV1 => "caa-v1",
            Self::IvigV1 => "ivig-v1",
            Self::IvigV2 => "ivig-v2",
        }
    }

    /// Canonical catalog for a task
    pub fn canonical(task: Task) -> Self {
        match task {
            Task::Caa => Self::CaaV1,
            Task::Ivig => Self::IvigV2,
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        match self {
            Self::CaaV1 => &CAA_V1,
            Self::IvigV1 => &IVIG_V1,
            Self::IvigV2 => &IVIG_V2,
        }
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CatalogId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::config(format!("unknown catalog '{}'", s)))
    }
}

/// An ordered, versioned list of features for one task
#[derive(Debug, PartialEq, Serialize)]
pub struct Catalog {
    pub id: CatalogId,
    pub task: Task,
    pub fields: &'static [FeatureSpec],
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column position of a feature
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FeatureSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Feature names in column order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Fields shown in a form section, in column order
    pub fn section(&self, section: Section) -> impl Iterator<Item = &FeatureSpec> + '_ {
        self.fields.iter().filter(move |f| f.section == section)
    }

    /// Check that an artifact's declared inputs line up with this catalog.
    ///
    /// A mismatch means the deployed artifact was trained against a different
    /// catalog version and is reported as a configuration error.
    pub fn check_artifact(
        &self,
        artifact: &str,
        n_features: usize,
        feature_names: Option<&[String]>,
    ) -> Result<()> {
        if n_features != self.len() {
            return Err(Error::config(format!(
                "{} expects {} features but catalog {} declares {}",
                artifact,
                n_features,
                self.id,
                self.len()
            )));
        }

        if let Some(names) = feature_names {
            if names.len() != self.len() {
                return Err(Error::config(format!(
                    "{} names {} columns but catalog {} declares {}",
                    artifact,
                    names.len(),
                    self.id,
                    self.len()
                )));
            }
            for (i, (declared, expected)) in names.iter().zip(self.names()).enumerate() {
                if declared != expected {
                    return Err(Error::config(format!(
                        "{} column {} is '{}' but catalog {} expects '{}'",
                        artifact, i, declared, self.id, expected
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Canonical fields for a task
pub fn get_fields(task: Task) -> &'static [FeatureSpec] {
    CatalogId::canonical(task).catalog().fields
}

pub static CAA_V1: Catalog = Catalog {
    id: CatalogId::CaaV1,
    task: Task::Caa,
    fields: &[
        FeatureSpec::echo("initial_echo_LAD_Z", "Left Anterior Descending Z-score"),
        FeatureSpec::echo("initial_echo_LMCA_Z", "Left Main Coronary Artery Z-score"),
        FeatureSpec::echo("initial_echo_RCA_Z", "Right Coronary Artery Z-score"),
        FeatureSpec::echo("initial_echo_LCx_Z", "Left Circumflex Z-score"),
        FeatureSpec::FEVER_DURATION,
        FeatureSpec::SEX,
        FeatureSpec::lab("ALT_before", "Alanine Aminotransferase (IU/L)", "IU/L"),
        FeatureSpec::lab("HCT_before", "Hematocrit (%)", "%"),
        FeatureSpec::lab("P_before", "Phosphorus (mg/dL)", "mg/dL"),
        FeatureSpec::lab("CRP_before", "C-Reactive Protein (mg/dL)", "mg/dL"),
        FeatureSpec::lab("TB_before", "Total Bilirubin (mg/dL)", "mg/dL"),
        FeatureSpec::lab("CO2_before", "Carbon Dioxide (mEq/L)", "mEq/L"),
        FeatureSpec::lab("K_before", "Potassium (mEq/L)", "mEq/L"),
        FeatureSpec::lab("Glu_before", "Glucose (mg/dL)", "mg/dL"),
        FeatureSpec::lab("ALP_before", "Alkaline Phosphatase (IU/L)", "IU/L"),
    ],
};

pub static IVIG_V1: Catalog = Catalog {
    id: CatalogId::IvigV1,
    task: Task::Ivig,
    fields: &[
        FeatureSpec::lab("PLT_before", "Platelet Count (10³/μL)", "10³/μL"),
        FeatureSpec::lab("Lympho_before", "Lymphocyte (%)", "%"),
        FeatureSpec::lab("Seg_before", "Neutrophil (%)", "%"),
        FeatureSpec::lab("Chol_before", "Total Cholesterol (mg/dL)", "mg/dL"),
        FeatureSpec::lab("CRP_before", "C-Reactive Protein (mg/dL)", "mg/dL"),
        FeatureSpec::lab("P_before", "Phosphorus (mg/dL)", "mg/dL"),
        FeatureSpec::lab("TB_before", "Total Bilirubin (mg/dL)", "mg/dL"),
        FeatureSpec::lab("Ca_before", "Calcium (mg/dL)", "mg/dL"),
        FeatureSpec::lab("AST_before", "Aspartate Aminotransferase (IU/L)", "IU/L"),
        FeatureSpec::lab("PCT_before", "Procalcitonin (ng/mL)", "ng/mL"),
        FeatureSpec::echo("initial_echo_LAD_Z", "Left Anterior Descending Z-score"),
        FeatureSpec::lab("ANC_before", "Absolute Neutrophil Count (10⁹/L)", "10⁹/L"),
        FeatureSpec::lab("CO2_before", "Carbon Dioxide (mEq/L)", "mEq/L"),
        FeatureSpec::lab("MPV_before", "Mean Platelet Volume (fL)", "fL"),
    ],
};

pub static IVIG_V2: Catalog = Catalog {
    id: CatalogId::IvigV2,
    task: Task::Ivig,
    fields: &[
        FeatureSpec::lab("PLT_before", "Platelet Count (10³/μL)", "10³/μL"),
        FeatureSpec::lab("Lympho_before", "Lymphocyte (%)", "%"),
        FeatureSpec::lab("Seg_before", "Neutrophil (%)", "%"),
        FeatureSpec::lab("Chol_before", "Total Cholesterol (mg/dL)", "mg/dL"),
        FeatureSpec::lab("CRP_before", "C-Reactive Protein (mg/dL)", "mg/dL"),
        FeatureSpec::lab("P_before", "Phosphorus (mg/dL)", "mg/dL"),
        FeatureSpec::lab("TB_before", "Total Bilirubin (mg/dL)", "mg/dL"),
        FeatureSpec::lab("Ca_before", "Calcium (mg/dL)", "mg/dL"),
        FeatureSpec::lab("AST_before", "Aspartate Aminotransferase (IU/L)", "IU/L"),
        FeatureSpec::lab("PCT_before", "Plateletcrit (%)", "%"),
        FeatureSpec::echo("initial_echo_LAD_Z", "Left Anterior Descending Z-score"),
        FeatureSpec::lab("ANC_before", "Absolute Neutrophil Count (10⁹/L)", "10⁹/L"),
        FeatureSpec::lab("CO2_before", "Carbon Dioxide (mEq/L)", "mEq/L"),
    ],
};

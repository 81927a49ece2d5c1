//! Error types for the risk prediction pipeline

/// Result type alias using the pipeline's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Declared fields left unset, listed in catalog order
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Input carried a key the catalog does not declare
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Assembled vector length differs from the catalog length
    #[error("feature vector has {actual} entries, catalog declares {expected}")]
    OrderMismatch { expected: usize, actual: usize },

    /// A value that cannot be used for this field
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The task's model artifact failed to load
    #[error("model unavailable for {task}: {reason}")]
    ModelUnavailable { task: String, reason: String },

    /// Model evaluation failures
    #[error("inference error: {0}")]
    Inference(String),

    /// Explainer evaluation failures
    #[error("explanation error: {0}")]
    Explanation(String),

    /// Artifact parsing or structural validation errors
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category, used for status mapping and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or incomplete user input; resubmitting fixes it
    Validation,
    /// Model artifact missing for the task
    Unavailable,
    /// Model or explainer evaluation failed
    Evaluation,
    /// Startup-time failure (config, artifacts, io)
    Setup,
}

impl ErrorKind {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
            Self::Evaluation => "evaluation",
            Self::Setup => "setup",
        }
    }
}

impl Error {
    /// Create a new invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new model unavailable error
    pub fn model_unavailable(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            task: task.into(),
            reason: reason.into(),
        }
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new explanation error
    pub fn explanation(msg: impl Into<String>) -> Self {
        Self::Explanation(msg.into())
    }

    /// Create a new artifact error
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields(_)
            | Self::UnknownFeature(_)
            | Self::OrderMismatch { .. }
            | Self::InvalidValue { .. } => ErrorKind::Validation,
            Self::ModelUnavailable { .. } => ErrorKind::Unavailable,
            Self::Inference(_) | Self::Explanation(_) => ErrorKind::Evaluation,
            Self::Artifact(_) | Self::Config(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorKind::Setup
            }
        }
    }

    /// Whether a fresh submission can succeed without restarting the process
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Evaluation)
    }
}

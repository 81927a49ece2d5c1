//! Artifact loading
//!
//! Each artifact loads independently. A missing or unreadable file leaves its
//! slot [`ArtifactSlot::Unavailable`] instead of aborting startup, so one
//! broken task does not take the other down.

use crate::ensemble::TreeEnsemble;
use crate::explainer::{Explainer, ExplainerArtifact};
use crate::predictor::ProbabilityModel;
use kdrisk_core::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A loaded artifact, or the reason it could not be loaded
#[derive(Clone)]
pub enum ArtifactSlot<T> {
    Loaded(T),
    Unavailable(String),
}

impl<T> ArtifactSlot<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(artifact) => Some(artifact),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Why the artifact is missing, if it is
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Loaded(_) => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }

    fn from_result(kind: &str, path: &Path, result: Result<T>) -> Self {
        match result {
            Ok(artifact) => {
                info!("✓ Loaded {}: {}", kind, path.display());
                Self::Loaded(artifact)
            }
            Err(e) => {
                warn!("✗ Failed to load {} {}: {}", kind, path.display(), e);
                Self::Unavailable(format!("{}: {}", path.display(), e))
            }
        }
    }
}

impl<T> std::fmt::Debug for ArtifactSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(_) => f.write_str("Loaded"),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Load a tree ensemble classifier
pub fn load_model(path: &Path) -> ArtifactSlot<Arc<dyn ProbabilityModel>> {
    debug!("Reading model artifact {}", path.display());
    let result = TreeEnsemble::from_file(path).map(|m| Arc::new(m) as Arc<dyn ProbabilityModel>);
    ArtifactSlot::from_result("model", path, result)
}

/// Load an explainer
pub fn load_explainer(path: &Path) -> ArtifactSlot<Arc<dyn Explainer>> {
    debug!("Reading explainer artifact {}", path.display());
    let result = ExplainerArtifact::from_file(path).and_then(ExplainerArtifact::into_explainer);
    ArtifactSlot::from_result("explainer", path, result)
}

//! Configuration for model artifact loading

use crate::catalog::CatalogId;
use kdrisk_core::{Error, Result, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for all task artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory relative artifact paths resolve against
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Artifacts per task
    #[serde(default = "default_tasks")]
    pub tasks: BTreeMap<Task, TaskArtifacts>,
}

/// Artifacts backing one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArtifacts {
    /// Catalog version the artifacts were trained against
    pub catalog: CatalogId,

    /// Model artifact file
    pub model: PathBuf,

    /// Explainer artifact file
    pub explainer: PathBuf,
}

impl TaskArtifacts {
    /// Default artifacts for a task
    pub fn default_for(task: Task) -> Self {
        let (model, explainer) = match task {
            Task::Caa => ("xgb_model.json", "shap_explainer.json"),
            Task::Ivig => ("rf_model.json", "shap_explainer_rf.json"),
        };
        Self {
            catalog: CatalogId::canonical(task),
            model: PathBuf::from(model),
            explainer: PathBuf::from(explainer),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            tasks: default_tasks(),
        }
    }
}

impl ArtifactConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid artifact config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Every pinned catalog must belong to the task it is configured for
    pub fn validate(&self) -> Result<()> {
        for (task, artifacts) in &self.tasks {
            let catalog_task = artifacts.catalog.catalog().task;
            if catalog_task != *task {
                return Err(Error::config(format!(
                    "task {} pins catalog {}, which belongs to {}",
                    task, artifacts.catalog, catalog_task
                )));
            }
        }
        Ok(())
    }

    /// Resolve an artifact path against `models_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.models_dir.join(path)
        }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_tasks() -> BTreeMap<Task, TaskArtifacts> {
    Task::ALL
        .into_iter()
        .map(|task| (task, TaskArtifacts::default_for(task)))
        .collect()
}

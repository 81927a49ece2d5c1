//! Model registry initialization and lookup
//!
//! The registry is built once at startup and never mutated afterwards. Share
//! it behind an `Arc`.

use crate::catalog::{Catalog, CatalogId};
use crate::config::ArtifactConfig;
use crate::explainer::Explainer;
use crate::model_loader::{load_explainer, load_model, ArtifactSlot};
use crate::predictor::ModelSlot;
use kdrisk_core::{Error, Result, Task};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Explainer slot held per task
pub type ExplainerSlot = ArtifactSlot<Arc<dyn Explainer>>;

/// Catalog and artifacts serving one task
#[derive(Debug, Clone)]
pub struct TaskModels {
    pub task: Task,
    pub catalog: &'static Catalog,
    pub model: ModelSlot,
    pub explainer: ExplainerSlot,
}

impl TaskModels {
    /// Pair artifacts with their catalog, rejecting any that disagree on
    /// width or column names.
    pub fn new(
        catalog_id: CatalogId,
        model: ModelSlot,
        explainer: ExplainerSlot,
    ) -> Result<Self> {
        let catalog = catalog_id.catalog();

        if let ArtifactSlot::Loaded(model) = &model {
            catalog.check_artifact(
                &format!("model '{}'", model.name()),
                model.n_features(),
                model.feature_names(),
            )?;
        }
        if let ArtifactSlot::Loaded(explainer) = &explainer {
            catalog.check_artifact(
                &format!("explainer '{}'", explainer.name()),
                explainer.n_features(),
                explainer.feature_names(),
            )?;
        }

        Ok(Self {
            task: catalog.task,
            catalog,
            model,
            explainer,
        })
    }
}

/// Artifact availability for one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub task: Task,
    pub catalog: CatalogId,
    pub model_loaded: bool,
    pub explainer_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explainer_error: Option<String>,
}

/// Registry of per-task catalogs and artifacts
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    tasks: BTreeMap<Task, TaskModels>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task's artifacts, replacing any previous entry
    pub fn register(mut self, models: TaskModels) -> Self {
        self.tasks.insert(models.task, models);
        self
    }

    /// Load every configured task.
    ///
    /// Artifacts that fail to load leave their slot unavailable. A loaded
    /// artifact that disagrees with its pinned catalog aborts with
    /// [`Error::Config`].
    pub fn load(config: &ArtifactConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing model registry with {} tasks from {}",
            config.tasks.len(),
            config.models_dir.display()
        );

        let mut registry = Self::new();
        for (task, artifacts) in &config.tasks {
            info!("Loading {} artifacts (catalog {})", task, artifacts.catalog);

            let model = load_model(&config.resolve(&artifacts.model));
            let explainer = load_explainer(&config.resolve(&artifacts.explainer));
            registry = registry.register(TaskModels::new(artifacts.catalog, model, explainer)?);
        }

        let loaded = registry
            .tasks
            .values()
            .filter(|t| t.model.is_loaded())
            .count();
        info!(
            "Model registry initialized with {}/{} models",
            loaded,
            registry.tasks.len()
        );

        Ok(registry)
    }

    /// Load from a YAML artifact config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ArtifactConfig::from_file(path)?;
        Self::load(&config)
    }

    /// Artifacts for a task; unconfigured tasks report as unavailable
    pub fn task(&self, task: Task) -> Result<&TaskModels> {
        self.tasks
            .get(&task)
            .ok_or_else(|| Error::model_unavailable(task.as_str(), "task is not configured"))
    }

    /// Catalog pinned for a task, or the canonical one if unconfigured
    pub fn catalog(&self, task: Task) -> &'static Catalog {
        self.tasks
            .get(&task)
            .map(|t| t.catalog)
            .unwrap_or_else(|| CatalogId::canonical(task).catalog())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskModels> {
        self.tasks.values()
    }

    /// Availability of every known task
    pub fn status(&self) -> Vec<TaskStatus> {
        Task::ALL
            .into_iter()
            .map(|task| match self.tasks.get(&task) {
                Some(models) => TaskStatus {
                    task,
                    catalog: models.catalog.id,
                    model_loaded: models.model.is_loaded(),
                    explainer_loaded: models.explainer.is_loaded(),
                    model_error: models.model.reason().map(str::to_string),
                    explainer_error: models.explainer.reason().map(str::to_string),
                },
                None => TaskStatus {
                    task,
                    catalog: CatalogId::canonical(task),
                    model_loaded: false,
                    explainer_loaded: false,
                    model_error: Some("task is not configured".to_string()),
                    explainer_error: None,
                },
            })
            .collect()
    }

    /// Whether every known task has a loaded model
    pub fn is_ready(&self) -> bool {
        Task::ALL
            .iter()
            .all(|t| self.tasks.get(t).is_some_and(|m| m.model.is_loaded()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainer::LinearExplainer;
    use kdrisk_core::OutputSpace;

    fn linear(n: usize, names: Option<Vec<String>>) -> ExplainerSlot {
        ArtifactSlot::Loaded(Arc::new(LinearExplainer {
            name: "linear".to_string(),
            feature_names: names,
            coefficients: vec![0.1; n],
            means: vec![0.0; n],
            intercept: 0.0,
            output_space: OutputSpace::LogOdds,
        }))
    }

    fn unavailable<T>() -> ArtifactSlot<T> {
        ArtifactSlot::Unavailable("not loaded".to_string())
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let result = TaskModels::new(CatalogId::IvigV2, unavailable(), linear(14, None));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_column_name_mismatch_is_fatal() {
        let mut names: Vec<String> = CatalogId::IvigV1
            .catalog()
            .names()
            .map(String::from)
            .collect();
        names.swap(0, 1);

        let err = TaskModels::new(CatalogId::IvigV1, unavailable(), linear(14, Some(names)))
            .unwrap_err();
        assert!(err.to_string().contains("column 0"));
    }

    #[test]
    fn test_status_reports_unconfigured_tasks() {
        let registry = ModelRegistry::new().register(
            TaskModels::new(CatalogId::CaaV1, unavailable(), linear(15, None)).unwrap(),
        );

        let status = registry.status();
        assert_eq!(status.len(), 2);
        assert!(!status[0].model_loaded);
        assert!(status[0].explainer_loaded);
        assert_eq!(status[1].task, Task::Ivig);
        assert_eq!(status[1].catalog, CatalogId::IvigV2);
        assert!(!registry.is_ready());

        assert!(matches!(
            registry.task(Task::Ivig),
            Err(Error::ModelUnavailable { .. })
        ));
        let caa = registry.task(Task::Caa).unwrap();
        let vector = kdrisk_core::FeatureVector::new(vec![0.0; 15]);
        assert!(matches!(
            crate::predictor::predict(Task::Caa, &caa.model, &vector),
            Err(Error::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_load_with_missing_files_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArtifactConfig {
            models_dir: dir.path().to_path_buf(),
            ..ArtifactConfig::default()
        };

        let registry = ModelRegistry::load(&config).unwrap();
        assert_eq!(registry.tasks().count(), 2);
        assert!(registry.status().iter().all(|s| !s.model_loaded));
        assert_eq!(registry.catalog(Task::Ivig).id, CatalogId::IvigV2);
    }
}

//! Server configuration

use crate::cli::ConfigArgs;
use kdrisk_models::ArtifactConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Top-level `kdrisk.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ListenConfig,

    /// Model and explainer artifacts
    #[serde(flatten)]
    pub artifacts: ArtifactConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Load from file, falling back to defaults when it does not exist, then
    /// apply command line overrides
    pub fn load(args: &ConfigArgs) -> anyhow::Result<Self> {
        let mut config = if Path::new(&args.config).exists() {
            Self::from_file(&args.config)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                args.config.display()
            );
            Self::default()
        };

        if let Some(models_dir) = &args.models_dir {
            config.artifacts.models_dir = models_dir.clone();
        }

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.artifacts.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Apply listener overrides
    pub fn with_listener(mut self, address: Option<String>, port: Option<u16>) -> Self {
        if let Some(address) = address {
            self.server.address = address;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Origins a browser uses to reach this listener
    pub fn cors_origins(&self) -> Vec<String> {
        let port = self.server.port;
        let mut origins = vec![
            format!("http://localhost:{}", port),
            format!("http://127.0.0.1:{}", port),
        ];

        let address = self.server.address.as_str();
        let own = format!("http://{}:{}", address, port);
        if address != "0.0.0.0" && !origins.contains(&own) {
            origins.push(own);
        }
        origins
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.address, self.server.port).parse()?)
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdrisk_core::Task;
    use kdrisk_models::CatalogId;
    use std::path::PathBuf;

    #[test]
    fn test_server_config_yaml() {
        let yaml = r#"
server:
  address: 0.0.0.0
  port: 9000
models_dir: /srv/models
tasks:
  caa:
    catalog: caa-v1
    model: xgb_model.json
    explainer: shap_explainer.json
  ivig:
    catalog: ivig-v1
    model: rf_model.json
    explainer: shap_explainer_rf.json
"#;

        let config = ServerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.artifacts.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(
            config.artifacts.tasks[&Task::Ivig].catalog,
            CatalogId::IvigV1
        );
    }

    #[test]
    fn test_missing_file_uses_defaults_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            config: dir.path().join("absent.yaml"),
            models_dir: Some(PathBuf::from("/opt/models")),
            verbose: false,
        };

        let config = ServerConfig::load(&args)
            .unwrap()
            .with_listener(None, Some(3000));
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.artifacts.models_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.artifacts.tasks.len(), 2);
    }

    #[test]
    fn test_cors_origins_follow_listener() {
        let config = ServerConfig::default().with_listener(Some("10.0.0.5".into()), Some(9000));
        assert_eq!(
            config.cors_origins(),
            vec![
                "http://localhost:9000",
                "http://127.0.0.1:9000",
                "http://10.0.0.5:9000",
            ]
        );

        let config = ServerConfig::default().with_listener(Some("0.0.0.0".into()), None);
        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:8501", "http://127.0.0.1:8501"]
        );
    }

    #[test]
    fn test_catalog_task_mismatch_rejected() {
        let yaml = "tasks:\n  ivig:\n    catalog: caa-v1\n    model: a.json\n    explainer: b.json\n";
        assert!(ServerConfig::from_yaml(yaml).is_err());
    }
}

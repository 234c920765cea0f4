//! cmdflow Config
//!
//! Settings read from `<data_dir>/config.json`. Every field is optional in
//! the file:
//!
//! ```json
//! {
//!   "device_scope": "device-42",
//!   "database": "/var/lib/cmdflow/templates.db",
//!   "validation": "strict",
//!   "max_visits": 1000,
//!   "run_history": 32,
//!   "command_catalog": "commands.json"
//! }
//! ```
//!
//! Relative paths are resolved against the data directory.

use std::path::{Path, PathBuf};

use cmdflow_dispatch::{DEFAULT_HISTORY, RunnerConfig};
use cmdflow_workflow::ValidationPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
const DEFAULT_DATABASE: &str = "templates.db";
const DEFAULT_CATALOG: &str = "commands.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Scope templates are saved under.
  pub device_scope: String,
  /// SQLite file holding templates.
  pub database: Option<PathBuf>,
  pub validation: ValidationPolicy,
  /// Visit limit for in-process runs.
  pub max_visits: Option<u64>,
  /// Most recent visits kept in a run report.
  pub run_history: usize,
  /// JSON command catalog used for labels.
  pub command_catalog: Option<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      device_scope: "default".to_string(),
      database: None,
      validation: ValidationPolicy::Strict,
      max_visits: None,
      run_history: DEFAULT_HISTORY,
      command_catalog: None,
    }
  }
}

impl Settings {
  /// Load settings from `data_dir`, using defaults when there is no config file.
  pub async fn load(data_dir: &Path) -> Result<Self, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let settings: Settings =
      serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
      })?;
    info!(path = %path.display(), "loaded config");
    Ok(settings)
  }

  pub fn database_path(&self, data_dir: &Path) -> PathBuf {
    resolve(data_dir, self.database.as_deref(), DEFAULT_DATABASE)
  }

  /// sqlx connection URL for [`Settings::database_path`].
  pub fn database_url(&self, data_dir: &Path) -> String {
    format!("sqlite://{}", self.database_path(data_dir).display())
  }

  pub fn catalog_path(&self, data_dir: &Path) -> PathBuf {
    resolve(data_dir, self.command_catalog.as_deref(), DEFAULT_CATALOG)
  }

  pub fn runner_config(&self) -> RunnerConfig {
    RunnerConfig {
      policy: self.validation,
      max_visits: self.max_visits,
      history: self.run_history,
    }
  }
}

fn resolve(data_dir: &Path, configured: Option<&Path>, default: &str) -> PathBuf {
  match configured {
    Some(path) if path.is_absolute() => path.to_path_buf(),
    Some(path) => data_dir.join(path),
    None => data_dir.join(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();

    let settings = Settings::load(dir.path()).await.unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.database_path(dir.path()), dir.path().join("templates.db"));
    assert_eq!(settings.catalog_path(dir.path()), dir.path().join("commands.json"));
    assert_eq!(settings.runner_config(), RunnerConfig::default());
  }

  #[tokio::test]
  async fn test_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
      dir.path().join(CONFIG_FILE),
      r#"{"device_scope": "device-42", "validation": "compatible", "database": "/srv/t.db"}"#,
    )
    .await
    .unwrap();

    let settings = Settings::load(dir.path()).await.unwrap();

    assert_eq!(settings.device_scope, "device-42");
    assert_eq!(settings.validation, ValidationPolicy::Compatible);
    assert_eq!(settings.database_url(dir.path()), "sqlite:///srv/t.db");
    assert_eq!(settings.max_visits, None);
    assert_eq!(settings.runner_config().policy, ValidationPolicy::Compatible);
  }

  #[tokio::test]
  async fn test_run_limits_reach_runner_config() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
      dir.path().join(CONFIG_FILE),
      r#"{"max_visits": 1000, "run_history": 4}"#,
    )
    .await
    .unwrap();

    let settings = Settings::load(dir.path()).await.unwrap();

    assert_eq!(
      settings.runner_config(),
      RunnerConfig {
        policy: ValidationPolicy::Strict,
        max_visits: Some(1000),
        history: 4,
      }
    );
  }

  #[tokio::test]
  async fn test_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join(CONFIG_FILE), r#"{"validation": "loose"}"#)
      .await
      .unwrap();

    let err = Settings::load(dir.path()).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }
}

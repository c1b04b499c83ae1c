use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::SqliteStorage;

const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub storage: StorageConfig,
  /// Local cache database (defaults to $XDG_DATA_HOME/jobtrack/cache.db)
  pub cache_path: Option<PathBuf>,
}

/// Routing options for the storage coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Talk to the remote API at all. When false everything stays local.
  pub remote_enabled: bool,
  /// API base, e.g. `http://localhost:5000/api`
  pub base_url: String,
  /// Bound for the health probe and for each CRUD call
  pub timeout_ms: u64,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      remote_enabled: false,
      base_url: String::new(),
      timeout_ms: DEFAULT_TIMEOUT_MS,
    }
  }
}

impl StorageConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  /// Check that an enabled remote has a usable base URL.
  pub fn validate(&self) -> Result<()> {
    if !self.remote_enabled {
      return Ok(());
    }

    if self.base_url.trim().is_empty() {
      return Err(eyre!(
        "Remote storage is enabled but no API URL is configured. \
         Set storage.base_url or JOBTRACK_API_URL."
      ));
    }

    let url = url::Url::parse(&self.base_url)
      .map_err(|e| eyre!("Invalid API URL '{}': {}", self.base_url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!("API URL must be http or https: {}", self.base_url));
    }

    if self.timeout_ms == 0 {
      return Err(eyre!("storage.timeout_ms must be greater than zero"));
    }

    Ok(())
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jobtrack.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jobtrack/config.yaml
  ///
  /// With no file at all, defaults apply (local storage only).
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.storage.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jobtrack.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jobtrack").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Apply `JOBTRACK_REMOTE_ENABLED` and `JOBTRACK_API_URL`.
  pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(enabled) = lookup("JOBTRACK_REMOTE_ENABLED") {
      self.storage.remote_enabled = matches!(enabled.trim().to_lowercase().as_str(), "true" | "1" | "yes");
    }
    if let Some(url) = lookup("JOBTRACK_API_URL") {
      self.storage.base_url = url;
    }
  }

  /// Where the local cache lives.
  pub fn cache_path(&self) -> Result<PathBuf> {
    match &self.cache_path {
      Some(p) => Ok(p.clone()),
      None => SqliteStorage::default_path(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_defaults_are_local_only() {
    let config = Config::default();
    assert!(!config.storage.remote_enabled);
    assert_eq!(config.storage.timeout(), Duration::from_secs(5));
    assert!(config.storage.validate().is_ok());
  }

  #[test]
  fn test_parse_yaml() {
    let config = Config::parse(
      "storage:\n  remote_enabled: true\n  base_url: http://localhost:5000/api\ncache_path: /tmp/jobs.db\n",
    )
    .unwrap();

    assert!(config.storage.remote_enabled);
    assert_eq!(config.storage.base_url, "http://localhost:5000/api");
    assert_eq!(config.storage.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/jobs.db")));
  }

  #[test]
  fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
      ("JOBTRACK_REMOTE_ENABLED", "true"),
      ("JOBTRACK_API_URL", "https://jobs.example.com/api"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_env(|key| env.get(key).map(|v| v.to_string()));

    assert!(config.storage.remote_enabled);
    assert_eq!(config.storage.base_url, "https://jobs.example.com/api");
  }

  #[test]
  fn test_env_can_disable() {
    let mut config = Config::parse("storage:\n  remote_enabled: true\n").unwrap();
    config.apply_env(|key| (key == "JOBTRACK_REMOTE_ENABLED").then(|| "false".to_string()));
    assert!(!config.storage.remote_enabled);
  }

  #[test]
  fn test_validate_rejects_missing_url() {
    let storage = StorageConfig {
      remote_enabled: true,
      ..Default::default()
    };
    assert!(storage.validate().is_err());

    let storage = StorageConfig {
      remote_enabled: true,
      base_url: "ftp://example.com".to_string(),
      ..Default::default()
    };
    assert!(storage.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
  }
}

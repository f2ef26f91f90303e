use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crud::CrudSettings;

/// Environment variable overriding `api.url`.
pub const API_URL_ENV: &str = "CRUDKIT_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every table path is appended to
  pub url: String,
  /// Tables whose list and index reads are cached until the next mutation
  #[serde(default, deserialize_with = "deserialize_trimmed_set")]
  pub cache_tables: BTreeSet<String>,
  /// Quiescence window for debounced reads
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
  /// Message shown after a transaction containing mutations succeeds
  #[serde(default = "default_message")]
  pub default_message: String,
}

impl Default for NotificationsConfig {
  fn default() -> Self {
    Self {
      default_message: default_message(),
    }
  }
}

fn default_debounce_ms() -> u64 {
  300
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_message() -> String {
  "Operation successful.".to_string()
}

fn deserialize_trimmed_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(
    v.into_iter()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect(),
  )
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./crudkit.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/crudkit/config.yaml
  ///
  /// `CRUDKIT_API_URL` replaces `api.url` when set.
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
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/crudkit/config.yaml\n\
                 See config.example.yaml for the format."
        ))
      }
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.api.url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("crudkit.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("crudkit").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse configuration from a YAML document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Check that the base URL is absolute http(s).
  pub fn validate(&self) -> Result<()> {
    let url = url::Url::parse(&self.api.url)
      .map_err(|e| eyre!("Invalid api.url '{}': {}", self.api.url, e))?;

    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!("api.url must use http or https, got '{}'", url.scheme()));
    }

    Ok(())
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  /// Settings handed to the CRUD service.
  pub fn crud_settings(&self) -> CrudSettings {
    CrudSettings::new(&self.api.url)
      .with_cache_tables(self.api.cache_tables.iter().cloned())
      .with_debounce(Duration::from_millis(self.api.debounce_ms))
      .with_default_message(&self.notifications.default_message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  url: https://example.com/api/\n").unwrap();

    assert_eq!(config.api.url, "https://example.com/api/");
    assert!(config.api.cache_tables.is_empty());
    assert_eq!(config.api.debounce_ms, 300);
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert_eq!(config.notifications.default_message, "Operation successful.");
  }

  #[test]
  fn test_cache_tables_are_trimmed() {
    let yaml = r#"
api:
  url: http://localhost:8000
  cache_tables: [" countries ", "currencies", ""]
  debounce_ms: 50
notifications:
  default_message: Saved.
"#;
    let config = Config::from_yaml(yaml).unwrap();

    let tables: Vec<_> = config.api.cache_tables.iter().map(String::as_str).collect();
    assert_eq!(tables, vec!["countries", "currencies"]);

    let settings = config.crud_settings();
    assert!(settings.cache_tables().contains("countries"));
    assert!(!settings.cache_tables().contains("users"));
    assert_eq!(settings.debounce(), Duration::from_millis(50));
    assert_eq!(settings.default_message(), "Saved.");
  }

  #[test]
  fn test_validate_rejects_relative_url() {
    let config = Config::from_yaml("api:\n  url: /api\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::from_yaml("api:\n  url: ftp://host/api\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/crudkit.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}

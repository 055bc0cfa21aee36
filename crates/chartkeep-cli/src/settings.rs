//! CLI settings
//!
//! Stored in `~/.config/chartkeep/config.yaml`. A missing file means
//! defaults; command-line flags override whatever is loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, Result};

/// Settings file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Namespace holding artifacts, chart records and values documents
    pub namespace: String,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Deadline for one assembly
    #[serde(with = "humantime_serde")]
    pub assemble_timeout: Duration,

    /// Timeout for downloads and values document fetches
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            log_level: "warn".to_string(),
            assemble_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CliError::Usage {
            message: format!("invalid settings file {}: {}", path.display(), e),
        })
    }

    /// Get default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CliError::Io {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("chartkeep").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "namespace: charts\nassembleTimeout: 1m 30s\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.namespace, "charts");
        assert_eq!(settings.assemble_timeout, Duration::from_secs(90));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "fetchTimeout: soon\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, CliError::Usage { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}

//! Persistent settings.
//!
//! Settings live in `settings.json` under the platform config directory. A
//! missing file means defaults; unknown or absent fields fall back to their
//! defaults as well.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;
use crate::stats::DEFAULT_HEAT_THRESHOLDS;

const APP_DIR: &str = "photoledger";
const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_DATABASE_FILE: &str = "photoledger.db";

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the database. Defaults to the platform data
    /// directory.
    pub data_dir: Option<PathBuf>,
    /// Database file name inside the data directory.
    pub database_file: String,
    /// Ascending group-size thresholds for heat levels.
    pub heat_thresholds: Vec<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            heat_thresholds: DEFAULT_HEAT_THRESHOLDS.to_vec(),
        }
    }
}

impl Settings {
    /// Path of the settings file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(SETTINGS_FILE)
    }

    /// Load settings from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()).await
    }

    /// Load settings from a file, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()).await
    }

    /// Save settings to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Directory holding the database.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    /// Full path of the database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.database_file)
    }

    /// Highest heat level the thresholds allow.
    #[must_use]
    pub fn max_heat_level(&self) -> usize {
        self.heat_thresholds.len().saturating_sub(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("photoledger-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_file, "photoledger.db");
        assert_eq!(settings.heat_thresholds, DEFAULT_HEAT_THRESHOLDS);
        assert_eq!(settings.max_heat_level(), 6);
        assert!(settings.database_path().ends_with("photoledger/photoledger.db"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/pl"}"#).unwrap();
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/pl/photoledger.db"));
        assert_eq!(settings.heat_thresholds, DEFAULT_HEAT_THRESHOLDS);
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let path = scratch_dir("missing").join("settings.json");
        assert_eq!(Settings::load_from(&path).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("settings.json");
        let settings = Settings {
            data_dir: Some(dir.clone()),
            database_file: "review.db".to_string(),
            heat_thresholds: vec![0, 10, 20],
        };

        settings.save_to(&path).await.unwrap();
        let loaded = Settings::load_from(&path).await.unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.max_heat_level(), 2);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = scratch_dir("malformed");
        let path = dir.join("settings.json");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert!(matches!(
            Settings::load_from(&path).await,
            Err(crate::Error::Serde(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

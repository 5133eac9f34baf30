//! Start-up configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use kd_core::preferences::{FileStorage, MemoryStorage, PreferenceStorage};
use kd_data::{DatasetSource, DirectorySource, HttpSource};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "kindi.json";

/// Settings read once at start-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Base URL of the dataset endpoints
    pub data_url: String,

    /// Read datasets from this directory instead of `data_url`
    pub data_dir: Option<PathBuf>,

    /// Preference file; preferences are kept in memory when unset
    pub prefs_path: Option<PathBuf>,

    /// Name recorded on new annotations
    pub author: String,

    /// Documents kept in the dataset cache
    pub cache_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_url: "http://localhost:8000/datasets".to_string(),
            data_dir: None,
            prefs_path: Some(PathBuf::from("kindi-preferences.json")),
            author: "analyst".to_string(),
            cache_size: 8,
        }
    }
}

impl AppConfig {
    /// `kindi.json` in the working directory, then the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Override fields from `KINDI_*` variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty("KINDI_DATA_URL") {
            self.data_url = url;
        }
        if let Some(dir) = non_empty("KINDI_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = non_empty("KINDI_PREFS_PATH") {
            self.prefs_path = Some(PathBuf::from(path));
        }
        if let Some(author) = non_empty("KINDI_AUTHOR") {
            self.author = author;
        }
    }

    /// The configured dataset source; a data directory wins over the URL
    pub fn dataset_source(&self) -> Result<Arc<dyn DatasetSource>> {
        match &self.data_dir {
            Some(dir) => Ok(Arc::new(DirectorySource::new(dir.clone()))),
            None => {
                let source = HttpSource::new(self.data_url.clone())
                    .context("Failed to create the HTTP dataset source")?;
                Ok(Arc::new(source))
            }
        }
    }

    pub fn preference_storage(&self) -> Arc<dyn PreferenceStorage> {
        match &self.prefs_path {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => {
                warn!("No preference file configured; preferences will not persist");
                Arc::new(MemoryStorage::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_file_then_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "dataUrl": "https://intel.example/datasets", "author": "kim" }"#).unwrap();

        let mut config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_url, "https://intel.example/datasets");
        assert_eq!(config.author, "kim");
        assert_eq!(config.cache_size, AppConfig::default().cache_size);

        let env: HashMap<&str, &str> = [("KINDI_AUTHOR", "lee"), ("KINDI_DATA_DIR", "/srv/data"), ("KINDI_DATA_URL", " ")]
            .into_iter()
            .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.author, "lee");
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/data")));
        assert_eq!(config.data_url, "https://intel.example/datasets");
    }

    #[test]
    fn test_missing_file_is_default_and_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            AppConfig::from_file(&dir.path().join("absent.json")).unwrap(),
            AppConfig::default()
        );

        let bad = dir.path().join(CONFIG_FILE);
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(AppConfig::from_file(&bad).is_err());
    }

    #[test]
    fn test_data_dir_selects_directory_source() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/srv/data")),
            ..AppConfig::default()
        };
        let source = config.dataset_source().unwrap();
        assert_eq!(source.source_name(), "/srv/data");
    }
}

use serde::{Deserialize, Serialize};

use crate::preferences::{keys, PreferenceStore};

use super::PreferenceHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Persisted under `exportPreferences`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportPreferences {
    pub format: ExportFormat,
    pub include_annotations: bool,
    pub include_relationships: bool,
    pub pretty: bool,
    pub filename_prefix: String,
}

impl ExportPreferences {
    pub fn handle(store: &PreferenceStore) -> PreferenceHandle<Self> {
        PreferenceHandle::new(store.clone(), keys::EXPORT, Self::default())
    }

    /// `<prefix>-<dataset>.<ext>`, with an empty prefix falling back to the default
    pub fn file_name(&self, dataset_id: &str) -> String {
        let prefix = if self.filename_prefix.trim().is_empty() {
            Self::default().filename_prefix
        } else {
            self.filename_prefix.trim().to_string()
        };
        format!("{}-{}.{}", prefix, dataset_id, self.format.extension())
    }
}

impl Default for ExportPreferences {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_annotations: true,
            include_relationships: true,
            pretty: true,
            filename_prefix: "kindi-export".to_string(),
        }
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, warn};

use super::DatasetSource;
use crate::model::{DatasetDocument, DatasetIndex, DatasetInfo};
use crate::DataError;

/// Reads datasets from a directory on disk
pub struct DirectorySource {
    root: PathBuf,
    name: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_index(&self) -> Result<DatasetIndex, DataError> {
        let text = tokio::fs::read_to_string(self.root.join("index.json")).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl DatasetSource for DirectorySource {
    async fn list_datasets(&self) -> Vec<DatasetInfo> {
        match self.read_index().await {
            Ok(index) => index.datasets,
            Err(err) => {
                warn!(root = %self.root.display(), "Could not read dataset index: {}", err);
                Vec::new()
            }
        }
    }

    async fn load_dataset(&self, dataset: &DatasetInfo) -> Result<DatasetDocument, DataError> {
        let relative = dataset.document_path();
        if Path::new(&relative).is_absolute() || relative.split(|c: char| c == '/' || c == '\\').any(|part| part == "..") {
            return Err(DataError::load(&dataset.id, "document path escapes the dataset root"));
        }

        let path = self.root.join(&relative);
        let text = tokio::fs::read_to_string(&path).await.map_err(|err| {
            error!(dataset = %dataset.id, path = %path.display(), "Failed to read dataset: {}", err);
            DataError::load(&dataset.id, err)
        })?;

        serde_json::from_str(&text).map_err(|err| {
            error!(dataset = %dataset.id, "Dataset document is not valid: {}", err);
            DataError::load(&dataset.id, err)
        })
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::SAMPLE;
    use std::fs;

    fn info(id: &str, path: Option<&str>) -> DatasetInfo {
        DatasetInfo {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            path: path.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_lists_and_loads_datasets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("index.json"),
            r#"{ "datasets": [ { "id": "ops", "name": "Operation Tide", "path": "ops/data.json" } ] }"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("ops")).unwrap();
        fs::write(dir.path().join("ops").join("data.json"), SAMPLE).unwrap();

        let source = DirectorySource::new(dir.path());
        let datasets = source.list_datasets().await;
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "Operation Tide");

        let document = source.load_dataset(&datasets[0]).await.unwrap();
        assert_eq!(document.entities.len(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_index_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.json"), "{ oops").unwrap();

        let source = DirectorySource::new(dir.path());
        assert!(source.list_datasets().await.is_empty());

        let empty = tempfile::tempdir().unwrap();
        assert!(DirectorySource::new(empty.path()).list_datasets().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_dataset_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "\"not a dataset\"").unwrap();
        let source = DirectorySource::new(dir.path());

        let err = source.load_dataset(&info("gone", None)).await.unwrap_err();
        assert_eq!(err.dataset_id(), Some("gone"));

        let err = source.load_dataset(&info("bad", None)).await.unwrap_err();
        assert!(matches!(err, DataError::Load { .. }));

        let err = source
            .load_dataset(&info("escape", Some("../secrets.json")))
            .await
            .unwrap_err();
        assert_eq!(err.dataset_id(), Some("escape"));
    }
}

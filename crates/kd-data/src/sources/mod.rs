pub mod directory_source;
pub mod http_source;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::DatasetCache;
use crate::model::{DatasetDocument, DatasetInfo};
use crate::DataError;

pub use directory_source::DirectorySource;
pub use http_source::HttpSource;

/// Where dataset documents come from
///
/// The index and the documents share one root: the index lives at
/// `<root>/index.json` and each document at `<root>/<document path>`.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the dataset index. Failures are logged and yield an empty list.
    async fn list_datasets(&self) -> Vec<DatasetInfo>;

    /// Fetch one dataset document. Failures are [`DataError::Load`] for that dataset.
    async fn load_dataset(&self, dataset: &DatasetInfo) -> Result<DatasetDocument, DataError>;

    /// Get the source name/path
    fn source_name(&self) -> &str;
}

/// A dataset source with a document cache in front of it
#[derive(Clone)]
pub struct DatasetLoader {
    source: Arc<dyn DatasetSource>,
    cache: DatasetCache,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn DatasetSource>, cache: DatasetCache) -> Self {
        Self { source, cache }
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    pub async fn list_datasets(&self) -> Vec<DatasetInfo> {
        let datasets = self.source.list_datasets().await;
        info!(source = self.source.source_name(), count = datasets.len(), "Loaded dataset index");
        datasets
    }

    /// Load a document, from the cache when possible
    pub async fn load(&self, dataset: &DatasetInfo) -> Result<Arc<DatasetDocument>, DataError> {
        if let Some(document) = self.cache.get(&dataset.id) {
            debug!(dataset = %dataset.id, "Dataset served from cache");
            return Ok(document);
        }

        let document = Arc::new(self.source.load_dataset(dataset).await?);
        self.cache.put(&dataset.id, document.clone());
        Ok(document)
    }

    /// Load a document from the source even if it is cached
    pub async fn reload(&self, dataset: &DatasetInfo) -> Result<Arc<DatasetDocument>, DataError> {
        self.cache.invalidate(&dataset.id);
        self.load(dataset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl DatasetSource for CountingSource {
        async fn list_datasets(&self) -> Vec<DatasetInfo> {
            Vec::new()
        }

        async fn load_dataset(&self, dataset: &DatasetInfo) -> Result<DatasetDocument, DataError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if dataset.id == "missing" {
                return Err(DataError::load(&dataset.id, "not found"));
            }
            Ok(DatasetDocument::default())
        }

        fn source_name(&self) -> &str {
            "counting"
        }
    }

    fn info(id: &str) -> DatasetInfo {
        DatasetInfo {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            path: None,
        }
    }

    #[tokio::test]
    async fn test_loader_caches_documents() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let loader = DatasetLoader::new(source.clone(), DatasetCache::new(4));

        loader.load(&info("ops")).await.unwrap();
        loader.load(&info("ops")).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        loader.reload(&info("ops")).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_loads_are_not_cached() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let loader = DatasetLoader::new(source.clone(), DatasetCache::new(4));

        let err = loader.load(&info("missing")).await.unwrap_err();
        assert_eq!(err.dataset_id(), Some("missing"));
        assert!(loader.load(&info("missing")).await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }
}

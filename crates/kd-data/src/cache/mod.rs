//! Dataset document cache

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::model::DatasetDocument;

/// Keeps the most recently used dataset documents in memory
#[derive(Clone)]
pub struct DatasetCache {
    inner: Arc<RwLock<CacheInner>>,
}

struct CacheInner {
    documents: AHashMap<String, Arc<DatasetDocument>>,
    /// Least recently used first
    access_order: Vec<String>,
    max_documents: usize,
}

impl DatasetCache {
    /// Create a cache holding at most `max_documents` documents
    pub fn new(max_documents: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                documents: AHashMap::new(),
                access_order: Vec::new(),
                max_documents: max_documents.max(1),
            })),
        }
    }

    /// Get a document and mark it as recently used
    pub fn get(&self, dataset_id: &str) -> Option<Arc<DatasetDocument>> {
        let mut inner = self.inner.write();
        let document = inner.documents.get(dataset_id).cloned()?;
        inner.touch(dataset_id);
        Some(document)
    }

    /// Insert a document, evicting the least recently used one at capacity
    pub fn put(&self, dataset_id: &str, document: Arc<DatasetDocument>) {
        let mut inner = self.inner.write();

        if inner.documents.len() >= inner.max_documents && !inner.documents.contains_key(dataset_id) {
            if !inner.access_order.is_empty() {
                let evicted = inner.access_order.remove(0);
                inner.documents.remove(&evicted);
                debug!(dataset = %evicted, "Evicted dataset from cache");
            }
        }

        inner.documents.insert(dataset_id.to_string(), document);
        inner.touch(dataset_id);
    }

    pub fn invalidate(&self, dataset_id: &str) {
        let mut inner = self.inner.write();
        inner.documents.remove(dataset_id);
        inner.access_order.retain(|id| id != dataset_id);
    }

    /// Clear the cache
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.documents.clear();
        inner.access_order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheInner {
    fn touch(&mut self, dataset_id: &str) {
        self.access_order.retain(|id| id != dataset_id);
        self.access_order.push(dataset_id.to_string());
    }
}

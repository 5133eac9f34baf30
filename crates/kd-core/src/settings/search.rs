use crate::preferences::{keys, PreferenceStore, Subscription};

use super::PreferenceHandle;

/// Number of recent searches kept
pub const MAX_SEARCH_HISTORY: usize = 10;

/// Recent search queries, most recent first, persisted under `kindi_search_history`
#[derive(Clone)]
pub struct SearchHistory {
    handle: PreferenceHandle<Vec<String>>,
}

impl SearchHistory {
    pub fn new(store: &PreferenceStore) -> Self {
        Self {
            handle: PreferenceHandle::new(store.clone(), keys::SEARCH_HISTORY, Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.handle.load()
    }

    /// Put `query` at the front. Blank queries are ignored; a repeated
    /// query moves to the front instead of appearing twice.
    pub fn record(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return self.entries();
        }

        self.handle.update(|history| {
            history.retain(|existing| !existing.eq_ignore_ascii_case(query));
            history.insert(0, query.to_string());
            history.truncate(MAX_SEARCH_HISTORY);
        })
    }

    pub fn remove(&self, query: &str) -> Vec<String> {
        self.handle.update(|history| history.retain(|existing| existing != query))
    }

    pub fn clear(&self) {
        self.handle.reset();
    }

    pub fn watch<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Vec<String>) + Send + Sync + 'static,
    {
        self.handle.watch(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_orders_most_recent_first() {
        let history = SearchHistory::new(&PreferenceStore::in_memory());
        history.record("alpha");
        history.record("beta");
        assert_eq!(history.entries(), vec!["beta", "alpha"]);
    }

    #[test]
    fn test_duplicates_move_to_front() {
        let history = SearchHistory::new(&PreferenceStore::in_memory());
        history.record("alpha");
        history.record("beta");
        history.record("ALPHA ");
        assert_eq!(history.entries(), vec!["ALPHA", "beta"]);
    }

    #[test]
    fn test_blank_queries_ignored_and_capped() {
        let history = SearchHistory::new(&PreferenceStore::in_memory());
        history.record("   ");
        assert!(history.entries().is_empty());

        for i in 0..15 {
            history.record(&format!("q{}", i));
        }
        let entries = history.entries();
        assert_eq!(entries.len(), MAX_SEARCH_HISTORY);
        assert_eq!(entries[0], "q14");
    }

    #[test]
    fn test_remove_and_clear() {
        let history = SearchHistory::new(&PreferenceStore::in_memory());
        history.record("a");
        history.record("b");
        assert_eq!(history.remove("a"), vec!["b"]);
        history.clear();
        assert!(history.entries().is_empty());
    }
}

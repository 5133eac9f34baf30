use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::{keys, PreferenceStore};
use crate::settings::PreferenceHandle;

use super::FilterGroup;

/// A named filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    pub name: String,
    pub root: FilterGroup,
    pub created_at: DateTime<Utc>,
}

/// Saved filters, persisted under `savedAdvancedFilters`
#[derive(Clone)]
pub struct FilterLibrary {
    handle: PreferenceHandle<Vec<SavedFilter>>,
}

impl FilterLibrary {
    pub fn new(store: &PreferenceStore) -> Self {
        Self {
            handle: PreferenceHandle::new(store.clone(), keys::SAVED_FILTERS, Vec::new()),
        }
    }

    pub fn list(&self) -> Vec<SavedFilter> {
        self.handle.load()
    }

    pub fn get(&self, name: &str) -> Option<SavedFilter> {
        self.list().into_iter().find(|saved| saved.name == name)
    }

    /// Save under `name`, replacing an existing filter with the same name
    pub fn save(&self, name: &str, root: &FilterGroup) -> SavedFilter {
        let saved = SavedFilter {
            name: name.trim().to_string(),
            root: root.clone(),
            created_at: Utc::now(),
        };

        let entry = saved.clone();
        self.handle.update(move |filters| {
            match filters.iter_mut().find(|existing| existing.name == entry.name) {
                Some(existing) => *existing = entry,
                None => filters.push(entry),
            }
        });
        saved
    }

    /// Returns whether a filter with that name existed
    pub fn delete(&self, name: &str) -> bool {
        let mut removed = false;
        self.handle.update(|filters| {
            let before = filters.len();
            filters.retain(|saved| saved.name != name);
            removed = filters.len() != before;
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Combinator, FilterCondition, FilterOperator};

    #[test]
    fn test_save_replaces_same_name() {
        let library = FilterLibrary::new(&PreferenceStore::in_memory());
        let mut root = FilterGroup::new(Combinator::And);
        library.save("people", &root);

        root.add_condition(&[], FilterCondition::new("kind", FilterOperator::Equals, "person"))
            .unwrap();
        library.save(" people ", &root);

        let filters = library.list();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].root.condition_count(), 1);
    }

    #[test]
    fn test_delete() {
        let library = FilterLibrary::new(&PreferenceStore::in_memory());
        library.save("a", &FilterGroup::default());
        library.save("b", &FilterGroup::default());

        assert!(library.delete("a"));
        assert!(!library.delete("a"));
        assert!(library.get("a").is_none());
        assert!(library.get("b").is_some());
    }
}

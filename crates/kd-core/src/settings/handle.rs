use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::preferences::{listener, PreferenceOutcome, PreferenceStore, PreferenceValue, Subscription};

/// A typed view of one preference key
#[derive(Clone)]
pub struct PreferenceHandle<T> {
    store: PreferenceStore,
    key: Arc<str>,
    default: T,
}

impl<T> PreferenceHandle<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(store: PreferenceStore, key: &str, default: T) -> Self {
        Self {
            store,
            key: Arc::from(key),
            default,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value, or the default
    pub fn load(&self) -> T {
        self.store.get_preference(&self.key, self.default.clone())
    }

    pub fn save(&self, value: &T) -> PreferenceOutcome {
        self.store.save_preference(&self.key, value)
    }

    /// Load, modify and save in one step. Returns the saved value.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let mut value = self.load();
        f(&mut value);
        self.save(&value);
        value
    }

    /// Forget the stored value so the default applies again
    pub fn reset(&self) -> PreferenceOutcome {
        self.store.remove_preference(&self.key)
    }

    /// Call `f` with the new typed value whenever the key changes.
    /// Removal and clearing report the default.
    pub fn watch<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let default = self.default.clone();
        let key = self.key.clone();
        self.store.add_listener(
            &self.key,
            listener(move |value| {
                let typed = match value {
                    PreferenceValue::Set(json) => {
                        serde_json::from_value(json.clone()).unwrap_or_else(|err| {
                            warn!(key = %key, "Changed preference has an unexpected shape: {}", err);
                            default.clone()
                        })
                    }
                    PreferenceValue::Removed | PreferenceValue::Cleared => default.clone(),
                };
                f(&typed);
            }),
        )
    }
}

//! Preference store
//!
//! A key/value store over a [`PreferenceStorage`] backend with per-key and
//! global change listeners. Values are JSON-serialized. Reads never fail:
//! a missing key, missing storage or a corrupt entry all return the
//! caller's default. Writes that cannot be persisted are dropped, logged and
//! recorded in [`PreferenceStore::issues`].
//!
//! The store is built once at the application root and handed to features
//! that need it; clones share the same state.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

mod issue;
mod listener;
mod storage;

pub use issue::{IssueKind, PreferenceIssue, PreferenceOutcome, WriteStatus};
pub use listener::{
    global_listener, listener, GlobalListener, Listener, PreferenceValue, Subscription,
};
pub use storage::{FileStorage, MemoryStorage, PreferenceStorage, StorageError, UnavailableStorage};

use listener::SubscriptionTarget;

/// Storage keys used by the dashboard
pub mod keys {
    pub const THEME: &str = "themePreferences";
    pub const EXPORT: &str = "exportPreferences";
    pub const SAVED_FILTERS: &str = "savedAdvancedFilters";
    pub const SEARCH_HISTORY: &str = "kindi_search_history";
    pub const PANEL_SIZES: &str = "panelSizes";
    pub const ANNOTATIONS: &str = "annotations";

    /// Key passed to global listeners when every preference is cleared
    pub const ALL: &str = "*";
}

/// How many issues are kept for diagnostics
const MAX_ISSUES: usize = 64;

struct StoreInner {
    storage: Arc<dyn PreferenceStorage>,
    listeners: RwLock<AHashMap<String, Vec<(u64, Listener)>>>,
    global_listeners: RwLock<Vec<(u64, GlobalListener)>>,
    issues: Mutex<VecDeque<PreferenceIssue>>,
    next_id: AtomicU64,
    /// Set once the missing backend has been recorded as an issue
    unavailable_reported: AtomicBool,
}

impl StoreInner {
    fn remove_by_id(&self, target: &SubscriptionTarget, id: u64) {
        match target {
            SubscriptionTarget::Key(key) => {
                let mut listeners = self.listeners.write();
                if let Some(entries) = listeners.get_mut(key) {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                    if entries.is_empty() {
                        listeners.remove(key);
                    }
                }
            }
            SubscriptionTarget::Global => {
                self.global_listeners
                    .write()
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        }
    }

    fn record(&self, issue: PreferenceIssue) {
        let mut issues = self.issues.lock();
        if issues.len() == MAX_ISSUES {
            issues.pop_front();
        }
        issues.push_back(issue);
    }
}

/// Persisted key/value store with change notification
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<StoreInner>,
}

impl PreferenceStore {
    /// Create a store over the given backend
    pub fn new(storage: Arc<dyn PreferenceStorage>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                storage,
                listeners: RwLock::new(AHashMap::new()),
                global_listeners: RwLock::new(Vec::new()),
                issues: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
                unavailable_reported: AtomicBool::new(false),
            }),
        }
    }

    /// A store that only lives in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Whether writes can reach persistent storage
    pub fn is_persistent(&self) -> bool {
        self.inner.storage.is_available()
    }

    /// Serialize `value` under `key`, then notify key listeners and global listeners
    pub fn save_preference<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PreferenceOutcome {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(err) => {
                error!(key, "Failed to serialize preference: {}", err);
                return self.fail(key, IssueKind::Serialize, err.to_string());
            }
        };

        let status = match self.inner.storage.set_item(key, &json.to_string()) {
            Ok(()) => WriteStatus::Stored,
            Err(StorageError::Unavailable) => self.skip_write(key),
            Err(err) => {
                error!(key, "Failed to save preference: {}", err);
                return self.fail(key, IssueKind::Write, err.to_string());
            }
        };

        let (notified, panicked) = self.notify(key, &PreferenceValue::Set(json));
        PreferenceOutcome {
            status,
            notified,
            panicked,
        }
    }

    /// Read `key`, falling back to `default` when it is absent, storage is
    /// unavailable or the stored text does not deserialize as `T`
    pub fn get_preference<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(text) = self.read_raw(key) else {
            return default;
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "Stored preference is unreadable, using default: {}", err);
                self.inner
                    .record(PreferenceIssue::new(key, IssueKind::Deserialize, err.to_string()));
                default
            }
        }
    }

    /// Read `key` as untyped JSON
    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        let text = self.read_raw(key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, "Stored preference is not JSON: {}", err);
                self.inner
                    .record(PreferenceIssue::new(key, IssueKind::Deserialize, err.to_string()));
                None
            }
        }
    }

    /// Whether `key` currently has a stored value
    pub fn contains(&self, key: &str) -> bool {
        self.read_raw(key).is_some()
    }

    /// Delete `key` and notify its listeners with [`PreferenceValue::Removed`]
    pub fn remove_preference(&self, key: &str) -> PreferenceOutcome {
        let status = match self.inner.storage.remove_item(key) {
            Ok(()) => WriteStatus::Stored,
            Err(StorageError::Unavailable) => self.skip_write(key),
            Err(err) => {
                error!(key, "Failed to remove preference: {}", err);
                return self.fail(key, IssueKind::Write, err.to_string());
            }
        };

        let (notified, panicked) = self.notify(key, &PreferenceValue::Removed);
        PreferenceOutcome {
            status,
            notified,
            panicked,
        }
    }

    /// Delete every stored preference and tell every listener with
    /// [`PreferenceValue::Cleared`]. Global listeners receive the key [`keys::ALL`].
    pub fn clear_all_preferences(&self) -> PreferenceOutcome {
        let status = match self.inner.storage.clear() {
            Ok(()) => WriteStatus::Stored,
            Err(StorageError::Unavailable) => self.skip_write(keys::ALL),
            Err(err) => {
                error!("Failed to clear preferences: {}", err);
                return self.fail(keys::ALL, IssueKind::Write, err.to_string());
            }
        };

        let keyed: Vec<(String, Listener)> = self
            .inner
            .listeners
            .read()
            .iter()
            .flat_map(|(key, entries)| {
                entries
                    .iter()
                    .map(move |(_, listener)| (key.clone(), listener.clone()))
            })
            .collect();

        let mut notified = 0;
        let mut panicked = 0;
        let value = PreferenceValue::Cleared;

        for (key, listener) in keyed {
            if self.run_listener(&key, || listener(&value)) {
                notified += 1;
            } else {
                panicked += 1;
            }
        }

        let (global_notified, global_panicked) = self.notify_global(keys::ALL, &value);

        PreferenceOutcome {
            status,
            notified: notified + global_notified,
            panicked: panicked + global_panicked,
        }
    }

    /// Keys currently stored
    pub fn keys(&self) -> Vec<String> {
        match self.inner.storage.keys() {
            Ok(keys) => keys,
            Err(StorageError::Unavailable) => Vec::new(),
            Err(err) => {
                warn!("Failed to list preference keys: {}", err);
                self.inner
                    .record(PreferenceIssue::new(keys::ALL, IssueKind::Read, err.to_string()));
                Vec::new()
            }
        }
    }

    /// Listen for changes to `key`
    pub fn add_listener(&self, key: &str, listener: Listener) -> Subscription {
        let id = self.next_id();
        self.inner
            .listeners
            .write()
            .entry(key.to_string())
            .or_default()
            .push((id, listener));

        Subscription::new(
            Arc::downgrade(&self.inner),
            SubscriptionTarget::Key(key.to_string()),
            id,
        )
    }

    /// Remove a key listener by identity. Returns whether it was registered.
    pub fn remove_listener(&self, key: &str, listener: &Listener) -> bool {
        let mut listeners = self.inner.listeners.write();
        let Some(entries) = listeners.get_mut(key) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(_, registered)| !Arc::ptr_eq(registered, listener));
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(key);
        }
        removed
    }

    /// Listen for changes to every key
    pub fn add_global_listener(&self, listener: GlobalListener) -> Subscription {
        let id = self.next_id();
        self.inner.global_listeners.write().push((id, listener));

        Subscription::new(Arc::downgrade(&self.inner), SubscriptionTarget::Global, id)
    }

    /// Remove a global listener by identity. Returns whether it was registered.
    pub fn remove_global_listener(&self, listener: &GlobalListener) -> bool {
        let mut listeners = self.inner.global_listeners.write();
        let before = listeners.len();
        listeners.retain(|(_, registered)| !Arc::ptr_eq(registered, listener));
        listeners.len() != before
    }

    /// Number of listeners registered for `key`
    pub fn listener_count(&self, key: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn global_listener_count(&self) -> usize {
        self.inner.global_listeners.read().len()
    }

    /// Recent degraded operations, oldest first
    pub fn issues(&self) -> Vec<PreferenceIssue> {
        self.inner.issues.lock().iter().cloned().collect()
    }

    /// Drain the recorded issues
    pub fn take_issues(&self) -> Vec<PreferenceIssue> {
        self.inner.issues.lock().drain(..).collect()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.inner.storage.get_item(key) {
            Ok(text) => text,
            Err(StorageError::Unavailable) => None,
            Err(err) => {
                warn!(key, "Failed to read preference: {}", err);
                self.inner
                    .record(PreferenceIssue::new(key, IssueKind::Read, err.to_string()));
                None
            }
        }
    }

    /// Writes against a missing backend are skipped; the first one per store is recorded
    fn skip_write(&self, key: &str) -> WriteStatus {
        debug!(key, "No persistent storage, preference kept in listeners only");
        if !self.inner.unavailable_reported.swap(true, Ordering::Relaxed) {
            warn!("Persistent storage is not available; preferences will not be kept");
            self.inner.record(PreferenceIssue::new(
                key,
                IssueKind::StorageUnavailable,
                "persistent storage is not available; preferences will not be kept",
            ));
        }
        WriteStatus::Skipped
    }

    fn fail(&self, key: &str, kind: IssueKind, message: String) -> PreferenceOutcome {
        let issue = PreferenceIssue::new(key, kind, message);
        self.inner.record(issue.clone());
        PreferenceOutcome::failed(issue)
    }

    /// Key listeners first, then global listeners. Returns (completed, panicked).
    fn notify(&self, key: &str, value: &PreferenceValue) -> (usize, usize) {
        // Snapshot so listeners may add or remove listeners while running
        let keyed: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .get(key)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        let mut notified = 0;
        let mut panicked = 0;
        for listener in keyed {
            if self.run_listener(key, || listener(value)) {
                notified += 1;
            } else {
                panicked += 1;
            }
        }

        let (global_notified, global_panicked) = self.notify_global(key, value);
        (notified + global_notified, panicked + global_panicked)
    }

    fn notify_global(&self, key: &str, value: &PreferenceValue) -> (usize, usize) {
        let global: Vec<GlobalListener> = self
            .inner
            .global_listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        let mut notified = 0;
        let mut panicked = 0;
        for listener in global {
            if self.run_listener(key, || listener(key, value)) {
                notified += 1;
            } else {
                panicked += 1;
            }
        }
        (notified, panicked)
    }

    /// Run one listener, containing a panic so the others still run
    fn run_listener<F: FnOnce()>(&self, key: &str, f: F) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) => true,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "listener panicked".to_string());
                error!(key, "Preference listener panicked: {}", message);
                self.inner
                    .record(PreferenceIssue::new(key, IssueKind::ListenerPanic, message));
                false
            }
        }
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("persistent", &self.is_persistent())
            .field("global_listeners", &self.global_listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Theme {
        mode: String,
    }

    fn recorder() -> (Listener, Arc<Mutex<Vec<PreferenceValue>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (listener(move |value| sink.lock().push(value.clone())), seen)
    }

    #[test]
    fn test_round_trip() {
        let store = PreferenceStore::in_memory();
        let outcome = store.save_preference(
            keys::THEME,
            &Theme {
                mode: "dark".into(),
            },
        );
        assert!(outcome.is_stored());

        let theme = store.get_preference(
            keys::THEME,
            Theme {
                mode: "system".into(),
            },
        );
        assert_eq!(theme.mode, "dark");
    }

    #[test]
    fn test_missing_key_returns_default() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.get_preference("never", 42u32), 42);
        assert!(store.issues().is_empty());
    }

    #[test]
    fn test_corrupt_entry_returns_default_and_records_issue() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(keys::THEME, "{ definitely not json").unwrap();
        let store = PreferenceStore::new(storage);

        let theme = store.get_preference(
            keys::THEME,
            Theme {
                mode: "system".into(),
            },
        );
        assert_eq!(theme.mode, "system");

        let issues = store.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Deserialize);
    }

    #[test]
    fn test_incompatible_shape_returns_default() {
        let store = PreferenceStore::in_memory();
        store.save_preference("count", &"not a number");
        assert_eq!(store.get_preference("count", 7i64), 7);
    }

    #[test]
    fn test_unavailable_storage_skips_write_and_returns_default() {
        let store = PreferenceStore::new(Arc::new(UnavailableStorage));
        let (l, seen) = recorder();
        let _sub = store.add_listener("k", l);

        let outcome = store.save_preference("k", &5);
        assert_eq!(outcome.status, WriteStatus::Skipped);
        assert_eq!(outcome.notified, 1);
        assert_eq!(store.get_preference("k", 1), 1);
        assert_eq!(seen.lock().as_slice(), &[PreferenceValue::Set(json!(5))]);

        // reported once per store, not once per write
        store.save_preference("k", &6);
        assert_eq!(store.remove_preference("k").status, WriteStatus::Skipped);
        let issues = store.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::StorageUnavailable);
        assert_eq!(issues[0].key, "k");
    }

    #[test]
    fn test_failed_file_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let store = PreferenceStore::new(Arc::new(FileStorage::new(path.clone())));
        assert!(store.save_preference("k", &1).is_stored());

        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let (l, seen) = recorder();
        let _sub = store.add_listener("k", l);

        let outcome = store.save_preference("k", &5);
        assert!(matches!(outcome.status, WriteStatus::Failed(_)));
        assert_eq!(outcome.notified, 0);
        assert!(seen.lock().is_empty());
        assert_eq!(store.get_preference("k", 0), 1);
    }

    #[test]
    fn test_listener_invoked_once_with_new_value() {
        let store = PreferenceStore::in_memory();
        let (on_theme, theme_seen) = recorder();
        let (on_export, export_seen) = recorder();
        let _a = store.add_listener(keys::THEME, on_theme);
        let _b = store.add_listener(keys::EXPORT, on_export);

        store.save_preference(keys::THEME, &json!({"mode": "dark"}));

        assert_eq!(
            theme_seen.lock().as_slice(),
            &[PreferenceValue::Set(json!({"mode": "dark"}))]
        );
        assert!(export_seen.lock().is_empty());
    }

    #[test]
    fn test_listener_sees_stored_value_when_requerying() {
        let store = PreferenceStore::in_memory();
        let reader = store.clone();
        let observed = Arc::new(Mutex::new(None));
        let sink = observed.clone();
        let _sub = store.add_listener(
            "volume",
            listener(move |_| {
                *sink.lock() = Some(reader.get_preference("volume", 0));
            }),
        );

        store.save_preference("volume", &11);
        assert_eq!(*observed.lock(), Some(11));
    }

    #[test]
    fn test_global_listener_receives_key_and_value() {
        let store = PreferenceStore::in_memory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = store.add_global_listener(global_listener(move |key, value| {
            sink.lock().push((key.to_string(), value.clone()));
        }));

        store.save_preference("a", &1);
        store.save_preference("b", &2);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], ("b".to_string(), PreferenceValue::Set(json!(2))));
    }

    #[test]
    fn test_remove_preference_notifies_removed() {
        let store = PreferenceStore::in_memory();
        store.save_preference("k", &"v");
        let (l, seen) = recorder();
        let _sub = store.add_listener("k", l);

        store.remove_preference("k");
        assert_eq!(seen.lock().as_slice(), &[PreferenceValue::Removed]);
        assert_eq!(store.get_preference("k", "d".to_string()), "d");
    }

    #[test]
    fn test_clear_all_notifies_every_listener() {
        let store = PreferenceStore::in_memory();
        store.save_preference("a", &1);
        store.save_preference("b", &2);

        let (la, seen_a) = recorder();
        let (lb, seen_b) = recorder();
        let _a = store.add_listener("a", la);
        let _b = store.add_listener("b", lb);
        let global_keys = Arc::new(Mutex::new(Vec::new()));
        let sink = global_keys.clone();
        let _g = store.add_global_listener(global_listener(move |key, value| {
            assert_eq!(*value, PreferenceValue::Cleared);
            sink.lock().push(key.to_string());
        }));

        let outcome = store.clear_all_preferences();
        assert_eq!(outcome.notified, 3);
        assert_eq!(seen_a.lock().as_slice(), &[PreferenceValue::Cleared]);
        assert_eq!(seen_b.lock().as_slice(), &[PreferenceValue::Cleared]);
        assert_eq!(global_keys.lock().as_slice(), &[keys::ALL.to_string()]);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_remove_listener_by_identity() {
        let store = PreferenceStore::in_memory();
        let (l, seen) = recorder();
        store.add_listener("k", l.clone()).detach();
        assert_eq!(store.listener_count("k"), 1);

        // a different closure with the same behaviour is not the same listener
        let (other, _) = recorder();
        assert!(!store.remove_listener("k", &other));
        assert!(store.remove_listener("k", &l));

        store.save_preference("k", &1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_remove_global_listener_by_identity() {
        let store = PreferenceStore::in_memory();
        let g = global_listener(|_, _| {});
        store.add_global_listener(g.clone()).detach();
        assert_eq!(store.global_listener_count(), 1);
        assert!(store.remove_global_listener(&g));
        assert_eq!(store.global_listener_count(), 0);
    }

    #[test]
    fn test_dropping_subscription_removes_listener() {
        let store = PreferenceStore::in_memory();
        let (l, seen) = recorder();
        let sub = store.add_listener("k", l);
        store.save_preference("k", &1);
        drop(sub);
        store.save_preference("k", &2);

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(store.listener_count("k"), 0);

        let global = store.add_global_listener(global_listener(|_, _| {}));
        global.dispose();
        assert_eq!(store.global_listener_count(), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_others() {
        let store = PreferenceStore::in_memory();
        let _bad = store.add_listener("k", listener(|_| panic!("boom")));
        let (good, seen) = recorder();
        let _good = store.add_listener("k", good);

        let outcome = store.save_preference("k", &1);
        assert_eq!(outcome.notified, 1);
        assert_eq!(outcome.panicked, 1);
        assert_eq!(seen.lock().len(), 1);

        let issues = store.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ListenerPanic);
        assert_eq!(issues[0].message, "boom");
    }

    #[test]
    fn test_issue_log_is_bounded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("bad", "{").unwrap();
        let store = PreferenceStore::new(storage);
        for _ in 0..(MAX_ISSUES + 10) {
            store.get_preference("bad", 0);
        }
        assert_eq!(store.issues().len(), MAX_ISSUES);
        assert_eq!(store.take_issues().len(), MAX_ISSUES);
        assert!(store.issues().is_empty());
    }

    #[test]
    fn test_file_backed_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let store = PreferenceStore::new(Arc::new(FileStorage::new(&path)));
        store.save_preference(keys::SEARCH_HISTORY, &vec!["alpha", "beta"]);

        let reloaded = PreferenceStore::new(Arc::new(FileStorage::new(&path)));
        let history: Vec<String> = reloaded.get_preference(keys::SEARCH_HISTORY, Vec::new());
        assert_eq!(history, vec!["alpha", "beta"]);
    }
}

//! Preference listeners and the subscription handles that remove them

use std::sync::{Arc, Weak};

use super::StoreInner;

/// The value a listener is told about
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceValue {
    /// The key now holds this value
    Set(serde_json::Value),

    /// The key was removed
    Removed,

    /// Every preference was cleared; re-read if you care
    Cleared,
}

impl PreferenceValue {
    /// The new value, if the key still holds one
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            PreferenceValue::Set(value) => Some(value),
            PreferenceValue::Removed | PreferenceValue::Cleared => None,
        }
    }
}

/// Callback registered against one key
pub type Listener = Arc<dyn Fn(&PreferenceValue) + Send + Sync>;

/// Callback registered against every key
pub type GlobalListener = Arc<dyn Fn(&str, &PreferenceValue) + Send + Sync>;

/// Build a [`Listener`] from a closure
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&PreferenceValue) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`GlobalListener`] from a closure
pub fn global_listener<F>(f: F) -> GlobalListener
where
    F: Fn(&str, &PreferenceValue) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone)]
pub(super) enum SubscriptionTarget {
    Key(String),
    Global,
}

/// Handle returned when a listener is added
///
/// Dropping the handle (or calling [`Subscription::dispose`]) removes the
/// listener. Call [`Subscription::detach`] to keep the listener registered
/// for the lifetime of the store.
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    target: SubscriptionTarget,
    id: u64,
    active: bool,
}

impl Subscription {
    pub(super) fn new(store: Weak<StoreInner>, target: SubscriptionTarget, id: u64) -> Self {
        Self {
            store,
            target,
            id,
            active: true,
        }
    }

    /// Remove the listener now
    pub fn dispose(mut self) {
        self.release();
    }

    /// Keep the listener registered after this handle goes away
    pub fn detach(mut self) {
        self.active = false;
    }

    /// The key this subscription listens to, or `None` for a global listener
    pub fn key(&self) -> Option<&str> {
        match &self.target {
            SubscriptionTarget::Key(key) => Some(key),
            SubscriptionTarget::Global => None,
        }
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(store) = self.store.upgrade() {
            store.remove_by_id(&self.target, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

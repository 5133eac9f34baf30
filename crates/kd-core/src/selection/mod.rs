//! Selection registry shared by every visualization panel
//!
//! The registry is the single source of truth for which entities, events and
//! locations are selected. Panels write through it and re-render from it, and
//! the recorded [`SelectionSource`] lets a panel tell its own changes apart
//! from ones made elsewhere.

use std::sync::{Arc, Weak};

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use tracing::trace;

mod source;
mod subscriber;

pub use source::{SelectionKind, SelectionSource};
pub use subscriber::SelectionSubscriber;

/// Selection state shared across views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected entity ids
    pub entities: AHashSet<String>,

    /// Selected event ids
    pub events: AHashSet<String>,

    /// Selected location ids
    pub locations: AHashSet<String>,

    /// Which visualization last selected something
    pub last_source: Option<SelectionSource>,

    /// Which visualization selected each item
    origins: AHashMap<(SelectionKind, String), SelectionSource>,
}

impl SelectionState {
    /// The id set for one kind
    pub fn set(&self, kind: SelectionKind) -> &AHashSet<String> {
        match kind {
            SelectionKind::Entity => &self.entities,
            SelectionKind::Event => &self.events,
            SelectionKind::Location => &self.locations,
        }
    }

    fn set_mut(&mut self, kind: SelectionKind) -> &mut AHashSet<String> {
        match kind {
            SelectionKind::Entity => &mut self.entities,
            SelectionKind::Event => &mut self.events,
            SelectionKind::Location => &mut self.locations,
        }
    }

    /// The visualization that selected `id`, if it is selected
    pub fn selected_by(&self, kind: SelectionKind, id: &str) -> Option<&SelectionSource> {
        self.origins.get(&(kind, id.to_string()))
    }

    /// Whether anything of any kind is selected
    pub fn has_selection(&self) -> bool {
        !self.entities.is_empty() || !self.events.is_empty() || !self.locations.is_empty()
    }

    /// Total number of selected items
    pub fn len(&self) -> usize {
        self.entities.len() + self.events.len() + self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_selection()
    }
}

/// Synchronization settings for a specific view
#[derive(Debug, Clone)]
pub struct ViewSyncSettings {
    /// Whether this view follows selections made in other views
    pub sync_selection: bool,

    /// Whether this view follows hover highlights made in other views
    pub sync_highlight: bool,
}

impl Default for ViewSyncSettings {
    fn default() -> Self {
        Self {
            sync_selection: true,
            sync_highlight: true,
        }
    }
}

/// Registry coordinating the selection across multiple views
#[derive(Clone, Default)]
pub struct SelectionRegistry {
    /// Shared selection state
    state: Arc<RwLock<SelectionState>>,

    /// Item currently under the pointer, if any
    highlight: Arc<RwLock<Option<(SelectionKind, String)>>>,

    /// View-specific sync settings
    view_settings: Arc<RwLock<AHashMap<String, ViewSyncSettings>>>,

    subscribers: Arc<RwLock<Vec<Weak<dyn SelectionSubscriber>>>>,
}

impl SelectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an entity. `exclusive` clears the other selected entities first.
    pub fn select_entity(&self, id: impl Into<String>, exclusive: bool, source: SelectionSource) {
        self.select(SelectionKind::Entity, id, exclusive, source);
    }

    /// Select an event. `exclusive` clears the other selected events first.
    pub fn select_event(&self, id: impl Into<String>, exclusive: bool, source: SelectionSource) {
        self.select(SelectionKind::Event, id, exclusive, source);
    }

    /// Select a location. `exclusive` clears the other selected locations first.
    pub fn select_location(&self, id: impl Into<String>, exclusive: bool, source: SelectionSource) {
        self.select(SelectionKind::Location, id, exclusive, source);
    }

    /// Add `id` to the selection of `kind` and record `source`
    pub fn select(
        &self,
        kind: SelectionKind,
        id: impl Into<String>,
        exclusive: bool,
        source: SelectionSource,
    ) {
        let id = id.into();
        trace!(?kind, %id, exclusive, %source, "select");

        let mut state = self.state.write();
        if exclusive {
            state.set_mut(kind).clear();
            state.origins.retain(|(k, _), _| *k != kind);
        }
        state.set_mut(kind).insert(id.clone());
        state.origins.insert((kind, id), source.clone());
        state.last_source = Some(source);

        drop(state);
        self.notify_subscribers();
    }

    /// Remove `id` from the selection of `kind`. Returns whether it was selected.
    pub fn deselect(&self, kind: SelectionKind, id: &str, source: SelectionSource) -> bool {
        let mut state = self.state.write();
        let removed = state.set_mut(kind).remove(id);
        if removed {
            state.origins.remove(&(kind, id.to_string()));
            state.last_source = Some(source);
        }

        drop(state);
        if removed {
            self.notify_subscribers();
        }
        removed
    }

    /// Multi-select toggle. Returns whether `id` is selected afterwards.
    pub fn toggle(&self, kind: SelectionKind, id: &str, source: SelectionSource) -> bool {
        let mut state = self.state.write();
        let set = state.set_mut(kind);
        let selected = if set.remove(id) {
            false
        } else {
            set.insert(id.to_string());
            true
        };
        if selected {
            state.origins.insert((kind, id.to_string()), source.clone());
        } else {
            state.origins.remove(&(kind, id.to_string()));
        }
        state.last_source = Some(source);

        drop(state);
        self.notify_subscribers();
        selected
    }

    /// Empty all three selection sets
    pub fn clear_selection(&self) {
        let mut state = self.state.write();
        let changed = state.has_selection();
        state.entities.clear();
        state.events.clear();
        state.locations.clear();
        state.origins.clear();

        drop(state);
        if changed {
            self.notify_subscribers();
        }
    }

    pub fn is_entity_selected(&self, id: &str) -> bool {
        self.is_selected(SelectionKind::Entity, id)
    }

    pub fn is_event_selected(&self, id: &str) -> bool {
        self.is_selected(SelectionKind::Event, id)
    }

    pub fn is_location_selected(&self, id: &str) -> bool {
        self.is_selected(SelectionKind::Location, id)
    }

    pub fn is_selected(&self, kind: SelectionKind, id: &str) -> bool {
        self.state.read().set(kind).contains(id)
    }

    /// True if any of the three sets is non-empty
    pub fn has_selection(&self) -> bool {
        self.state.read().has_selection()
    }

    /// Ids of one kind, sorted for stable display
    pub fn selected(&self, kind: SelectionKind) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().set(kind).iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Get a copy of the current selection state
    pub fn snapshot(&self) -> SelectionState {
        self.state.read().clone()
    }

    /// The visualization that made the most recent selection
    pub fn last_source(&self) -> Option<SelectionSource> {
        self.state.read().last_source.clone()
    }

    /// The visualization that selected `id`, if it is selected
    pub fn selected_by(&self, kind: SelectionKind, id: &str) -> Option<SelectionSource> {
        self.state.read().selected_by(kind, id).cloned()
    }

    /// Set the hover highlight. Highlights are transient and not part of the selection.
    pub fn set_highlight(&self, item: Option<(SelectionKind, String)>) {
        *self.highlight.write() = item;
    }

    pub fn highlight(&self) -> Option<(SelectionKind, String)> {
        self.highlight.read().clone()
    }

    /// Register a view with sync settings
    pub fn register_view(&self, view_id: impl Into<String>, settings: ViewSyncSettings) {
        self.view_settings.write().insert(view_id.into(), settings);
    }

    /// Unregister a view
    pub fn unregister_view(&self, view_id: &str) {
        self.view_settings.write().remove(view_id);
    }

    /// Check if a view should follow selections from other views
    pub fn should_sync_selection(&self, view_id: &str) -> bool {
        self.view_settings
            .read()
            .get(view_id)
            .map(|s| s.sync_selection)
            .unwrap_or(true)
    }

    /// Check if a view should follow hover highlights from other views
    pub fn should_sync_highlight(&self, view_id: &str) -> bool {
        self.view_settings
            .read()
            .get(view_id)
            .map(|s| s.sync_highlight)
            .unwrap_or(true)
    }

    /// Add a subscriber. Only a weak reference is kept.
    pub fn add_subscriber(&self, subscriber: &Arc<dyn SelectionSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(subscriber));
    }

    /// Notify all subscribers of a selection change
    fn notify_subscribers(&self) {
        let snapshot = self.snapshot();

        // Upgrade under the lock, call outside it so a subscriber may query the registry
        let live: Vec<Arc<dyn SelectionSubscriber>> = {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            subscriber.on_selection_change(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_exclusive_select_leaves_single_id() {
        let registry = SelectionRegistry::new();
        registry.select_entity("e1", false, SelectionSource::Graph);
        registry.select_entity("e2", false, SelectionSource::Graph);
        registry.select_entity("e3", true, SelectionSource::Graph);

        assert_eq!(registry.selected(SelectionKind::Entity), vec!["e3".to_string()]);
    }

    #[test]
    fn test_non_exclusive_select_accumulates() {
        let registry = SelectionRegistry::new();
        for id in ["c", "a", "b"] {
            registry.select_entity(id, false, SelectionSource::List);
        }

        assert_eq!(registry.selected(SelectionKind::Entity), vec!["a", "b", "c"]);
        assert!(registry.is_entity_selected("a"));
        assert!(!registry.is_event_selected("a"));
    }

    #[test]
    fn test_each_item_remembers_who_selected_it() {
        let registry = SelectionRegistry::new();
        registry.select_location("l1", false, SelectionSource::Map);
        registry.select_location("l2", false, SelectionSource::Graph);
        registry.toggle(SelectionKind::Location, "l3", SelectionSource::List);

        assert_eq!(registry.selected_by(SelectionKind::Location, "l1"), Some(SelectionSource::Map));
        assert_eq!(registry.selected_by(SelectionKind::Location, "l2"), Some(SelectionSource::Graph));
        assert_eq!(registry.selected_by(SelectionKind::Location, "l3"), Some(SelectionSource::List));
        assert_eq!(registry.selected_by(SelectionKind::Entity, "l1"), None);

        registry.deselect(SelectionKind::Location, "l2", SelectionSource::Graph);
        assert_eq!(registry.selected_by(SelectionKind::Location, "l2"), None);

        registry.select_location("l4", true, SelectionSource::Timeline);
        assert_eq!(registry.selected_by(SelectionKind::Location, "l1"), None);
        assert_eq!(registry.selected_by(SelectionKind::Location, "l4"), Some(SelectionSource::Timeline));

        registry.clear_selection();
        assert_eq!(registry.selected_by(SelectionKind::Location, "l4"), None);
    }

    #[test]
    fn test_last_source_wins() {
        let registry = SelectionRegistry::new();
        registry.select_entity("e1", true, SelectionSource::Graph);
        registry.select_entity("e2", true, SelectionSource::Timeline);

        let state = registry.snapshot();
        assert_eq!(state.entities.len(), 1);
        assert!(state.entities.contains("e2"));
        assert_eq!(state.last_source, Some(SelectionSource::Timeline));
    }

    #[test]
    fn test_kinds_are_independent() {
        let registry = SelectionRegistry::new();
        registry.select_entity("x", true, SelectionSource::Graph);
        registry.select_event("x", true, SelectionSource::Timeline);
        registry.select_location("loc", true, SelectionSource::Map);

        // exclusive entity select does not touch events or locations
        registry.select_entity("y", true, SelectionSource::Graph);
        assert!(registry.is_event_selected("x"));
        assert!(registry.is_location_selected("loc"));
        assert!(!registry.is_entity_selected("x"));
    }

    #[test]
    fn test_clear_selection() {
        let registry = SelectionRegistry::new();
        registry.select_entity("e1", false, SelectionSource::Graph);
        registry.select_event("ev1", false, SelectionSource::Timeline);
        registry.select_location("l1", false, SelectionSource::Map);
        assert!(registry.has_selection());

        registry.clear_selection();
        assert!(!registry.has_selection());
        assert!(!registry.is_entity_selected("e1"));
        assert!(!registry.is_event_selected("ev1"));
        assert!(!registry.is_location_selected("l1"));
    }

    #[test]
    fn test_toggle_and_deselect() {
        let registry = SelectionRegistry::new();
        assert!(registry.toggle(SelectionKind::Event, "ev", SelectionSource::Timeline));
        assert!(!registry.toggle(SelectionKind::Event, "ev", SelectionSource::Timeline));
        assert!(!registry.has_selection());

        registry.select_event("ev", false, SelectionSource::Timeline);
        assert!(registry.deselect(SelectionKind::Event, "ev", SelectionSource::Map));
        assert!(!registry.deselect(SelectionKind::Event, "ev", SelectionSource::Map));
        assert_eq!(registry.last_source(), Some(SelectionSource::Map));
    }

    #[test]
    fn test_unknown_views_sync_by_default() {
        let registry = SelectionRegistry::new();
        assert!(registry.should_sync_selection("map"));

        registry.register_view(
            "map",
            ViewSyncSettings {
                sync_selection: false,
                sync_highlight: true,
            },
        );
        assert!(!registry.should_sync_selection("map"));
        assert!(registry.should_sync_highlight("map"));

        registry.unregister_view("map");
        assert!(registry.should_sync_selection("map"));
    }

    struct CountingSubscriber {
        calls: AtomicUsize,
    }

    impl SelectionSubscriber for CountingSubscriber {
        fn on_selection_change(&self, _selection: &SelectionState) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_subscribers_are_notified_and_pruned() {
        let registry = SelectionRegistry::new();
        let counter = Arc::new(CountingSubscriber {
            calls: AtomicUsize::new(0),
        });
        let subscriber: Arc<dyn SelectionSubscriber> = counter.clone();
        registry.add_subscriber(&subscriber);

        registry.select_entity("e1", true, SelectionSource::Graph);
        registry.clear_selection();
        // clearing an empty selection is not a change
        registry.clear_selection();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);

        drop(subscriber);
        drop(counter);
        registry.select_entity("e2", true, SelectionSource::Graph);
        assert!(registry.subscribers.read().is_empty());
    }
}

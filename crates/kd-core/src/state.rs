//! Application state composed at the root and shared with every panel

use std::sync::Arc;

use parking_lot::RwLock;

use crate::annotations::AnnotationService;
use crate::events::events::{PreferenceChanged, SelectionChanged};
use crate::events::EventBus;
use crate::filter::FilterLibrary;
use crate::preferences::{global_listener, PreferenceStorage, PreferenceStore, Subscription};
use crate::selection::{SelectionRegistry, SelectionState, SelectionSubscriber};
use crate::settings::{
    ExportPreferences, PanelLayout, PreferenceHandle, SearchHistory, ThemePreferences,
};

/// The main application state
pub struct AppState {
    /// Shared selection across graph, timeline and map
    pub selection: SelectionRegistry,

    /// Persisted user preferences
    pub preferences: PreferenceStore,

    /// The event bus
    pub event_bus: EventBus,

    /// Annotations on dataset items
    pub annotations: Arc<RwLock<AnnotationService>>,

    pub theme: PreferenceHandle<ThemePreferences>,

    pub export: PreferenceHandle<ExportPreferences>,

    pub search_history: SearchHistory,

    pub filters: FilterLibrary,

    pub panel_layout: PanelLayout,

    /// Forwards selection changes to the event bus
    _selection_bridge: Arc<dyn SelectionSubscriber>,

    /// Forwards preference changes to the event bus
    _preference_bridge: Subscription,
}

struct SelectionBridge {
    event_bus: EventBus,
}

impl SelectionSubscriber for SelectionBridge {
    fn on_selection_change(&self, selection: &SelectionState) {
        self.event_bus.publish(SelectionChanged {
            source: selection.last_source.clone(),
            selected_count: selection.len(),
        });
    }
}

impl AppState {
    /// Build the state over a storage backend
    pub fn new(storage: Arc<dyn PreferenceStorage>) -> Self {
        let preferences = PreferenceStore::new(storage);
        let selection = SelectionRegistry::new();
        let event_bus = EventBus::new();

        let selection_bridge: Arc<dyn SelectionSubscriber> = Arc::new(SelectionBridge {
            event_bus: event_bus.clone(),
        });
        selection.add_subscriber(&selection_bridge);

        let bus = event_bus.clone();
        let preference_bridge = preferences.add_global_listener(global_listener(move |key, _| {
            bus.publish(PreferenceChanged {
                key: key.to_string(),
            });
        }));

        Self {
            annotations: Arc::new(RwLock::new(AnnotationService::persist_to(preferences.clone()))),
            theme: ThemePreferences::handle(&preferences),
            export: ExportPreferences::handle(&preferences),
            search_history: SearchHistory::new(&preferences),
            filters: FilterLibrary::new(&preferences),
            panel_layout: PanelLayout::new(&preferences),
            selection,
            preferences,
            event_bus,
            _selection_bridge: selection_bridge,
            _preference_bridge: preference_bridge,
        }
    }

    /// State that keeps nothing across runs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::preferences::MemoryStorage::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::keys;
    use crate::selection::SelectionSource;

    #[test]
    fn test_selection_changes_reach_the_bus() {
        let state = AppState::in_memory();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();
        state.event_bus.on::<SelectionChanged, _>(move |event| {
            sink.write().push((event.source.clone(), event.selected_count));
        });

        state.selection.select_entity("e1", true, SelectionSource::Graph);
        state.selection.select_event("ev1", false, SelectionSource::Timeline);

        assert_eq!(
            seen.read().as_slice(),
            &[
                (Some(SelectionSource::Graph), 1),
                (Some(SelectionSource::Timeline), 2)
            ]
        );
    }

    #[test]
    fn test_preference_changes_reach_the_bus() {
        let state = AppState::in_memory();
        let keys_seen = Arc::new(RwLock::new(Vec::new()));
        let sink = keys_seen.clone();
        state.event_bus.on::<PreferenceChanged, _>(move |event| {
            sink.write().push(event.key.clone());
        });

        state.theme.update(|theme| theme.high_contrast = true);
        state.search_history.record("harbor");

        assert_eq!(
            keys_seen.read().as_slice(),
            &[keys::THEME.to_string(), keys::SEARCH_HISTORY.to_string()]
        );
        assert!(state.theme.load().high_contrast);
    }

    #[test]
    fn test_bus_handler_may_write_preferences() {
        let state = AppState::in_memory();
        let preferences = state.preferences.clone();
        state.event_bus.on::<SelectionChanged, _>(move |event| {
            preferences.save_preference("lastSelectionCount", &event.selected_count);
        });
        let keys_seen = Arc::new(RwLock::new(Vec::new()));
        let sink = keys_seen.clone();
        state.event_bus.on::<PreferenceChanged, _>(move |event| {
            sink.write().push(event.key.clone());
        });

        state.selection.select_entity("e1", true, SelectionSource::Graph);

        assert_eq!(state.preferences.get_preference("lastSelectionCount", 0usize), 1);
        assert_eq!(keys_seen.read().as_slice(), &["lastSelectionCount".to_string()]);
    }
}

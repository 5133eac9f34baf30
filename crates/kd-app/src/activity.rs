//! Event bus consumer for the frame loop
//!
//! Failures published by background fetches are queued for the error banner.
//! Everything else updates the one-line activity shown in the status bar.

use std::sync::Arc;

use kd_core::annotations::AnnotationEvent;
use kd_core::events::events::{
    AnnotationChanged, DatasetIndexLoaded, DatasetLoadFailed, DatasetLoaded, PreferenceChanged,
    SelectionChanged,
};
use kd_core::preferences::keys;
use kd_core::EventBus;
use parking_lot::Mutex;

#[derive(Default)]
struct FeedState {
    failures: Vec<(String, String)>,
    status: Option<String>,
}

/// What the bus reported since the last frame
#[derive(Clone, Default)]
pub struct ActivityFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ActivityFeed {
    /// Subscribe to the events the dashboard shows
    pub fn attach(bus: &EventBus, source_name: &str) -> Self {
        let feed = Self::default();

        let state = feed.state.clone();
        let source_name = source_name.to_string();
        bus.on::<DatasetIndexLoaded, _>(move |event| {
            let mut state = state.lock();
            if event.dataset_count == 0 {
                state.failures.push((
                    "No datasets".to_string(),
                    format!("The dataset index at {} is empty or unreachable", source_name),
                ));
            } else {
                state.status = Some(format!("{} dataset(s) available", event.dataset_count));
            }
        });

        let state = feed.state.clone();
        bus.on::<DatasetLoaded, _>(move |event| {
            state.lock().status = Some(format!(
                "Loaded {}: {} entities, {} events, {} locations",
                event.dataset_id, event.entity_count, event.event_count, event.location_count
            ));
        });

        let state = feed.state.clone();
        bus.on::<DatasetLoadFailed, _>(move |event| {
            state
                .lock()
                .failures
                .push((format!("Could not load {}", event.dataset_name), event.error.clone()));
        });

        let state = feed.state.clone();
        bus.on::<SelectionChanged, _>(move |event| {
            let status = match (&event.source, event.selected_count) {
                (_, 0) => "Selection cleared".to_string(),
                (Some(source), count) => format!("{} selected from {}", count, source),
                (None, count) => format!("{} selected", count),
            };
            state.lock().status = Some(status);
        });

        let state = feed.state.clone();
        bus.on::<AnnotationChanged, _>(move |event| {
            let status = match &event.change {
                AnnotationEvent::Created(_) => "Annotation created".to_string(),
                AnnotationEvent::Updated(_) => "Annotation updated".to_string(),
                AnnotationEvent::Deleted(_) => "Annotation deleted".to_string(),
                AnnotationEvent::Imported(count) => format!("Imported {} annotation(s)", count),
            };
            state.lock().status = Some(status);
        });

        let state = feed.state.clone();
        bus.on::<PreferenceChanged, _>(move |event| {
            // panel sizes change on every drag frame
            let status = match event.key.as_str() {
                keys::PANEL_SIZES => return,
                keys::ALL => "Preferences reset".to_string(),
                key => format!("Saved {}", key),
            };
            state.lock().status = Some(status);
        });

        feed
    }

    /// Failures not shown yet, as (title, message)
    pub fn take_failures(&self) -> Vec<(String, String)> {
        std::mem::take(&mut self.state.lock().failures)
    }

    /// Latest activity line
    pub fn status(&self) -> Option<String> {
        self.state.lock().status.clone()
    }
}

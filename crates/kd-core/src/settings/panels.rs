//! Panel sizes and the drag state behind a resize handle

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::preferences::{keys, PreferenceStore};

use super::PreferenceHandle;

/// Panel id to size in points, persisted under `panelSizes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelSizes(pub IndexMap<String, f32>);

impl PanelSizes {
    pub fn get(&self, panel_id: &str) -> Option<f32> {
        self.0.get(panel_id).copied()
    }
}

/// Reads and writes panel sizes through the preference store
#[derive(Clone)]
pub struct PanelLayout {
    handle: PreferenceHandle<PanelSizes>,
}

impl PanelLayout {
    pub fn new(store: &PreferenceStore) -> Self {
        Self {
            handle: PreferenceHandle::new(store.clone(), keys::PANEL_SIZES, PanelSizes::default()),
        }
    }

    /// Saved size of a panel, or `default`
    pub fn size(&self, panel_id: &str, default: f32) -> f32 {
        self.handle
            .load()
            .get(panel_id)
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(default)
    }

    pub fn set_size(&self, panel_id: &str, size: f32) {
        self.handle.update(|sizes| {
            sizes.0.insert(panel_id.to_string(), size);
        });
    }

    /// Drop every saved size
    pub fn reset(&self) {
        self.handle.reset();
    }
}

/// Drag state of one resize handle
#[derive(Debug, Clone)]
pub struct ResizeState {
    panel_id: String,
    min: f32,
    max: f32,
    size: f32,
    drag_start: Option<f32>,
}

impl ResizeState {
    /// Start from the saved size, clamped to `[min, max]`
    pub fn load(layout: &PanelLayout, panel_id: &str, default: f32, min: f32, max: f32) -> Self {
        let size = layout.size(panel_id, default).clamp(min, max);
        Self {
            panel_id: panel_id.to_string(),
            min,
            max,
            size,
            drag_start: None,
        }
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    pub fn begin(&mut self) {
        self.drag_start = Some(self.size);
    }

    /// Apply the total pointer movement since [`ResizeState::begin`]
    pub fn drag(&mut self, total_delta: f32) -> f32 {
        if let Some(start) = self.drag_start {
            self.size = (start + total_delta).clamp(self.min, self.max);
        }
        self.size
    }

    /// End the drag and persist the final size
    pub fn finish(&mut self, layout: &PanelLayout) {
        if self.drag_start.take().is_some() {
            layout.set_size(&self.panel_id, self.size);
        }
    }

    /// Abandon the drag and restore the size it started from
    pub fn cancel(&mut self) {
        if let Some(start) = self.drag_start.take() {
            self.size = start;
        }
    }

    /// Step the size from the keyboard and persist it
    pub fn nudge(&mut self, delta: f32, layout: &PanelLayout) {
        self.size = (self.size + delta).clamp(self.min, self.max);
        layout.set_size(&self.panel_id, self.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_is_clamped_and_persisted_on_finish() {
        let store = PreferenceStore::in_memory();
        let layout = PanelLayout::new(&store);
        let mut state = ResizeState::load(&layout, "sidebar", 250.0, 150.0, 400.0);

        state.begin();
        assert_eq!(state.drag(100.0), 350.0);
        assert_eq!(state.drag(500.0), 400.0);
        assert_eq!(layout.size("sidebar", 250.0), 250.0);

        state.finish(&layout);
        assert!(!state.is_dragging());
        assert_eq!(layout.size("sidebar", 250.0), 400.0);
    }

    #[test]
    fn test_cancel_restores_start() {
        let layout = PanelLayout::new(&PreferenceStore::in_memory());
        let mut state = ResizeState::load(&layout, "timeline", 200.0, 100.0, 300.0);
        state.begin();
        state.drag(-80.0);
        state.cancel();
        assert_eq!(state.size(), 200.0);
    }

    #[test]
    fn test_saved_size_outside_bounds_is_clamped_on_load() {
        let store = PreferenceStore::in_memory();
        let layout = PanelLayout::new(&store);
        layout.set_size("map", 5.0);

        let state = ResizeState::load(&layout, "map", 300.0, 120.0, 600.0);
        assert_eq!(state.size(), 120.0);
    }

    #[test]
    fn test_nudge_persists_immediately() {
        let layout = PanelLayout::new(&PreferenceStore::in_memory());
        let mut state = ResizeState::load(&layout, "graph", 300.0, 100.0, 500.0);
        state.nudge(-20.0, &layout);
        assert_eq!(layout.size("graph", 0.0), 280.0);
    }
}

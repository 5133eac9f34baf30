//! Visualization panels sharing the selection registry
//!
//! Every panel reads the current selection from the registry when it paints
//! and writes clicks back through it, tagged with its own source. Nothing is
//! cached between frames, so all panels agree on the selection at all times.

mod graph;
mod map;
mod timeline;

use egui::{Modifiers, Response, Ui};
use kd_core::selection::ViewSyncSettings;
use kd_core::{AppState, FilterGroup, Filterable, SelectionKind, SelectionRegistry, SelectionSource};
use kd_data::DatasetDocument;

pub use graph::{circle_layout, GraphPanel};
pub use map::{project, GeoBounds, MapPanel};
pub use timeline::{time_fractions, TimelinePanel};

/// What a panel gets to draw with each frame
pub struct PanelContext<'a> {
    pub state: &'a AppState,
    pub document: &'a DatasetDocument,
    /// Items that do not match are not drawn
    pub filter: &'a FilterGroup,
    /// Collection the filter is limited to; `None` filters every collection
    pub filter_scope: Option<SelectionKind>,
}

impl PanelContext<'_> {
    /// Whether an item of `kind` passes the active filter
    pub fn passes(&self, kind: SelectionKind, item: &impl Filterable) -> bool {
        match self.filter_scope {
            Some(scope) if scope != kind => true,
            _ => self.filter.matches(item),
        }
    }
}

/// A dockable visualization
pub trait DashboardPanel {
    /// Stable id, also used for the view sync settings
    fn id(&self) -> &str;

    fn title(&self) -> String;

    /// Source tag attached to selections made in this panel
    fn source(&self) -> SelectionSource;

    fn ui(&mut self, ui: &mut Ui, ctx: &PanelContext<'_>);
}

/// Register a panel with default sync settings
pub fn register_panel(registry: &SelectionRegistry, panel: &dyn DashboardPanel) {
    registry.register_view(panel.id(), ViewSyncSettings::default());
}

/// Apply a click on an item: plain click selects only that item,
/// ctrl/cmd-click toggles it in the current selection.
pub fn apply_click(
    registry: &SelectionRegistry,
    kind: SelectionKind,
    id: &str,
    source: SelectionSource,
    modifiers: Modifiers,
) {
    if modifiers.command || modifiers.ctrl {
        registry.toggle(kind, id, source);
    } else {
        registry.select(kind, id, true, source);
    }
}

/// Whether a panel should draw an item as selected
///
/// A panel that does not sync selections only shows the items it selected
/// itself, whoever acted last.
pub fn shows_selected(
    registry: &SelectionRegistry,
    view_id: &str,
    source: &SelectionSource,
    kind: SelectionKind,
    id: &str,
) -> bool {
    if !registry.is_selected(kind, id) {
        return false;
    }
    registry.should_sync_selection(view_id) || registry.selected_by(kind, id).as_ref() == Some(source)
}

/// Whether a panel should draw an item as highlighted
pub fn shows_highlight(registry: &SelectionRegistry, view_id: &str, kind: SelectionKind, id: &str) -> bool {
    registry.should_sync_highlight(view_id)
        && registry
            .highlight()
            .map_or(false, |(hk, hid)| hk == kind && hid == id)
}

/// Track hover over an item so other panels can highlight it
pub(crate) fn track_hover(registry: &SelectionRegistry, response: &Response, hovered: Option<(SelectionKind, String)>) {
    if response.hovered() && registry.highlight() != hovered {
        registry.set_highlight(hovered);
    }
}

/// Per-panel sync toggles shown in each panel's header
pub(crate) fn sync_toggles(ui: &mut Ui, registry: &SelectionRegistry, view_id: &str) {
    let mut settings = ViewSyncSettings {
        sync_selection: registry.should_sync_selection(view_id),
        sync_highlight: registry.should_sync_highlight(view_id),
    };
    let mut changed = ui
        .checkbox(&mut settings.sync_selection, "Sync selection")
        .changed();
    changed |= ui
        .checkbox(&mut settings.sync_highlight, "Sync hover")
        .changed();
    if changed {
        registry.register_view(view_id, settings);
    }
}

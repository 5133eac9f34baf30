//! Dockable workspace holding every panel

use egui::{Ui, WidgetText};
use egui_dock::{DockArea, DockState, NodeIndex, TabViewer};
use kd_core::AppState;
use kd_data::DatasetDocument;

use crate::annotation_panel::AnnotationPanel;
use crate::filter_editor::FilterEditor;
use crate::panels::{register_panel, DashboardPanel, GraphPanel, MapPanel, PanelContext, TimelinePanel};
use crate::search_panel::SearchPanel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Graph,
    Timeline,
    Map,
    Search,
    Annotations,
    Filters,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Graph,
        Tab::Timeline,
        Tab::Map,
        Tab::Search,
        Tab::Annotations,
        Tab::Filters,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Graph => "Graph",
            Tab::Timeline => "Timeline",
            Tab::Map => "Map",
            Tab::Search => "Search",
            Tab::Annotations => "Annotations",
            Tab::Filters => "Filters",
        }
    }
}

/// Graph on the left, timeline and map below it, tools on the right
pub fn default_layout() -> DockState<Tab> {
    let mut dock_state = DockState::new(vec![Tab::Graph]);
    let surface = dock_state.main_surface_mut();
    let [views, _tools] = surface.split_right(
        NodeIndex::root(),
        0.68,
        vec![Tab::Search, Tab::Annotations, Tab::Filters],
    );
    surface.split_below(views, 0.55, vec![Tab::Timeline, Tab::Map]);
    dock_state
}

/// The docked panels and their per-panel state
pub struct Workspace {
    dock_state: DockState<Tab>,
    graph: GraphPanel,
    timeline: TimelinePanel,
    map: MapPanel,
    search: SearchPanel,
    annotations: AnnotationPanel,
    filters: FilterEditor,
}

impl Workspace {
    pub fn new(state: &AppState) -> Self {
        let workspace = Self {
            dock_state: default_layout(),
            graph: GraphPanel::new(),
            timeline: TimelinePanel::new(),
            map: MapPanel::new(),
            search: SearchPanel::new(),
            annotations: AnnotationPanel::default(),
            filters: FilterEditor::new(),
        };
        register_panel(&state.selection, &workspace.graph);
        register_panel(&state.selection, &workspace.timeline);
        register_panel(&state.selection, &workspace.map);
        workspace
    }

    pub fn reset_layout(&mut self) {
        self.dock_state = default_layout();
    }

    pub fn is_open(&self, tab: Tab) -> bool {
        self.dock_state.find_tab(&tab).is_some()
    }

    /// Bring a tab to the front, reopening it if it was closed
    pub fn show_tab(&mut self, tab: Tab) {
        match self.dock_state.find_tab(&tab) {
            Some(location) => self.dock_state.set_active_tab(location),
            None => self.dock_state.push_to_focused_leaf(tab),
        }
    }

    /// Show the search tab and focus its input
    pub fn focus_search(&mut self) {
        self.show_tab(Tab::Search);
        self.search.request_focus();
    }

    pub fn filters(&self) -> &FilterEditor {
        &self.filters
    }

    pub fn ui(&mut self, ui: &mut Ui, state: &AppState, document: Option<&DatasetDocument>, author: &str) {
        let mut viewer = WorkspaceTabViewer {
            state,
            document,
            author,
            graph: &mut self.graph,
            timeline: &mut self.timeline,
            map: &mut self.map,
            search: &mut self.search,
            annotations: &mut self.annotations,
            filters: &mut self.filters,
        };

        DockArea::new(&mut self.dock_state)
            .show_close_buttons(true)
            .draggable_tabs(true)
            .show_tab_name_on_hover(true)
            .show_inside(ui, &mut viewer);
    }
}

struct WorkspaceTabViewer<'a> {
    state: &'a AppState,
    document: Option<&'a DatasetDocument>,
    author: &'a str,
    graph: &'a mut GraphPanel,
    timeline: &'a mut TimelinePanel,
    map: &'a mut MapPanel,
    search: &'a mut SearchPanel,
    annotations: &'a mut AnnotationPanel,
    filters: &'a mut FilterEditor,
}

impl WorkspaceTabViewer<'_> {
    fn panel_ui(&mut self, ui: &mut Ui, tab: Tab) {
        let Some(document) = self.document else {
            ui.centered_and_justified(|ui| ui.weak("No dataset loaded"));
            return;
        };
        let ctx = PanelContext {
            state: self.state,
            document,
            filter: self.filters.root(),
            filter_scope: self.filters.scope(),
        };
        let panel: &mut dyn DashboardPanel = match tab {
            Tab::Graph => &mut *self.graph,
            Tab::Timeline => &mut *self.timeline,
            _ => &mut *self.map,
        };
        panel.ui(ui, &ctx);
    }
}

impl TabViewer for WorkspaceTabViewer<'_> {
    type Tab = Tab;

    fn title(&mut self, tab: &mut Self::Tab) -> WidgetText {
        tab.title().into()
    }

    fn ui(&mut self, ui: &mut Ui, tab: &mut Self::Tab) {
        match *tab {
            Tab::Graph | Tab::Timeline | Tab::Map => self.panel_ui(ui, *tab),
            Tab::Search => self
                .search
                .ui(ui, self.document, &self.state.search_history, &self.state.selection),
            Tab::Annotations => self.annotations.ui(ui, self.state, self.author),
            Tab::Filters => self.filters.ui(ui, &self.state.filters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_every_tab() {
        let layout = default_layout();
        for tab in Tab::ALL {
            assert!(layout.find_tab(&tab).is_some(), "{:?} missing", tab);
        }
    }

    #[test]
    fn test_focus_search_keeps_the_tab_open() {
        let state = AppState::in_memory();
        let mut workspace = Workspace::new(&state);
        workspace.focus_search();
        assert!(workspace.is_open(Tab::Search));

        workspace.reset_layout();
        assert!(workspace.is_open(Tab::Graph));
        assert!(state.selection.should_sync_selection("graph"));
    }
}

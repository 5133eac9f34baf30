//! User interface for the Kindi dashboard
//!
//! The egui side of the dashboard: the docked graph, timeline and map panels,
//! the search, annotation and filter tools, the application shell and the
//! theme derived from the user's preferences.

pub mod annotation_panel;
pub mod filter_editor;
pub mod keyboard;
pub mod panels;
pub mod resize;
pub mod search_panel;
pub mod shell;
pub mod theme;
pub mod viewport;

// Re-export commonly used types
pub use annotation_panel::{apply_action, AnnotationAction, AnnotationPanel};
pub use filter_editor::FilterEditor;
pub use keyboard::Shortcuts;
pub use panels::{DashboardPanel, PanelContext};
pub use resize::{ResizeAxis, ResizeHandle};
pub use search_panel::SearchPanel;
pub use shell::{menu_bar, status_bar, ErrorBanner, MenuAction, MenuModel, PreferencesWindow};
pub use theme::apply_theme;
pub use viewport::{Tab, Workspace};

//! Typed preferences
//!
//! Each feature binds one serializable settings type to one preference key
//! through a [`PreferenceHandle`], instead of talking to the raw store.

mod export;
mod handle;
mod panels;
mod search;
mod theme;

pub use export::{ExportFormat, ExportPreferences};
pub use handle::PreferenceHandle;
pub use panels::{PanelLayout, PanelSizes, ResizeState};
pub use search::{SearchHistory, MAX_SEARCH_HISTORY};
pub use theme::{AccentColor, ThemeMode, ThemePreferences};

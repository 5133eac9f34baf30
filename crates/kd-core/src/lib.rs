//! Core state for the Kindi analysis dashboard
//!
//! This crate holds the pieces every panel shares: the selection registry,
//! the preference store and the typed settings built on it, annotations,
//! advanced filters and the application event bus.

pub mod annotations;
pub mod events;
pub mod filter;
pub mod preferences;
pub mod selection;
pub mod settings;
pub mod state;

// Re-export commonly used types
pub use annotations::{Annotation, AnnotationError, AnnotationService, TargetType};
pub use events::EventBus;
pub use filter::{Filterable, FilterGroup, FilterNode};
pub use preferences::{PreferenceStore, PreferenceValue, Subscription};
pub use selection::{SelectionKind, SelectionRegistry, SelectionSource, SelectionState};
pub use state::AppState;

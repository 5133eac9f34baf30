//! Selection subscriber trait

use super::SelectionState;

/// Trait for panels that need to respond to selection changes
pub trait SelectionSubscriber: Send + Sync {
    /// Called after the shared selection has changed
    fn on_selection_change(&self, selection: &SelectionState);
}

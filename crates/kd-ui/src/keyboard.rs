use egui::{Context, Key, KeyboardShortcut, Modifiers};

pub const FOCUS_SEARCH: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::F);

/// Shortcuts pressed this frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Shortcuts {
    pub clear_selection: bool,
    pub focus_search: bool,
}

impl Shortcuts {
    /// Read and consume the global shortcuts
    ///
    /// Escape only clears the selection when no widget holds keyboard focus,
    /// so it still cancels text edits and resize drags.
    pub fn read(ctx: &Context) -> Self {
        let focus_search = ctx.input_mut(|i| i.consume_shortcut(&FOCUS_SEARCH));
        let nothing_focused = ctx.memory(|m| m.focus().is_none());
        let clear_selection = nothing_focused && ctx.input(|i| i.key_pressed(Key::Escape));
        Self {
            clear_selection,
            focus_search,
        }
    }
}

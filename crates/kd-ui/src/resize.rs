//! Drag handle for resizable panels with a persisted size

use egui::{CursorIcon, Key, Sense, Stroke, Ui, Vec2};
use kd_core::settings::{PanelLayout, ResizeState};

const HANDLE_THICKNESS: f32 = 6.0;
const KEYBOARD_STEP: f32 = 16.0;

/// Which way the handle moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAxis {
    /// Drag left/right to change a width
    Horizontal,
    /// Drag up/down to change a height
    Vertical,
}

/// Drag handle between two panels; the size is saved in `panelSizes`
/// when the drag ends
pub struct ResizeHandle {
    state: ResizeState,
    axis: ResizeAxis,
    /// Pointer movement since the drag started
    dragged: f32,
}

impl ResizeHandle {
    pub fn new(layout: &PanelLayout, panel_id: &str, default: f32, min: f32, max: f32, axis: ResizeAxis) -> Self {
        Self {
            state: ResizeState::load(layout, panel_id, default, min, max),
            axis,
            dragged: 0.0,
        }
    }

    pub fn size(&self) -> f32 {
        self.state.size()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    /// Draw the handle and update the size from pointer or keyboard input
    pub fn ui(&mut self, ui: &mut Ui, layout: &PanelLayout) -> f32 {
        let size = match self.axis {
            ResizeAxis::Horizontal => Vec2::new(HANDLE_THICKNESS, ui.available_height()),
            ResizeAxis::Vertical => Vec2::new(ui.available_width(), HANDLE_THICKNESS),
        };
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        let cursor = match self.axis {
            ResizeAxis::Horizontal => CursorIcon::ResizeHorizontal,
            ResizeAxis::Vertical => CursorIcon::ResizeVertical,
        };
        if response.hovered() || response.dragged() {
            ui.ctx().set_cursor_icon(cursor);
        }

        if response.drag_started() {
            self.state.begin();
            self.dragged = 0.0;
        }
        if response.dragged() {
            let delta = response.drag_delta();
            self.dragged += match self.axis {
                ResizeAxis::Horizontal => delta.x,
                ResizeAxis::Vertical => delta.y,
            };
            self.state.drag(self.dragged);
        }
        if response.drag_released() {
            self.state.finish(layout);
        }

        if self.state.is_dragging() && ui.input(|i| i.key_pressed(Key::Escape)) {
            self.state.cancel();
        }

        if response.clicked() {
            response.request_focus();
        }
        if response.has_focus() {
            let (grow, shrink) = match self.axis {
                ResizeAxis::Horizontal => (Key::ArrowRight, Key::ArrowLeft),
                ResizeAxis::Vertical => (Key::ArrowDown, Key::ArrowUp),
            };
            if ui.input(|i| i.key_pressed(grow)) {
                self.state.nudge(KEYBOARD_STEP, layout);
            }
            if ui.input(|i| i.key_pressed(shrink)) {
                self.state.nudge(-KEYBOARD_STEP, layout);
            }
        }

        let visuals = ui.visuals();
        let color = if response.hovered() || self.state.is_dragging() || response.has_focus() {
            visuals.selection.stroke.color
        } else {
            visuals.widgets.noninteractive.bg_stroke.color
        };
        let center = rect.center();
        let line = match self.axis {
            ResizeAxis::Horizontal => [center - Vec2::new(0.0, 12.0), center + Vec2::new(0.0, 12.0)],
            ResizeAxis::Vertical => [center - Vec2::new(12.0, 0.0), center + Vec2::new(12.0, 0.0)],
        };
        ui.painter().line_segment(line, Stroke::new(2.0, color));

        self.state.size()
    }
}

use egui::{Align2, FontId, Pos2, Sense, Stroke, Ui, Vec2};
use kd_core::{SelectionKind, SelectionSource};
use kd_data::Event;

use super::{apply_click, shows_highlight, shows_selected, sync_toggles, track_hover, DashboardPanel, PanelContext};
use crate::resize::{ResizeAxis, ResizeHandle};
use crate::theme::highlight_color;

const MARKER_RADIUS: f32 = 6.0;
const MARGIN: f32 = 24.0;
const CANVAS_SIZE_KEY: &str = "timeline.canvas";

/// Events on a horizontal time axis; undated events are listed below it
pub struct TimelinePanel {
    id: String,
    /// Created on first draw, once the saved size can be read
    canvas_height: Option<ResizeHandle>,
}

impl TimelinePanel {
    pub fn new() -> Self {
        Self {
            id: "timeline".to_string(),
            canvas_height: None,
        }
    }
}

impl Default for TimelinePanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of each event along the axis in `[0, 1]`, `None` for undated events
pub fn time_fractions(events: &[&Event]) -> Vec<Option<f32>> {
    let times: Vec<Option<i64>> = events
        .iter()
        .map(|event| event.time().map(|t| t.timestamp_millis()))
        .collect();

    let (Some(min), Some(max)) = (times.iter().flatten().min(), times.iter().flatten().max()) else {
        return vec![None; events.len()];
    };
    let span = (max - min) as f64;

    times
        .iter()
        .map(|time| {
            time.map(|t| if span == 0.0 { 0.5 } else { ((t - min) as f64 / span) as f32 })
        })
        .collect()
}

impl DashboardPanel for TimelinePanel {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> String {
        "Timeline".to_string()
    }

    fn source(&self) -> SelectionSource {
        SelectionSource::Timeline
    }

    fn ui(&mut self, ui: &mut Ui, ctx: &PanelContext<'_>) {
        let registry = &ctx.state.selection;
        let source = self.source();

        ui.horizontal(|ui| sync_toggles(ui, registry, &self.id));

        let events: Vec<&Event> = ctx
            .document
            .events_sorted()
            .into_iter()
            .filter(|event| ctx.passes(SelectionKind::Event, *event))
            .collect();
        let fractions = time_fractions(&events);

        let layout = &ctx.state.panel_layout;
        let canvas_height = self.canvas_height.get_or_insert_with(|| {
            ResizeHandle::new(layout, CANVAS_SIZE_KEY, 180.0, 80.0, 800.0, ResizeAxis::Vertical)
        });
        let height = canvas_height.size();
        let (response, painter) = ui.allocate_painter(Vec2::new(ui.available_width(), height), Sense::click());
        let rect = response.rect.shrink(MARGIN);
        let axis_y = rect.center().y;

        let visuals = ui.visuals();
        let axis_color = visuals.widgets.noninteractive.bg_stroke.color;
        let accent = visuals.selection.stroke.color;
        let text_color = visuals.text_color();
        let marker_color = visuals.widgets.inactive.fg_stroke.color;

        painter.line_segment(
            [Pos2::new(rect.left(), axis_y), Pos2::new(rect.right(), axis_y)],
            Stroke::new(1.0, axis_color),
        );

        let pointer = response.hover_pos();
        let mut hovered = None;

        for (index, (event, fraction)) in events.iter().zip(&fractions).enumerate() {
            let Some(fraction) = fraction else { continue };
            // alternate labels above and below the axis
            let above = index % 2 == 0;
            let pos = Pos2::new(rect.left() + rect.width() * fraction, axis_y);

            let selected = shows_selected(registry, &self.id, &source, SelectionKind::Event, &event.id);
            let highlighted = shows_highlight(registry, &self.id, SelectionKind::Event, &event.id);
            let under_pointer = pointer.map_or(false, |p| p.distance(pos) <= MARKER_RADIUS + 2.0);
            if under_pointer {
                hovered = Some(event.id.clone());
            }

            let fill = if selected { accent } else { marker_color };
            let stroke = if highlighted || under_pointer {
                Stroke::new(2.0, highlight_color())
            } else {
                Stroke::NONE
            };
            painter.circle(pos, MARKER_RADIUS, fill, stroke);

            let (anchor, offset) = if above {
                (Align2::CENTER_BOTTOM, -MARKER_RADIUS - 4.0)
            } else {
                (Align2::CENTER_TOP, MARKER_RADIUS + 4.0)
            };
            painter.text(
                pos + Vec2::new(0.0, offset),
                anchor,
                &event.title,
                FontId::proportional(11.0),
                text_color,
            );
        }

        track_hover(registry, &response, hovered.clone().map(|id| (SelectionKind::Event, id)));

        if response.clicked() {
            match &hovered {
                Some(id) => {
                    let modifiers = ui.input(|i| i.modifiers);
                    apply_click(registry, SelectionKind::Event, id, source.clone(), modifiers);
                }
                None => registry.clear_selection(),
            }
        }
        if let Some(event) = hovered.as_deref().and_then(|id| ctx.document.event(id)) {
            response.on_hover_text(format!("{}\n{}", event.title, event.timestamp));
        }

        canvas_height.ui(ui, layout);

        let undated: Vec<&&Event> = events
            .iter()
            .zip(&fractions)
            .filter(|(_, fraction)| fraction.is_none())
            .map(|(event, _)| event)
            .collect();
        if !undated.is_empty() {
            ui.separator();
            ui.label("Undated");
            for event in undated {
                let selected = shows_selected(registry, &self.id, &source, SelectionKind::Event, &event.id);
                let item = ui.selectable_label(selected, event.title.as_str());
                if item.clicked() {
                    let modifiers = ui.input(|i| i.modifiers);
                    apply_click(registry, SelectionKind::Event, &event.id, source.clone(), modifiers);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, timestamp: &str) -> Event {
        serde_json::from_value(serde_json::json!({ "id": id, "title": id, "timestamp": timestamp })).unwrap()
    }

    #[test]
    fn test_time_fractions_span_the_axis() {
        let a = event("a", "2023-01-01");
        let b = event("b", "2023-01-03");
        let c = event("c", "2023-01-02");
        let d = event("d", "");

        let fractions = time_fractions(&[&a, &b, &c, &d]);
        assert_eq!(fractions, vec![Some(0.0), Some(1.0), Some(0.5), None]);
    }

    #[test]
    fn test_single_dated_event_is_centered() {
        let a = event("a", "2023-01-01T12:00:00Z");
        assert_eq!(time_fractions(&[&a]), vec![Some(0.5)]);
        assert!(time_fractions(&[]).is_empty());
    }
}

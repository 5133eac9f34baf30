use std::f32::consts::TAU;

use ahash::AHashMap;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use kd_core::{SelectionKind, SelectionSource};
use kd_data::Entity;

use super::{apply_click, shows_highlight, shows_selected, sync_toggles, track_hover, DashboardPanel, PanelContext};
use crate::theme::highlight_color;

const NODE_RADIUS: f32 = 9.0;

/// Entities as nodes on a ring, relationships as edges
pub struct GraphPanel {
    id: String,
    show_labels: bool,
}

impl GraphPanel {
    pub fn new() -> Self {
        Self {
            id: "graph".to_string(),
            show_labels: true,
        }
    }
}

impl Default for GraphPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Evenly spaced positions on the largest circle that fits in `rect`
pub fn circle_layout(count: usize, rect: Rect) -> Vec<Pos2> {
    match count {
        0 => Vec::new(),
        1 => vec![rect.center()],
        _ => {
            let radius = (rect.width().min(rect.height()) / 2.0 - NODE_RADIUS * 3.0).max(NODE_RADIUS);
            (0..count)
                .map(|i| {
                    let angle = TAU * i as f32 / count as f32 - TAU / 4.0;
                    rect.center() + Vec2::angled(angle) * radius
                })
                .collect()
        }
    }
}

impl DashboardPanel for GraphPanel {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> String {
        "Graph".to_string()
    }

    fn source(&self) -> SelectionSource {
        SelectionSource::Graph
    }

    fn ui(&mut self, ui: &mut Ui, ctx: &PanelContext<'_>) {
        let registry = &ctx.state.selection;
        let source = self.source();

        ui.horizontal(|ui| {
            ui.checkbox(&mut self.show_labels, "Labels");
            sync_toggles(ui, registry, &self.id);
        });

        let entities: Vec<&Entity> = ctx
            .document
            .entities
            .iter()
            .filter(|entity| ctx.passes(SelectionKind::Entity, *entity))
            .collect();

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let positions = circle_layout(entities.len(), response.rect);
        let by_id: AHashMap<&str, Pos2> = entities
            .iter()
            .zip(&positions)
            .map(|(entity, pos)| (entity.id.as_str(), *pos))
            .collect();

        let visuals = ui.visuals();
        let edge_color = visuals.widgets.noninteractive.bg_stroke.color;
        let accent = visuals.selection.stroke.color;
        let text_color = visuals.text_color();

        for relationship in &ctx.document.relationships {
            let (Some(from), Some(to)) = (
                by_id.get(relationship.source.as_str()),
                by_id.get(relationship.target.as_str()),
            ) else {
                continue;
            };
            let selected = registry.is_entity_selected(&relationship.source)
                && registry.is_entity_selected(&relationship.target);
            let stroke = if selected {
                Stroke::new(2.0, accent)
            } else {
                Stroke::new(1.0, edge_color)
            };
            painter.line_segment([*from, *to], stroke);
        }

        let pointer = response.hover_pos();
        let mut hovered = None;

        for (entity, pos) in entities.iter().zip(&positions) {
            let selected = shows_selected(registry, &self.id, &source, SelectionKind::Entity, &entity.id);
            let highlighted = shows_highlight(registry, &self.id, SelectionKind::Entity, &entity.id);
            let under_pointer = pointer.map_or(false, |p| p.distance(*pos) <= NODE_RADIUS);
            if under_pointer {
                hovered = Some(entity.id.clone());
            }

            let fill = if selected { accent } else { node_color(&entity.kind) };
            let stroke = if highlighted || under_pointer {
                Stroke::new(2.5, highlight_color())
            } else {
                Stroke::new(1.0, edge_color)
            };
            painter.circle(*pos, NODE_RADIUS, fill, stroke);

            if self.show_labels {
                painter.text(
                    *pos + Vec2::new(0.0, NODE_RADIUS + 2.0),
                    Align2::CENTER_TOP,
                    entity.label(),
                    FontId::proportional(11.0),
                    text_color,
                );
            }
        }

        track_hover(
            registry,
            &response,
            hovered.clone().map(|id| (SelectionKind::Entity, id)),
        );

        if response.clicked() {
            match hovered {
                Some(ref id) => {
                    let modifiers = ui.input(|i| i.modifiers);
                    apply_click(registry, SelectionKind::Entity, id, source, modifiers);
                }
                None => registry.clear_selection(),
            }
        }

        if let Some(id) = hovered {
            if let Some(entity) = ctx.document.entity(&id) {
                let count = ctx.document.related_entities(&id).len();
                response.on_hover_text(format!("{} ({}), {} related", entity.label(), entity.kind, count));
            }
        }
    }
}

/// Stable colour per entity type
fn node_color(kind: &str) -> Color32 {
    match kind {
        "person" => Color32::from_rgb(110, 160, 230),
        "organization" => Color32::from_rgb(120, 200, 140),
        "vehicle" => Color32::from_rgb(220, 170, 90),
        "account" => Color32::from_rgb(190, 130, 220),
        _ => Color32::from_gray(150),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_layout_stays_inside_rect() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0));
        assert!(circle_layout(0, rect).is_empty());
        assert_eq!(circle_layout(1, rect), vec![rect.center()]);

        let positions = circle_layout(6, rect);
        assert_eq!(positions.len(), 6);
        for pos in &positions {
            assert!(rect.contains(*pos));
        }
        // first node sits at the top
        assert!(positions[0].y < rect.center().y);
    }
}

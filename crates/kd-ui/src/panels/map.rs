use egui::{Align2, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use kd_core::{SelectionKind, SelectionSource};
use kd_data::Location;

use super::{apply_click, shows_highlight, shows_selected, sync_toggles, track_hover, DashboardPanel, PanelContext};
use crate::theme::highlight_color;

const PIN_RADIUS: f32 = 7.0;

/// Latitude/longitude box the map is fitted to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Bounds around all locations with a small margin, or the whole world
    pub fn around(locations: &[&Location]) -> Self {
        let mut bounds = locations.iter().fold(None::<GeoBounds>, |acc, loc| {
            Some(match acc {
                None => GeoBounds {
                    min_lat: loc.latitude,
                    max_lat: loc.latitude,
                    min_lon: loc.longitude,
                    max_lon: loc.longitude,
                },
                Some(b) => GeoBounds {
                    min_lat: b.min_lat.min(loc.latitude),
                    max_lat: b.max_lat.max(loc.latitude),
                    min_lon: b.min_lon.min(loc.longitude),
                    max_lon: b.max_lon.max(loc.longitude),
                },
            })
        })
        .unwrap_or(GeoBounds {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        });

        // keep a single point or a straight line from collapsing the box
        let lat_pad = ((bounds.max_lat - bounds.min_lat) * 0.1).max(1.0);
        let lon_pad = ((bounds.max_lon - bounds.min_lon) * 0.1).max(1.0);
        bounds.min_lat -= lat_pad;
        bounds.max_lat += lat_pad;
        bounds.min_lon -= lon_pad;
        bounds.max_lon += lon_pad;
        bounds
    }
}

/// Equirectangular projection of a coordinate into `rect`, north up
pub fn project(latitude: f64, longitude: f64, bounds: &GeoBounds, rect: Rect) -> Pos2 {
    let x = (longitude - bounds.min_lon) / (bounds.max_lon - bounds.min_lon);
    let y = (bounds.max_lat - latitude) / (bounds.max_lat - bounds.min_lat);
    Pos2::new(
        rect.left() + rect.width() * x as f32,
        rect.top() + rect.height() * y as f32,
    )
}

/// Locations as pins on a plain projected canvas
pub struct MapPanel {
    id: String,
}

impl MapPanel {
    pub fn new() -> Self {
        Self { id: "map".to_string() }
    }
}

impl Default for MapPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardPanel for MapPanel {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> String {
        "Map".to_string()
    }

    fn source(&self) -> SelectionSource {
        SelectionSource::Map
    }

    fn ui(&mut self, ui: &mut Ui, ctx: &PanelContext<'_>) {
        let registry = &ctx.state.selection;
        let source = self.source();

        ui.horizontal(|ui| sync_toggles(ui, registry, &self.id));

        let locations: Vec<&Location> = ctx
            .document
            .locations
            .iter()
            .filter(|location| ctx.passes(SelectionKind::Location, *location))
            .collect();
        let bounds = GeoBounds::around(&locations);

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let rect = response.rect.shrink(PIN_RADIUS * 2.0);

        let visuals = ui.visuals();
        painter.rect_filled(response.rect, 4.0, visuals.extreme_bg_color);
        let grid = Stroke::new(1.0, visuals.widgets.noninteractive.bg_stroke.color.linear_multiply(0.4));
        let accent = visuals.selection.stroke.color;
        let pin_color = visuals.widgets.inactive.fg_stroke.color;
        let text_color = visuals.text_color();

        for step in 1..4 {
            let t = step as f32 / 4.0;
            let x = rect.left() + rect.width() * t;
            let y = rect.top() + rect.height() * t;
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], grid);
        }

        let pointer = response.hover_pos();
        let mut hovered = None;

        for location in &locations {
            let pos = project(location.latitude, location.longitude, &bounds, rect);
            let selected = shows_selected(registry, &self.id, &source, SelectionKind::Location, &location.id);
            let highlighted = shows_highlight(registry, &self.id, SelectionKind::Location, &location.id);
            let under_pointer = pointer.map_or(false, |p| p.distance(pos) <= PIN_RADIUS + 2.0);
            if under_pointer {
                hovered = Some(location.id.clone());
            }

            let stroke = if highlighted || under_pointer {
                Stroke::new(2.0, highlight_color())
            } else {
                Stroke::new(1.0, text_color)
            };
            painter.circle(pos, PIN_RADIUS, if selected { accent } else { pin_color }, stroke);
            painter.text(
                pos + Vec2::new(PIN_RADIUS + 3.0, 0.0),
                Align2::LEFT_CENTER,
                &location.name,
                FontId::proportional(11.0),
                text_color,
            );
        }

        track_hover(registry, &response, hovered.clone().map(|id| (SelectionKind::Location, id)));

        if response.clicked() {
            match &hovered {
                Some(id) => {
                    let modifiers = ui.input(|i| i.modifiers);
                    apply_click(registry, SelectionKind::Location, id, source, modifiers);
                }
                None => registry.clear_selection(),
            }
        }
        if let Some(location) = hovered.as_deref().and_then(|id| ctx.document.location(id)) {
            response.on_hover_text(format!(
                "{}\n{:.4}, {:.4}",
                location.name, location.latitude, location.longitude
            ));
        }
    }
}

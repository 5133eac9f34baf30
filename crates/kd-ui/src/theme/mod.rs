use std::collections::BTreeMap;

use egui::{Color32, Context, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};
use kd_core::settings::ThemePreferences;

/// Colours derived from the theme preferences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub dark: bool,
    pub background: Color32,
    pub panel: Color32,
    pub widget: Color32,
    pub hover: Color32,
    pub active: Color32,
    pub text: Color32,
    pub text_secondary: Color32,
    pub accent: Color32,
    pub border: Color32,
    pub stroke_width: f32,
}

impl Palette {
    pub fn from_preferences(prefs: &ThemePreferences, system_dark: bool) -> Self {
        let dark = prefs.mode.is_dark(system_dark);
        let [r, g, b] = prefs.accent.rgb();
        let accent = Color32::from_rgb(r, g, b);

        let mut palette = if dark {
            Self {
                dark,
                background: Color32::from_rgb(23, 23, 23),
                panel: Color32::from_rgb(31, 31, 31),
                widget: Color32::from_rgb(40, 40, 40),
                hover: Color32::from_rgb(50, 50, 50),
                active: Color32::from_rgb(60, 60, 60),
                text: Color32::from_rgb(220, 220, 220),
                text_secondary: Color32::from_rgb(160, 160, 160),
                accent,
                border: Color32::from_rgb(70, 70, 70),
                stroke_width: 1.0,
            }
        } else {
            Self {
                dark,
                background: Color32::from_rgb(248, 248, 248),
                panel: Color32::from_rgb(240, 240, 240),
                widget: Color32::from_rgb(228, 228, 228),
                hover: Color32::from_rgb(215, 215, 215),
                active: Color32::from_rgb(200, 200, 200),
                text: Color32::from_rgb(30, 30, 30),
                text_secondary: Color32::from_rgb(90, 90, 90),
                accent,
                border: Color32::from_rgb(180, 180, 180),
                stroke_width: 1.0,
            }
        };

        if prefs.high_contrast {
            palette.text = if dark { Color32::WHITE } else { Color32::BLACK };
            palette.text_secondary = palette.text;
            palette.border = palette.text;
            palette.stroke_width = 2.0;
        }

        palette
    }
}

/// Apply the theme preferences to the egui context
pub fn apply_theme(ctx: &Context, prefs: &ThemePreferences, system_dark: bool) {
    let prefs = prefs.clone().normalized();
    let palette = Palette::from_preferences(&prefs, system_dark);

    let mut style = Style::default();
    let mut visuals = if palette.dark { Visuals::dark() } else { Visuals::light() };

    visuals.window_fill = palette.panel;
    visuals.panel_fill = palette.panel;
    visuals.extreme_bg_color = palette.background;
    visuals.faint_bg_color = palette.widget;

    let border = Stroke::new(palette.stroke_width, palette.border);
    let text = Stroke::new(palette.stroke_width, palette.text);

    visuals.widgets.noninteractive.bg_fill = palette.widget;
    visuals.widgets.noninteractive.bg_stroke = border;
    visuals.widgets.noninteractive.fg_stroke = text;
    visuals.widgets.noninteractive.rounding = Rounding::same(4.0);

    visuals.widgets.inactive.bg_fill = palette.widget;
    visuals.widgets.inactive.bg_stroke = border;
    visuals.widgets.inactive.fg_stroke = text;
    visuals.widgets.inactive.rounding = Rounding::same(4.0);

    visuals.widgets.hovered.bg_fill = palette.hover;
    visuals.widgets.hovered.bg_stroke = Stroke::new(palette.stroke_width, palette.accent);
    visuals.widgets.hovered.fg_stroke = text;
    visuals.widgets.hovered.rounding = Rounding::same(4.0);

    visuals.widgets.active.bg_fill = palette.active;
    visuals.widgets.active.bg_stroke = Stroke::new(palette.stroke_width, palette.accent);
    visuals.widgets.active.fg_stroke = text;
    visuals.widgets.active.rounding = Rounding::same(4.0);

    visuals.selection.bg_fill = palette.accent.linear_multiply(0.3);
    visuals.selection.stroke = Stroke::new(palette.stroke_width, palette.accent);
    visuals.hyperlink_color = palette.accent;

    visuals.window_shadow.extrusion = 8.0;
    visuals.popup_shadow.extrusion = 4.0;

    style.spacing.item_spacing = egui::vec2(8.0, 4.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    style.spacing.menu_margin = egui::Margin::same(8.0);
    style.spacing.indent = 20.0;

    if prefs.reduced_motion {
        style.animation_time = 0.0;
    }

    style.text_styles = text_styles(prefs.font_scale);
    style.visuals = visuals;
    ctx.set_style(style);
}

fn text_styles(scale: f32) -> BTreeMap<TextStyle, FontId> {
    let mut font_sizes = BTreeMap::new();
    font_sizes.insert(TextStyle::Small, FontId::new(11.0 * scale, FontFamily::Proportional));
    font_sizes.insert(TextStyle::Body, FontId::new(13.0 * scale, FontFamily::Proportional));
    font_sizes.insert(TextStyle::Button, FontId::new(13.0 * scale, FontFamily::Proportional));
    font_sizes.insert(TextStyle::Heading, FontId::new(18.0 * scale, FontFamily::Proportional));
    font_sizes.insert(TextStyle::Monospace, FontId::new(12.0 * scale, FontFamily::Monospace));
    font_sizes
}

/// Get the error color for the theme
pub fn error_color() -> Color32 {
    Color32::from_rgb(230, 80, 80)
}

/// Get the warning color for the theme
pub fn warning_color() -> Color32 {
    Color32::from_rgb(230, 180, 80)
}

/// Colour of items under the pointer in another panel
pub fn highlight_color() -> Color32 {
    Color32::from_rgb(250, 220, 90)
}

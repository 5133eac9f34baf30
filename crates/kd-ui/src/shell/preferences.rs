use egui::{ComboBox, Context, Slider};
use kd_core::settings::{AccentColor, ExportFormat, ExportPreferences, ThemeMode, ThemePreferences};
use kd_core::AppState;
use tracing::debug;

/// Window editing theme and export settings
///
/// Edits are made on a working copy and written through the typed handles
/// only when a value actually changed.
#[derive(Default)]
pub struct PreferencesWindow {
    open: bool,
}

impl PreferencesWindow {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn show(&mut self, ctx: &Context, state: &AppState) {
        if !self.open {
            return;
        }

        let mut theme = state.theme.load();
        let mut export = state.export.load();
        let original_theme = theme.clone();
        let original_export = export.clone();
        let mut reset = false;

        egui::Window::new("Preferences")
            .open(&mut self.open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.heading("Appearance");
                theme_ui(ui, &mut theme);

                ui.separator();
                ui.heading("Export");
                export_ui(ui, &mut export);

                ui.separator();
                if ui.button("Reset to defaults").clicked() {
                    reset = true;
                }
                if !state.preferences.is_persistent() {
                    ui.weak("Preferences are not saved between sessions.");
                }
            });

        if reset {
            state.theme.reset();
            state.export.reset();
            return;
        }
        if theme != original_theme {
            debug!("Theme preferences changed");
            state.theme.save(&theme.normalized());
        }
        if export != original_export {
            state.export.save(&export);
        }
    }
}

fn theme_ui(ui: &mut egui::Ui, theme: &mut ThemePreferences) {
    egui::Grid::new("theme_grid").num_columns(2).show(ui, |ui| {
        ui.label("Mode");
        ComboBox::from_id_source("theme_mode")
            .selected_text(theme.mode.label())
            .show_ui(ui, |ui| {
                for mode in [ThemeMode::System, ThemeMode::Light, ThemeMode::Dark] {
                    ui.selectable_value(&mut theme.mode, mode, mode.label());
                }
            });
        ui.end_row();

        ui.label("Accent");
        ComboBox::from_id_source("theme_accent")
            .selected_text(theme.accent.label())
            .show_ui(ui, |ui| {
                for accent in AccentColor::ALL {
                    ui.selectable_value(&mut theme.accent, accent, accent.label());
                }
            });
        ui.end_row();

        ui.label("Font size");
        ui.add(
            Slider::new(
                &mut theme.font_scale,
                ThemePreferences::MIN_FONT_SCALE..=ThemePreferences::MAX_FONT_SCALE,
            )
            .step_by(0.05),
        );
        ui.end_row();

        ui.label("Accessibility");
        ui.vertical(|ui| {
            ui.checkbox(&mut theme.high_contrast, "High contrast");
            ui.checkbox(&mut theme.reduced_motion, "Reduce motion");
        });
        ui.end_row();
    });
}

fn export_ui(ui: &mut egui::Ui, export: &mut ExportPreferences) {
    egui::Grid::new("export_grid").num_columns(2).show(ui, |ui| {
        ui.label("Default format");
        ui.horizontal(|ui| {
            ui.radio_value(&mut export.format, ExportFormat::Json, "JSON");
            ui.radio_value(&mut export.format, ExportFormat::Csv, "CSV");
        });
        ui.end_row();

        ui.label("File name prefix");
        ui.text_edit_singleline(&mut export.filename_prefix);
        ui.end_row();

        ui.label("Include");
        ui.vertical(|ui| {
            ui.checkbox(&mut export.include_relationships, "Relationships");
            ui.checkbox(&mut export.include_annotations, "Annotations");
            ui.add_enabled(
                export.format == ExportFormat::Json,
                egui::Checkbox::new(&mut export.pretty, "Pretty-print JSON"),
            );
        });
        ui.end_row();
    });

    ui.weak(format!("Example: {}", export.file_name("dataset")));
}

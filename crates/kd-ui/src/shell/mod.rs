use std::time::{Duration, Instant};

use egui::{Context, RichText, TopBottomPanel};
use kd_core::settings::ExportFormat;
use kd_data::DatasetInfo;

use crate::theme::{error_color, warning_color};

mod preferences;

pub use preferences::PreferencesWindow;

/// How long a banner stays up
const BANNER_TTL: Duration = Duration::from_secs(12);

/// Something the menu bar asked the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    OpenDataset(String),
    ReloadDataset,
    RefreshIndex,
    Export(ExportFormat),
    ExportAnnotations,
    ImportAnnotations,
    ClearSelection,
    FocusSearch,
    ResetLayout,
    OpenPreferences,
    Quit,
}

/// What the menu bar shows
pub struct MenuModel<'a> {
    pub datasets: &'a [DatasetInfo],
    pub current: Option<&'a str>,
    pub loading: bool,
}

/// Render the main menu bar
pub fn menu_bar(ctx: &Context, model: &MenuModel<'_>) -> Option<MenuAction> {
    let mut action = None;

    TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                ui.menu_button("Open Dataset", |ui| {
                    if model.datasets.is_empty() {
                        ui.weak("No datasets available");
                    }
                    for dataset in model.datasets {
                        let current = model.current == Some(dataset.id.as_str());
                        let button = ui
                            .selectable_label(current, dataset.name.as_str())
                            .on_hover_text(dataset.description.as_str());
                        if button.clicked() {
                            action = Some(MenuAction::OpenDataset(dataset.id.clone()));
                            ui.close_menu();
                        }
                    }
                });

                if ui
                    .add_enabled(model.current.is_some(), egui::Button::new("Reload Dataset"))
                    .clicked()
                {
                    action = Some(MenuAction::ReloadDataset);
                    ui.close_menu();
                }
                if ui.button("Refresh Dataset List").clicked() {
                    action = Some(MenuAction::RefreshIndex);
                    ui.close_menu();
                }

                ui.separator();

                ui.add_enabled_ui(model.current.is_some(), |ui| {
                    if ui.button("Export View as JSON...").clicked() {
                        action = Some(MenuAction::Export(ExportFormat::Json));
                        ui.close_menu();
                    }
                    if ui.button("Export View as CSV...").clicked() {
                        action = Some(MenuAction::Export(ExportFormat::Csv));
                        ui.close_menu();
                    }
                });
                if ui.button("Export Annotations...").clicked() {
                    action = Some(MenuAction::ExportAnnotations);
                    ui.close_menu();
                }
                if ui.button("Import Annotations...").clicked() {
                    action = Some(MenuAction::ImportAnnotations);
                    ui.close_menu();
                }

                ui.separator();

                if ui.button("Exit").clicked() {
                    action = Some(MenuAction::Quit);
                    ui.close_menu();
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui.button("Clear Selection (Esc)").clicked() {
                    action = Some(MenuAction::ClearSelection);
                    ui.close_menu();
                }
                if ui.button("Search (Ctrl+F)").clicked() {
                    action = Some(MenuAction::FocusSearch);
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset Layout").clicked() {
                    action = Some(MenuAction::ResetLayout);
                    ui.close_menu();
                }
                if ui.button("Preferences...").clicked() {
                    action = Some(MenuAction::OpenPreferences);
                    ui.close_menu();
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if model.loading {
                    ui.spinner();
                }
                if let Some(current) = model.current {
                    ui.label(format!("Dataset: {}", current));
                }
            });
        });
    });

    action
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Message shown in the banner
pub struct BannerMessage {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: Instant,
}

/// Stack of dismissable messages shown above the workspace
#[derive(Default)]
pub struct ErrorBanner {
    messages: Vec<BannerMessage>,
}

impl ErrorBanner {
    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, title.into(), message.into());
    }

    pub fn warning(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, title.into(), message.into());
    }

    fn push(&mut self, severity: Severity, title: String, message: String) {
        // the same failure repeating every frame should show once
        if let Some(existing) = self
            .messages
            .iter_mut()
            .find(|m| m.title == title && m.message == message)
        {
            existing.timestamp = Instant::now();
            return;
        }
        self.messages.push(BannerMessage {
            severity,
            title,
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop messages older than the banner lifetime
    pub fn expire(&mut self, now: Instant) {
        self.messages
            .retain(|msg| now.saturating_duration_since(msg.timestamp) < BANNER_TTL);
    }

    pub fn show(&mut self, ctx: &Context) {
        self.expire(Instant::now());
        if self.messages.is_empty() {
            return;
        }

        let mut dismissed = None;
        TopBottomPanel::top("error_banner").show(ctx, |ui| {
            for (index, msg) in self.messages.iter().enumerate() {
                let color = match msg.severity {
                    Severity::Warning => warning_color(),
                    Severity::Error => error_color(),
                };
                egui::Frame::none()
                    .fill(color.linear_multiply(0.2))
                    .stroke(egui::Stroke::new(1.0, color))
                    .rounding(4.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("⚠").color(color));
                            ui.label(RichText::new(msg.title.as_str()).strong());
                            ui.separator();
                            ui.label(msg.message.as_str());
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui.small_button("✖").clicked() {
                                    dismissed = Some(index);
                                }
                            });
                        });
                    });
            }
        });

        if let Some(index) = dismissed {
            self.messages.remove(index);
        }
    }
}

/// Bottom status line
pub fn status_bar(ctx: &Context, source: &str, selected: usize, annotations: usize, activity: Option<&str>) {
    TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.weak(format!("Source: {}", source));
            ui.separator();
            ui.weak(format!("{} selected", selected));
            ui.separator();
            ui.weak(format!("{} annotation(s)", annotations));
            if let Some(activity) = activity {
                ui.separator();
                ui.weak(activity);
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_dedupes_and_expires() {
        let mut banner = ErrorBanner::default();
        banner.error("Load failed", "ops: not found");
        banner.error("Load failed", "ops: not found");
        banner.warning("Preferences", "storage unavailable");
        assert_eq!(banner.len(), 2);

        banner.expire(Instant::now() + BANNER_TTL + Duration::from_secs(1));
        assert!(banner.is_empty());
    }
}

//! The eframe application

use std::path::Path;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context};
use kd_core::annotations::{AnnotationEvent, ImportMode};
use kd_core::events::events::AnnotationChanged;
use kd_core::settings::{ExportFormat, ThemePreferences};
use kd_core::AppState;
use kd_data::{export_view, DatasetInfo, DatasetLoader, ExportRequest};
use kd_ui::{menu_bar, status_bar, ErrorBanner, MenuAction, MenuModel, PreferencesWindow, Shortcuts, Workspace};
use tracing::{error, info, warn};

use crate::activity::ActivityFeed;
use crate::config::AppConfig;
use crate::datasets::{annotations_for_export, load_dataset, refresh_index, SharedSlot};

/// Main application state
pub struct KindiApp {
    config: AppConfig,

    /// Shared with every panel
    state: AppState,

    loader: DatasetLoader,

    /// Filled by background fetches
    slot: SharedSlot,

    /// Bus events waiting for the frame loop
    activity: ActivityFeed,

    workspace: Workspace,

    banner: ErrorBanner,

    preferences_window: PreferencesWindow,

    /// Theme and system mode the current style was built from
    applied_theme: Option<(ThemePreferences, bool)>,

    /// Dataset the selection belongs to
    shown_dataset: Option<String>,

    runtime: tokio::runtime::Runtime,

    egui_ctx: Context,
}

impl KindiApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        state: AppState,
        loader: DatasetLoader,
        runtime: tokio::runtime::Runtime,
    ) -> Self {
        let workspace = Workspace::new(&state);
        let activity = ActivityFeed::attach(&state.event_bus, loader.source_name());
        let app = Self {
            config,
            state,
            loader,
            slot: SharedSlot::default(),
            activity,
            workspace,
            banner: ErrorBanner::default(),
            preferences_window: PreferencesWindow::default(),
            applied_theme: None,
            shown_dataset: None,
            runtime,
            egui_ctx: cc.egui_ctx.clone(),
        };
        app.refresh_index(true);
        app
    }

    /// Fetch the dataset index, optionally opening the first dataset
    fn refresh_index(&self, open_first: bool) {
        let loader = self.loader.clone();
        let slot = self.slot.clone();
        let bus = self.state.event_bus.clone();
        let ctx = self.egui_ctx.clone();

        slot.write().pending += 1;
        self.runtime.spawn(async move {
            let first = refresh_index(&loader, &slot, &bus).await;
            let nothing_open = slot.read().current.is_none();
            if let (true, true, Some(first)) = (open_first, nothing_open, first) {
                load_dataset(&loader, &slot, &bus, first, false).await;
            }
            slot.write().pending -= 1;
            ctx.request_repaint();
        });
    }

    fn open_dataset(&self, dataset: DatasetInfo, force_reload: bool) {
        info!(dataset = %dataset.id, force_reload, "Opening dataset");
        let loader = self.loader.clone();
        let slot = self.slot.clone();
        let bus = self.state.event_bus.clone();
        let ctx = self.egui_ctx.clone();

        slot.write().pending += 1;
        self.runtime.spawn(async move {
            load_dataset(&loader, &slot, &bus, dataset, force_reload).await;
            slot.write().pending -= 1;
            ctx.request_repaint();
        });
    }

    fn handle_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::OpenDataset(id) => {
                let dataset = self.slot.read().find(&id);
                match dataset {
                    Some(dataset) => self.open_dataset(dataset, false),
                    None => warn!(dataset = %id, "Dataset is not in the index"),
                }
            }
            MenuAction::ReloadDataset => {
                let current = self.slot.read().current.as_ref().map(|c| c.info.clone());
                if let Some(dataset) = current {
                    self.open_dataset(dataset, true);
                }
            }
            MenuAction::RefreshIndex => self.refresh_index(false),
            MenuAction::Export(format) => {
                if let Err(err) = self.export(format) {
                    error!("Export failed: {:#}", err);
                    self.banner.error("Export failed", format!("{:#}", err));
                }
            }
            MenuAction::ExportAnnotations => {
                if let Err(err) = self.export_annotations() {
                    error!("Annotation export failed: {:#}", err);
                    self.banner.error("Annotation export failed", format!("{:#}", err));
                }
            }
            MenuAction::ImportAnnotations => {
                if let Err(err) = self.import_annotations() {
                    error!("Annotation import failed: {:#}", err);
                    self.banner.error("Annotation import failed", format!("{:#}", err));
                }
            }
            MenuAction::ClearSelection => self.state.selection.clear_selection(),
            MenuAction::FocusSearch => self.workspace.focus_search(),
            MenuAction::ResetLayout => self.workspace.reset_layout(),
            MenuAction::OpenPreferences => self.preferences_window.open(),
            MenuAction::Quit => self.egui_ctx.send_viewport_cmd(egui::ViewportCommand::Close),
        }
    }

    /// Write the current dataset, or its selected part, to a file
    fn export(&self, format: ExportFormat) -> Result<()> {
        let Some(current) = self.slot.read().current.clone() else {
            return Ok(());
        };
        let mut prefs = self.state.export.load();
        prefs.format = format;

        let snapshot = self.state.selection.snapshot();
        let selection = snapshot.has_selection().then_some(&snapshot);
        let service = self.state.annotations.read();
        let request = ExportRequest {
            dataset_id: &current.info.id,
            document: &current.document,
            selection,
            annotations: annotations_for_export(&service, &current.document, selection),
        };
        let output = export_view(&request, &prefs)?;
        drop(service);

        let Some(path) = rfd::FileDialog::new()
            .set_file_name(output.file_name.as_str())
            .add_filter(format.extension(), &[format.extension()])
            .save_file()
        else {
            return Ok(());
        };
        write_file(&path, &output.contents)?;
        info!("Exported {} to {}", current.info.id, path.display());
        Ok(())
    }

    fn export_annotations(&self) -> Result<()> {
        let json = self.state.annotations.read().export_json()?;
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("kindi-annotations.json")
            .add_filter("json", &["json"])
            .save_file()
        else {
            return Ok(());
        };
        write_file(&path, &json)
    }

    fn import_annotations(&self) -> Result<()> {
        let Some(path) = rfd::FileDialog::new().add_filter("json", &["json"]).pick_file() else {
            return Ok(());
        };
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let count = self.state.annotations.write().import_json(&json, ImportMode::Merge)?;
        info!("Imported {} annotations from {}", count, path.display());
        self.state.event_bus.publish(AnnotationChanged {
            change: AnnotationEvent::Imported(count),
        });
        Ok(())
    }

    /// Rebuild the style when the theme or the system mode changed
    fn sync_theme(&mut self, ctx: &Context, frame: &eframe::Frame) {
        let system_dark = frame
            .info()
            .system_theme
            .map_or(true, |theme| theme == eframe::Theme::Dark);
        let theme = self.state.theme.load();
        let current = Some((theme.clone(), system_dark));
        if self.applied_theme != current {
            kd_ui::apply_theme(ctx, &theme, system_dark);
            self.applied_theme = current;
        }
    }

    /// Move published failures and preference issues into the banner
    fn collect_failures(&mut self) {
        for (title, message) in self.activity.take_failures() {
            self.banner.error(title, message);
        }
        for issue in self.state.preferences.take_issues() {
            self.banner.warning("Preferences", issue.to_string());
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

impl eframe::App for KindiApp {
    fn update(&mut self, ctx: &Context, frame: &mut eframe::Frame) {
        self.sync_theme(ctx, frame);
        self.collect_failures();

        let (datasets, current, loading) = {
            let slot = self.slot.read();
            (slot.datasets.clone(), slot.current.clone(), slot.is_loading())
        };

        // a new dataset invalidates ids selected in the old one
        let current_id = current.as_ref().map(|c| c.info.id.clone());
        if current_id != self.shown_dataset {
            self.state.selection.clear_selection();
            self.state.selection.set_highlight(None);
            self.shown_dataset = current_id;
        }

        let mut actions = Vec::new();

        let shortcuts = Shortcuts::read(ctx);
        if shortcuts.clear_selection {
            actions.push(MenuAction::ClearSelection);
        }
        if shortcuts.focus_search {
            actions.push(MenuAction::FocusSearch);
        }

        let model = MenuModel {
            datasets: &datasets,
            current: current.as_ref().map(|c| c.info.id.as_str()),
            loading,
        };
        actions.extend(menu_bar(ctx, &model));

        self.banner.show(ctx);

        status_bar(
            ctx,
            self.loader.source_name(),
            self.state.selection.snapshot().len(),
            self.state.annotations.read().len(),
            self.activity.status().as_deref(),
        );

        egui::CentralPanel::default().show(ctx, |ui| {
            let document = current.as_ref().map(|c| c.document.as_ref());
            self.workspace.ui(ui, &self.state, document, &self.config.author);
        });

        self.preferences_window.show(ctx, &self.state);

        for action in actions {
            self.handle_action(action);
        }
    }
}

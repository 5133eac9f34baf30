//! Kindi dashboard entry point

use anyhow::Result;
use eframe::egui;
use kd_core::AppState;
use kd_data::{DatasetCache, DatasetLoader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod activity;
mod app;
mod config;
mod datasets;

use app::KindiApp;
use config::AppConfig;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    info!(
        data_url = %config.data_url,
        data_dir = ?config.data_dir,
        "Starting Kindi dashboard"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let loader = DatasetLoader::new(config.dataset_source()?, DatasetCache::new(config.cache_size));
    let state = AppState::new(config.preference_storage());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0]),
        follow_system_theme: true,
        ..Default::default()
    };

    eframe::run_native(
        "Kindi",
        options,
        Box::new(move |cc| Box::new(KindiApp::new(cc, config, state, loader, runtime))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))?;

    Ok(())
}

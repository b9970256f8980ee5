use eframe::egui;
use log::info;

mod app;
mod config;
mod download;
mod error;
mod history;
mod models;
mod orchestrator;
mod shell;
mod theme;
mod ui;

use app::YtdlApp;
use config::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    info!("History file: {}", config.history_path.display());
    info!("Default download directory: {}", config.download_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 460.0])
            .with_min_inner_size([560.0, 420.0])
            .with_resizable(true)
            .with_title("YouTube Video Downloader"),
        ..Default::default()
    };

    let app = YtdlApp::new(&config);

    eframe::run_native(
        "YouTube Video Downloader",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the window: {e}"))
}

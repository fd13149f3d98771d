mod app;
mod config;
mod progress;
mod stream;
mod students;
mod upload;
mod utils;

use app::CsvUploaderApp;
use config::AppConfig;
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let app = CsvUploaderApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 820.0])
            .with_min_inner_size([520.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CSV Uploader",
        options,
        Box::new(move |_cc| Box::new(app)),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start UI: {}", e))
}

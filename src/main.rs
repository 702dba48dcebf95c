mod app;
use study_tracker::*;

use app::MyApp;
use chrono::Utc;
use config::{AppConfig, DEFAULT_CONFIG_FILE};
use database::db::{init_database, seed_sample_cards};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    let config = AppConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
        .expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let conn = init_database(&config.database_path, Utc::now())
        .expect("Failed to initialize database");

    let today = database::db::get_current_date(&conn).expect("Failed to read current date");
    match seed_sample_cards(config.user_id, today, &conn) {
        Ok(0) => {}
        Ok(created) => info!(created, "sample cards created"),
        Err(e) => warn!("could not check for existing cards, skipping samples: {e}"),
    }

    info!(
        user_id = config.user_id,
        database = %config.database_path.display(),
        "starting study tracker"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height]),
        ..Default::default()
    };
    eframe::run_native(
        "Study Tracker",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(conn, config.user_id)))),
    )
}

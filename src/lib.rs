pub mod dashboard;
pub mod data;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::dashboard::{Dashboard, DashboardReport};
use crate::data::ConfiguredStore;
use crate::errors::AppError;
use crate::models::config::DashboardConfig;

/// Load configuration, take one live-data snapshot, print the JSON report to
/// stdout and export files when `export_dir` is set.
///
/// Unavailable live data is part of the report, not an error.
pub async fn run(config_path: Option<&Path>) -> Result<(), AppError> {
    // Initialize tracing; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting BNPL Microscope");

    let config = DashboardConfig::load(config_path)?;
    let store = ConfiguredStore::from_config(&config)?;
    let dashboard = Dashboard::new(config, store);
    info!(
        "Tracking {} since {} (cache TTL {:?})",
        dashboard.config().symbol_set(),
        dashboard.config().start_date,
        dashboard.cache().ttl()
    );

    let live = dashboard.live_data().await;
    if let Some(msg) = live.unavailable_message() {
        warn!("{}", msg);
    }
    let report = DashboardReport::build(dashboard.config(), &live, dashboard.static_data());

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(dir) = &dashboard.config().export_dir {
        utils::export::export_all(&report, &live, dir)?;
    }
    Ok(())
}

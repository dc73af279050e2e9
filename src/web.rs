#![cfg(not(tarpaulin_include))]

use nexus_vitals::{MonitorConfig, app};

/// Main entry point for the vitals web host
///
/// Reads the configuration from the environment, starts the monitor and
/// serves its view and controls over HTTP.
///
/// # Environment
/// * `RUST_LOG` - Log filter, `info` when unset
/// * `VITALS_*`, `NEXUS_API_BASE` - See [`MonitorConfig::load`]
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MonitorConfig::load();
    app::run(config).await
}

//! Replays a recorded page session through the extraction controller and
//! prints the resulting state as JSON.
//!
//! Usage: `extract_replay [config.ron]` (defaults to `./replay.ron`).
mod config;
mod logging;
mod replay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use extract_logging::extract_info;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG));
    let config = config::load_config(&config_path)?;
    logging::initialize(config.log, config.log_level());
    extract_info!("Replaying {:?}", config.recording);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let report = runtime.block_on(replay::run(&config))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

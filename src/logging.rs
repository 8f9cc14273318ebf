//! Logging setup
//!
//! Installs a global `tracing` subscriber from [`LogConfig`]. `RUST_LOG`
//! takes precedence over the configured level when set.

use crate::config::LogConfig;
use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Map a level name to a tracing level, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init(config: &LogConfig) -> Result<()> {
    let level = parse_level(&config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    if config.json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

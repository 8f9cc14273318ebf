//! Configuration module for Tunsplice
//!
//! This module provides configuration types and parsing for the UDP relay.

mod socks5;
mod tunnel;

pub use socks5::Socks5Config;
pub use tunnel::{Config, LogConfig, UdpConfig, UDP_BUF_SIZE, UDP_POOL_SIZE};

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

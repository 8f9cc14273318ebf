//! Relay configuration types
//!
//! Defines the root configuration and the UDP session tunables.

use super::Socks5Config;
use crate::error::TunnelError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum number of queued frames per UDP session
pub const UDP_POOL_SIZE: usize = 512;

/// Receive buffer size for datagrams coming back from the proxy
pub const UDP_BUF_SIZE: usize = 1500;

/// Default pool size
fn default_pool_size() -> usize {
    UDP_POOL_SIZE
}

/// Default buffer size
fn default_buf_size() -> usize {
    UDP_BUF_SIZE
}

/// Default read/write timeout in milliseconds
fn default_read_write_timeout() -> u64 {
    60_000
}

/// Default log level
fn default_log_level() -> String {
    "warn".to_string()
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// SOCKS5 proxy configuration
    pub socks5: Socks5Config,

    /// UDP session configuration
    #[serde(default)]
    pub udp: UdpConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> Result<(), TunnelError> {
        self.socks5.validate().map_err(TunnelError::Config)?;
        self.udp.validate().map_err(TunnelError::Config)?;
        Ok(())
    }
}

/// UDP session configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UdpConfig {
    /// Frames queued per session before new datagrams are dropped
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Bytes received from the proxy per datagram
    #[serde(default = "default_buf_size")]
    pub buf_size: usize,

    /// Idle limit in milliseconds while waiting for traffic, 0 disables it
    #[serde(default = "default_read_write_timeout")]
    pub read_write_timeout: u64,
}

impl Default for UdpConfig {
    fn default() -> Self {
        UdpConfig {
            pool_size: default_pool_size(),
            buf_size: default_buf_size(),
            read_write_timeout: default_read_write_timeout(),
        }
    }
}

impl UdpConfig {
    /// Idle timeout as a duration, `None` when disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.read_write_timeout {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("udp.pool_size must be positive".to_string());
        }
        if self.buf_size == 0 || self.buf_size > u16::MAX as usize {
            return Err(format!(
                "udp.buf_size must be between 1 and {}",
                u16::MAX
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of plain text
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

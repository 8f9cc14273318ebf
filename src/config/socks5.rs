//! SOCKS5 proxy configuration
//!
//! Where the UDP relay of an established association lives and how the
//! local relay socket is bound.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Default local bind address for relay sockets
fn default_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
}

/// SOCKS5 proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Socks5Config {
    /// UDP relay address announced by the proxy (BND.ADDR:BND.PORT)
    pub udp_relay: SocketAddr,

    /// Local address each session's relay socket binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// SO_RCVBUF for relay sockets, kernel default when unset
    #[serde(default)]
    pub recv_buffer_size: Option<usize>,
}

impl Socks5Config {
    /// Create a configuration for the given relay address
    pub fn new(udp_relay: SocketAddr) -> Self {
        let bind_addr = match udp_relay {
            SocketAddr::V4(_) => default_bind_addr(),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };

        Socks5Config {
            udp_relay,
            bind_addr,
            recv_buffer_size: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.udp_relay.port() == 0 {
            return Err("socks5.udp_relay must have a non-zero port".to_string());
        }
        if self.udp_relay.is_ipv4() != self.bind_addr.is_ipv4() {
            return Err("socks5.bind_addr and socks5.udp_relay use different address families".to_string());
        }
        if self.recv_buffer_size == Some(0) {
            return Err("socks5.recv_buffer_size must be positive".to_string());
        }
        Ok(())
    }
}

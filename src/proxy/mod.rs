//! Proxy-side UDP client
//!
//! A session talks to the SOCKS5 proxy only through [`ProxyUdpClient`].
//! Each session gets a fresh client from a [`ProxyConnector`].

mod client;

pub use client::{Socks5Connector, Socks5UdpClient};

use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::io;

/// Send/receive contract of a SOCKS5 UDP-associate client
#[async_trait]
pub trait ProxyUdpClient: Send + Sync + 'static {
    /// Send `payload` to `addr` through the proxy
    ///
    /// Returns the number of payload bytes sent.
    async fn send_to(&self, payload: &[u8], addr: &TargetAddr) -> io::Result<usize>;

    /// Check without blocking whether a datagram is waiting
    ///
    /// `Ok(false)` means would-block.
    fn try_peek(&self) -> io::Result<bool>;

    /// Receive one datagram's payload into `buf`
    ///
    /// Returns the payload length (truncated to `buf.len()`) and the address
    /// the proxy reports it came from. `WouldBlock` means the datagram was
    /// consumed but carried nothing deliverable.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, TargetAddr)>;

    /// Wait until the client may have data to receive
    async fn readable(&self) -> io::Result<()>;
}

/// Factory for per-session proxy clients
pub trait ProxyConnector: Send + Sync + 'static {
    /// Client type produced by this connector
    type Client: ProxyUdpClient;

    /// Create a fresh client for one UDP session
    fn new_client(&self) -> io::Result<Self::Client>;
}

//! SOCKS5 UDP relay client
//!
//! Wraps and unwraps datagrams in the SOCKS5 UDP header and exchanges them
//! with the proxy's UDP relay over a connected socket.

use super::{ProxyConnector, ProxyUdpClient};
use crate::config::Socks5Config;
use crate::socks::{encode_udp_packet, parse_udp_packet, TargetAddr, SOCKS5_UDP_HEADER_MAX_LEN};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// UDP client bound to one proxy relay address
#[derive(Debug)]
pub struct Socks5UdpClient {
    /// Socket connected to the relay
    socket: UdpSocket,
    /// Relay address
    relay: SocketAddr,
}

impl Socks5UdpClient {
    /// Bind a local socket and connect it to the configured relay
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: &Socks5Config) -> io::Result<Self> {
        let socket = Socket::new(
            Domain::for_address(config.bind_addr),
            Type::DGRAM,
            Some(Protocol::UDP),
        )?;

        if let Some(size) = config.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&config.bind_addr.into())?;
        socket.connect(&config.udp_relay.into())?;

        let socket = UdpSocket::from_std(socket.into())?;

        debug!(
            "SOCKS5 UDP client {} -> relay {}",
            socket.local_addr()?,
            config.udp_relay
        );

        Ok(Socks5UdpClient {
            socket,
            relay: config.udp_relay,
        })
    }

    /// Local address of the relay socket
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Relay address this client talks to
    pub fn relay_addr(&self) -> SocketAddr {
        self.relay
    }
}

#[async_trait]
impl ProxyUdpClient for Socks5UdpClient {
    async fn send_to(&self, payload: &[u8], addr: &TargetAddr) -> io::Result<usize> {
        let datagram = encode_udp_packet(addr, payload);
        let sent = self.socket.send(&datagram).await?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send to relay: {} of {} bytes", sent, datagram.len()),
            ));
        }

        trace!("relay send {} bytes for {}", payload.len(), addr);
        Ok(payload.len())
    }

    fn try_peek(&self) -> io::Result<bool> {
        let mut peek_buf = [0u8; 1];
        match self.socket.try_peek_from(&mut peek_buf) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, TargetAddr)> {
        let mut datagram = vec![0u8; SOCKS5_UDP_HEADER_MAX_LEN + buf.len()];
        let n = self.socket.recv(&mut datagram).await?;

        let packet = parse_udp_packet(&datagram[..n])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        if packet.is_fragmented() {
            debug!("Dropping fragmented datagram (frag={}) from relay", packet.frag);
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let len = packet.data.len().min(buf.len());
        buf[..len].copy_from_slice(&packet.data[..len]);

        trace!("relay recv {} bytes from {}", len, packet.addr);
        Ok((len, packet.addr))
    }

    async fn readable(&self) -> io::Result<()> {
        self.socket.readable().await
    }
}

/// Creates one [`Socks5UdpClient`] per session
#[derive(Debug, Clone)]
pub struct Socks5Connector {
    config: Socks5Config,
}

impl Socks5Connector {
    /// Create a connector for the given proxy configuration
    pub fn new(config: Socks5Config) -> Self {
        Socks5Connector { config }
    }
}

impl ProxyConnector for Socks5Connector {
    type Client = Socks5UdpClient;

    fn new_client(&self) -> io::Result<Self::Client> {
        Socks5UdpClient::bind(&self.config)
    }
}

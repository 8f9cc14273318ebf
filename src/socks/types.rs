//! SOCKS5 address type
//!
//! The `ATYP | ADDR | PORT` triple that prefixes every UDP-associate payload.

use super::consts::*;
use anyhow::{bail, Context, Result};
use bytes::{Buf, BufMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Address carried in a SOCKS5 UDP datagram header
///
/// Datagrams built by this crate only ever carry `Ip`. `Domain` can still
/// show up in replies from a proxy and is rejected by the address
/// translator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetAddr {
    /// IPv4 or IPv6 socket address
    Ip(SocketAddr),
    /// Domain name and port
    Domain(String, u16),
}

impl TargetAddr {
    /// IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        SocketAddr::from((ip, port)).into()
    }

    /// IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        SocketAddr::from((ip, port)).into()
    }

    /// Domain name and port
    pub fn domain(domain: String, port: u16) -> Self {
        TargetAddr::Domain(domain, port)
    }

    /// Port number
    pub fn port(&self) -> u16 {
        match *self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => port,
        }
    }

    /// ATYP byte announcing this address on the wire
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(..) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Bytes taken by [`TargetAddr::write_to`]
    pub fn encoded_len(&self) -> usize {
        let addr_len = match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => 4,
            TargetAddr::Ip(SocketAddr::V6(_)) => 16,
            TargetAddr::Domain(domain, _) => 1 + domain.len().min(MAX_DOMAIN_LEN),
        };
        1 + addr_len + 2
    }

    /// Append `ATYP | ADDR | PORT`, port in network byte order
    ///
    /// Domains longer than 255 bytes are cut to fit the length byte.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.addr_type());
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => buf.put_slice(&addr.ip().octets()),
            TargetAddr::Ip(SocketAddr::V6(addr)) => buf.put_slice(&addr.ip().octets()),
            TargetAddr::Domain(domain, _) => {
                let name = &domain.as_bytes()[..domain.len().min(MAX_DOMAIN_LEN)];
                buf.put_u8(name.len() as u8);
                buf.put_slice(name);
            }
        }
        buf.put_u16(self.port());
    }

    /// Read `ATYP | ADDR | PORT` from the front of `buf`, advancing it
    pub fn read_from(buf: &mut &[u8]) -> Result<Self> {
        if !buf.has_remaining() {
            bail!("missing address type");
        }

        let atyp = buf.get_u8();
        let addr = match atyp {
            SOCKS5_ADDR_TYPE_IPV4 => {
                ensure_len(buf, 4 + 2, "IPv4 address")?;
                let mut octets = [0u8; 4];
                buf.copy_to_slice(&mut octets);
                TargetAddr::ipv4(octets.into(), buf.get_u16())
            }
            SOCKS5_ADDR_TYPE_IPV6 => {
                ensure_len(buf, 16 + 2, "IPv6 address")?;
                let mut octets = [0u8; 16];
                buf.copy_to_slice(&mut octets);
                TargetAddr::ipv6(octets.into(), buf.get_u16())
            }
            SOCKS5_ADDR_TYPE_DOMAIN => {
                ensure_len(buf, 1, "domain length")?;
                let len = buf.get_u8() as usize;
                ensure_len(buf, len + 2, "domain name")?;
                let domain = std::str::from_utf8(&buf[..len])
                    .context("domain is not valid UTF-8")?
                    .to_string();
                buf.advance(len);
                TargetAddr::Domain(domain, buf.get_u16())
            }
            other => bail!("unknown address type {:#04x}", other),
        };

        Ok(addr)
    }
}

fn ensure_len(buf: &[u8], need: usize, what: &str) -> Result<()> {
    if buf.len() < need {
        bail!("truncated {}: need {} bytes, have {}", what, need, buf.len());
    }
    Ok(())
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl Default for TargetAddr {
    fn default() -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }
}

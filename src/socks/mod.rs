//! SOCKS5 module for Tunsplice
//!
//! Address types and the UDP-associate datagram format spoken with the
//! proxy's UDP relay. The TCP control connection that creates the
//! association is handled elsewhere.

mod consts;
mod types;
pub mod udp;

pub use consts::*;
pub use types::TargetAddr;
pub use udp::{encode_udp_packet, parse_udp_packet, UdpPacket};

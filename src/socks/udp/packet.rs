//! SOCKS5 UDP-associate datagram codec
//!
//! Every datagram exchanged with the relay is prefixed by
//!
//! ```text
//! +-----+------+------+----------+----------+---------+
//! | RSV | FRAG | ATYP | DST.ADDR | DST.PORT | PAYLOAD |
//! +-----+------+------+----------+----------+---------+
//! |  2  |  1   |  1   | variable |    2     | rest    |
//! +-----+------+------+----------+----------+---------+
//! ```
//!
//! Outbound the address is the destination, inbound it is the source of the
//! reply.

use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use anyhow::{bail, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Decoded view of a datagram received from the relay
///
/// Borrows the payload from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket<'a> {
    /// Fragment number, 0 for a standalone datagram
    pub frag: u8,
    /// Address from the header
    pub addr: TargetAddr,
    /// Everything after the header
    pub data: &'a [u8],
}

impl UdpPacket<'_> {
    /// Whether the datagram is part of a fragment sequence
    pub fn is_fragmented(&self) -> bool {
        self.frag != SOCKS5_UDP_FRAG_NONE
    }
}

/// Decode a datagram received from the relay
pub fn parse_udp_packet(datagram: &[u8]) -> Result<UdpPacket<'_>> {
    if datagram.len() < SOCKS5_UDP_HEADER_FIXED_LEN {
        bail!("datagram of {} bytes is shorter than the header", datagram.len());
    }

    let mut cursor = datagram;
    let rsv = cursor.get_u16();
    if rsv != SOCKS5_UDP_RSV {
        bail!("reserved field is {:#06x}, expected 0", rsv);
    }
    let frag = cursor.get_u8();
    let addr = TargetAddr::read_from(&mut cursor)?;

    Ok(UdpPacket {
        frag,
        addr,
        data: cursor,
    })
}

/// Build a standalone datagram carrying `payload` for `addr`
pub fn encode_udp_packet(addr: &TargetAddr, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(3 + addr.encoded_len() + payload.len());
    buf.put_u16(SOCKS5_UDP_RSV);
    buf.put_u8(SOCKS5_UDP_FRAG_NONE);
    addr.write_to(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

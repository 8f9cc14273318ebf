//! SOCKS5 UDP datagram encapsulation

mod packet;

pub use packet::{encode_udp_packet, parse_udp_packet, UdpPacket};

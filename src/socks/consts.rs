//! SOCKS5 protocol constants
//!
//! Only the constants needed by the UDP-associate datagram format.

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved field
/// Reserved 16-bit field at the start of every UDP datagram (always 0)
pub const SOCKS5_UDP_RSV: u16 = 0x0000;
/// Fragment number of a standalone datagram
pub const SOCKS5_UDP_FRAG_NONE: u8 = 0x00;

// Header sizes
/// RSV + FRAG + ATYP
pub const SOCKS5_UDP_HEADER_FIXED_LEN: usize = 4;
/// Largest header: fixed part + length byte + 255-byte domain + port
pub const SOCKS5_UDP_HEADER_MAX_LEN: usize = SOCKS5_UDP_HEADER_FIXED_LEN + 1 + MAX_DOMAIN_LEN + 2;

/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;

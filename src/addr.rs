//! Address translation between the virtual stack and the proxy side
//!
//! The virtual stack speaks [`StackAddr`] plus a separate port, the proxy
//! client speaks [`TargetAddr`]. Raw octets are copied, and reply sources
//! are fitted to the endpoint's family. Nothing is resolved.

use crate::error::SessionError;
use crate::socks::TargetAddr;
use crate::stack::StackAddr;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

/// Convert a native stack address and port into a generic address
pub fn to_target(ip: &StackAddr, port: u16) -> TargetAddr {
    match ip {
        StackAddr::V4(octets) => TargetAddr::ipv4(Ipv4Addr::from(*octets), port),
        StackAddr::V6(octets) => TargetAddr::ipv6(Ipv6Addr::from(*octets), port),
    }
}

/// Convert a generic address back into the native stack representation
///
/// Fails with [`SessionError::UnsupportedFamily`] for anything that is not
/// an IPv4 or IPv6 socket address.
pub fn from_target(addr: &TargetAddr) -> Result<(StackAddr, u16), SessionError> {
    match addr {
        TargetAddr::Ip(SocketAddr::V4(v4)) => Ok((StackAddr::V4(v4.ip().octets()), v4.port())),
        TargetAddr::Ip(SocketAddr::V6(v6)) => Ok((StackAddr::V6(v6.ip().octets()), v6.port())),
        TargetAddr::Domain(domain, port) => Err(SessionError::UnsupportedFamily(format!(
            "domain {}:{}",
            domain, port
        ))),
    }
}

/// Convert a generic address into the address family of `endpoint`
///
/// The stack only injects datagrams whose source matches the endpoint's
/// family. IPv4 becomes `::ffff:a.b.c.d` for an IPv6 endpoint, and a
/// V4-mapped IPv6 address becomes plain IPv4 for an IPv4 endpoint. Any other
/// IPv6 address cannot reach an IPv4 endpoint.
pub fn from_target_for(
    addr: &TargetAddr,
    endpoint: &StackAddr,
) -> Result<(StackAddr, u16), SessionError> {
    let (ip, port) = from_target(addr)?;

    let ip = match (endpoint, ip) {
        (StackAddr::V4(_), StackAddr::V6(octets)) => {
            let v4 = Ipv6Addr::from(octets).to_ipv4_mapped().ok_or_else(|| {
                SessionError::UnsupportedFamily(format!("{} for an IPv4 endpoint", addr))
            })?;
            StackAddr::V4(v4.octets())
        }
        (StackAddr::V6(_), StackAddr::V4(octets)) => {
            StackAddr::V6(Ipv4Addr::from(octets).to_ipv6_mapped().octets())
        }
        (_, ip) => ip,
    };

    Ok((ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_round_trip() {
        let ip = StackAddr::V4([198, 51, 100, 7]);
        let target = to_target(&ip, 5353);

        assert_eq!(format!("{}", target), "198.51.100.7:5353");
        assert_eq!(from_target(&target).unwrap(), (ip, 5353));
    }

    #[test]
    fn test_v6_round_trip() {
        let octets = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0xdead, 0xbeef).octets();
        let ip = StackAddr::V6(octets);
        let target = to_target(&ip, 443);

        assert_eq!(target.port(), 443);
        let (back, port) = from_target(&target).unwrap();
        assert_eq!(back.octets(), &octets);
        assert_eq!(port, 443);
    }

    #[test]
    fn test_port_on_wire_is_big_endian() {
        let target = to_target(&StackAddr::V4([1, 2, 3, 4]), 0x1234);
        let mut bytes = Vec::new();
        target.write_to(&mut bytes);
        assert_eq!(&bytes[5..7], &[0x12, 0x34]);
    }

    #[test]
    fn test_domain_is_unsupported() {
        let target = TargetAddr::domain("dns.example".to_string(), 53);
        let err = from_target(&target).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFamily(_)));
    }

    #[test]
    fn test_v4_mapped_v6_stays_v6() {
        let mapped = Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped();
        let target = TargetAddr::ipv6(mapped, 80);
        let (ip, _) = from_target(&target).unwrap();
        assert!(!ip.is_ipv4());
    }

    #[test]
    fn test_mapped_source_for_v4_endpoint() {
        let endpoint = StackAddr::V4([10, 0, 0, 2]);
        let target = TargetAddr::ipv6(Ipv4Addr::new(1, 1, 1, 1).to_ipv6_mapped(), 53);

        assert_eq!(
            from_target_for(&target, &endpoint).unwrap(),
            (StackAddr::V4([1, 1, 1, 1]), 53)
        );
    }

    #[test]
    fn test_v4_source_for_v6_endpoint() {
        let endpoint = StackAddr::V6(Ipv6Addr::LOCALHOST.octets());
        let target = TargetAddr::ipv4(Ipv4Addr::new(8, 8, 4, 4), 53);
        let (ip, port) = from_target_for(&target, &endpoint).unwrap();

        assert_eq!(
            ip,
            StackAddr::V6(Ipv4Addr::new(8, 8, 4, 4).to_ipv6_mapped().octets())
        );
        assert_eq!(port, 53);
    }

    #[test]
    fn test_same_family_unchanged() {
        let v6 = StackAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1).octets());
        let target = to_target(&v6, 123);
        assert_eq!(from_target_for(&target, &v6).unwrap(), (v6, 123));

        let v4 = StackAddr::V4([192, 0, 2, 1]);
        let target = to_target(&v4, 123);
        assert_eq!(from_target_for(&target, &v4).unwrap(), (v4, 123));
    }

    #[test]
    fn test_native_v6_source_for_v4_endpoint() {
        let endpoint = StackAddr::V4([10, 0, 0, 2]);
        let target = TargetAddr::ipv6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 53);

        let err = from_target_for(&target, &endpoint).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFamily(_)));
    }
}

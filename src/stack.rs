//! Contract with the virtual packet stack
//!
//! The TUN-side TCP/IP stack owns its UDP endpoints ("pcbs") and the packet
//! buffer allocator. Both are shared by every session, so callers reach the
//! stack only through a [`StackHandle`] and hold its lock for each call.

use bytes::BytesMut;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared, lock-guarded handle to the virtual stack
pub type StackHandle<S> = Arc<Mutex<S>>;

/// Identifier of one virtual UDP endpoint inside the stack
pub type PcbId = u64;

/// Native address representation of the virtual stack
///
/// Raw octets tagged with their family, the way an embedded IP stack
/// stores `ip_addr_t`. The port travels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackAddr {
    /// IPv4 address octets
    V4([u8; 4]),
    /// IPv6 address octets
    V6([u8; 16]),
}

impl StackAddr {
    /// Whether this is an IPv4 address
    pub fn is_ipv4(&self) -> bool {
        matches!(self, StackAddr::V4(_))
    }

    /// Raw address octets (4 or 16 bytes)
    pub fn octets(&self) -> &[u8] {
        match self {
            StackAddr::V4(octets) => &octets[..],
            StackAddr::V6(octets) => &octets[..],
        }
    }
}

impl fmt::Display for StackAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackAddr::V4(octets) => write!(f, "{}", Ipv4Addr::from(*octets)),
            StackAddr::V6(octets) => write!(f, "{}", Ipv6Addr::from(*octets)),
        }
    }
}

/// One virtual UDP endpoint, as seen by the capture handler
///
/// `local_*` is the address the TUN-side application sent to; in a
/// tun2socks topology that is the real destination of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPcb {
    /// Endpoint id inside the stack
    pub id: PcbId,
    /// Local (bound) address
    pub local_ip: StackAddr,
    /// Local (bound) port
    pub local_port: u16,
    /// Remote address, i.e. the TUN-side application
    pub remote_ip: StackAddr,
    /// Remote port
    pub remote_port: u16,
}

/// Owned packet buffer handed out by the stack allocator
pub trait PacketBuf: AsRef<[u8]> + AsMut<[u8]> + Send + 'static {
    /// Shrink the buffer to `len` bytes
    fn truncate(&mut self, len: usize);
}

impl PacketBuf for BytesMut {
    fn truncate(&mut self, len: usize) {
        BytesMut::truncate(self, len)
    }
}

impl PacketBuf for Vec<u8> {
    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len)
    }
}

/// Capture handler registered on an endpoint
///
/// Called by the stack for each inbound datagram, or with `None` once the
/// flow has ended. The stack invokes it while holding its own lock, so the
/// handler must not try to lock the stack.
pub type RecvHandler<B> = Box<dyn FnMut(&UdpPcb, Option<B>, &StackAddr, u16) + Send + 'static>;

/// Operations a session needs from the virtual stack
pub trait NetStack: Send + 'static {
    /// Buffer type used for captured and injected datagrams
    type Buffer: PacketBuf;

    /// Allocate a zero-filled buffer of `len` bytes, `None` when out of memory
    fn alloc(&mut self, len: usize) -> Option<Self::Buffer>;

    /// Inject `buf` into the endpoint as a datagram coming from `src_ip:src_port`
    fn send_from(
        &mut self,
        pcb: PcbId,
        buf: Self::Buffer,
        src_ip: &StackAddr,
        src_port: u16,
    ) -> io::Result<()>;

    /// Register or, with `None`, detach the capture handler of an endpoint
    fn set_recv_handler(&mut self, pcb: PcbId, handler: Option<RecvHandler<Self::Buffer>>);

    /// Remove the endpoint from the stack
    fn remove(&mut self, pcb: PcbId);
}

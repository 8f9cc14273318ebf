//! Test utilities and mocks for Tunsplice
//!
//! This module provides a recording virtual stack and a scripted proxy
//! client used across integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tunsplice::config::UdpConfig;
use tunsplice::proxy::{ProxyConnector, ProxyUdpClient};
use tunsplice::socks::TargetAddr;
use tunsplice::stack::{NetStack, PacketBuf, PcbId, RecvHandler, StackAddr, StackHandle, UdpPcb};

/// Packet buffer that counts how many buffers are alive
pub struct TrackedBuf {
    data: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl TrackedBuf {
    pub fn new(data: Vec<u8>, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        TrackedBuf {
            data,
            live: live.clone(),
        }
    }
}

impl Drop for TrackedBuf {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsRef<[u8]> for TrackedBuf {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for TrackedBuf {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl PacketBuf for TrackedBuf {
    fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
}

/// Datagram injected into an endpoint by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    pub pcb: PcbId,
    pub data: Vec<u8>,
    pub src_ip: StackAddr,
    pub src_port: u16,
}

/// Virtual stack that records what sessions do to it
pub struct MockStack {
    live: Arc<AtomicUsize>,
    pcbs: HashMap<PcbId, UdpPcb>,
    handlers: HashMap<PcbId, RecvHandler<TrackedBuf>>,
    pub injected: Vec<Injected>,
    pub removed: Vec<PcbId>,
    pub fail_alloc: bool,
    pub fail_send: bool,
}

impl MockStack {
    pub fn new() -> Self {
        MockStack {
            live: Arc::new(AtomicUsize::new(0)),
            pcbs: HashMap::new(),
            handlers: HashMap::new(),
            injected: Vec::new(),
            removed: Vec::new(),
            fail_alloc: false,
            fail_send: false,
        }
    }

    /// Wrap in the shared handle sessions expect
    pub fn into_handle(self) -> StackHandle<MockStack> {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Register an endpoint
    pub fn add_pcb(&mut self, pcb: UdpPcb) {
        self.pcbs.insert(pcb.id, pcb);
    }

    /// Feed a datagram (or end-of-flow with `None`) to the endpoint's handler
    ///
    /// Returns false when no handler is attached.
    pub fn deliver(&mut self, id: PcbId, payload: Option<&[u8]>) -> bool {
        let pcb = match self.pcbs.get(&id) {
            Some(pcb) => pcb.clone(),
            None => return false,
        };
        let buf = payload.map(|data| TrackedBuf::new(data.to_vec(), &self.live));

        match self.handlers.get_mut(&id) {
            Some(handler) => {
                // Argument addresses are deliberately bogus; sessions must ignore them.
                handler(&pcb, buf, &StackAddr::V4([203, 0, 113, 99]), 9);
                true
            }
            None => false,
        }
    }

    pub fn has_handler(&self, id: PcbId) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Buffers currently alive anywhere (queued, in flight)
    pub fn live_buffers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl NetStack for MockStack {
    type Buffer = TrackedBuf;

    fn alloc(&mut self, len: usize) -> Option<TrackedBuf> {
        if self.fail_alloc {
            return None;
        }
        Some(TrackedBuf::new(vec![0u8; len], &self.live))
    }

    fn send_from(
        &mut self,
        pcb: PcbId,
        buf: TrackedBuf,
        src_ip: &StackAddr,
        src_port: u16,
    ) -> io::Result<()> {
        if self.fail_send {
            return Err(io::Error::new(io::ErrorKind::Other, "endpoint rejected"));
        }
        self.injected.push(Injected {
            pcb,
            data: buf.as_ref().to_vec(),
            src_ip: *src_ip,
            src_port,
        });
        Ok(())
    }

    fn set_recv_handler(&mut self, pcb: PcbId, handler: Option<RecvHandler<TrackedBuf>>) {
        match handler {
            Some(handler) => {
                self.handlers.insert(pcb, handler);
            }
            None => {
                self.handlers.remove(&pcb);
            }
        }
    }

    fn remove(&mut self, pcb: PcbId) {
        self.pcbs.remove(&pcb);
        self.removed.push(pcb);
    }
}

/// What the scripted proxy hands out on receive
pub type Reply = Result<(Vec<u8>, TargetAddr), io::ErrorKind>;

/// State shared between a mock proxy client and the test
#[derive(Default)]
pub struct ProxyState {
    pub sent: Mutex<Vec<(Vec<u8>, TargetAddr)>>,
    inbound: Mutex<VecDeque<Reply>>,
    ready: Notify,
    pub fail_send: AtomicBool,
    pub peeks: AtomicUsize,
    pub recvs: AtomicUsize,
}

impl ProxyState {
    pub fn new() -> Arc<Self> {
        Arc::new(ProxyState::default())
    }

    /// Queue a reply the client will hand to the session
    pub fn push_reply(&self, reply: Reply) {
        self.inbound.lock().unwrap().push_back(reply);
        self.ready.notify_one();
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, TargetAddr)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn peeks(&self) -> usize {
        self.peeks.load(Ordering::SeqCst)
    }

    pub fn recvs(&self) -> usize {
        self.recvs.load(Ordering::SeqCst)
    }

    fn has_inbound(&self) -> bool {
        !self.inbound.lock().unwrap().is_empty()
    }
}

/// Proxy client driven by a [`ProxyState`]
pub struct MockProxy {
    state: Arc<ProxyState>,
}

#[async_trait]
impl ProxyUdpClient for MockProxy {
    async fn send_to(&self, payload: &[u8], addr: &TargetAddr) -> io::Result<usize> {
        if self.state.fail_send.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "relay gone"));
        }
        self.state
            .sent
            .lock()
            .unwrap()
            .push((payload.to_vec(), addr.clone()));
        Ok(payload.len())
    }

    fn try_peek(&self) -> io::Result<bool> {
        self.state.peeks.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.has_inbound())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, TargetAddr)> {
        self.state.recvs.fetch_add(1, Ordering::SeqCst);
        let reply = self.state.inbound.lock().unwrap().pop_front();
        match reply {
            Some(Ok((data, from))) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok((len, from))
            }
            Some(Err(kind)) => Err(kind.into()),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    async fn readable(&self) -> io::Result<()> {
        loop {
            if self.state.has_inbound() {
                return Ok(());
            }
            self.state.ready.notified().await;
        }
    }
}

/// Connector handing out clients bound to one shared state
pub struct MockConnector {
    pub state: Arc<ProxyState>,
    pub fail: bool,
}

impl MockConnector {
    pub fn new(state: Arc<ProxyState>) -> Self {
        MockConnector { state, fail: false }
    }

    pub fn failing() -> Self {
        MockConnector {
            state: ProxyState::new(),
            fail: true,
        }
    }
}

impl ProxyConnector for MockConnector {
    type Client = MockProxy;

    fn new_client(&self) -> io::Result<MockProxy> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "no local port"));
        }
        Ok(MockProxy {
            state: self.state.clone(),
        })
    }
}

/// Endpoint for a flow from 10.0.0.2:40000 to 8.8.8.8:53
pub fn pcb_v4(id: PcbId) -> UdpPcb {
    UdpPcb {
        id,
        local_ip: StackAddr::V4(Ipv4Addr::new(8, 8, 8, 8).octets()),
        local_port: 53,
        remote_ip: StackAddr::V4(Ipv4Addr::new(10, 0, 0, 2).octets()),
        remote_port: 40000,
    }
}

/// Endpoint for a flow from [fd00::2]:40000 to [2001:db8::53]:53
pub fn pcb_v6(id: PcbId) -> UdpPcb {
    UdpPcb {
        id,
        local_ip: StackAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x53).octets()),
        local_port: 53,
        remote_ip: StackAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 2).octets()),
        remote_port: 40000,
    }
}

/// Session config with the idle timeout disabled
pub fn udp_config() -> UdpConfig {
    UdpConfig {
        read_write_timeout: 0,
        ..UdpConfig::default()
    }
}

/// Poll `cond` until it holds or two seconds pass
pub async fn eventually<F: FnMut() -> bool>(mut cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

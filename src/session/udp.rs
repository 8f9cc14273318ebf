//! UDP session
//!
//! Splices one virtual UDP endpoint with one SOCKS5 UDP client. Captured
//! datagrams are queued by the capture handler and forwarded one per loop
//! iteration; replies from the proxy are injected back one per iteration.

use super::queue::{Dropped, FrameQueue};
use super::{Progress, Session, SessionBase, SessionId};
use crate::addr::{from_target_for, to_target};
use crate::config::UdpConfig;
use crate::error::SessionError;
use crate::proxy::{ProxyConnector, ProxyUdpClient};
use crate::stack::{NetStack, PacketBuf, RecvHandler, StackAddr, StackHandle, UdpPcb};
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace, warn};

type SharedQueue<B> = Arc<Mutex<FrameQueue<B>>>;

/// Relay session for one virtual UDP endpoint
pub struct UdpSession<S: NetStack, C: ProxyUdpClient> {
    /// Shared lifecycle state
    base: Arc<SessionBase>,
    /// Endpoint this session serves
    pcb: UdpPcb,
    /// Whether the capture handler is still registered on `pcb`
    attached: bool,
    /// Virtual stack, locked for every call into it
    stack: StackHandle<S>,
    /// Proxy-side client
    client: C,
    /// Frames captured but not yet forwarded
    queue: SharedQueue<S::Buffer>,
    /// Receive buffer size for the backward path
    buf_size: usize,
    /// Longest wait for traffic before the session gives up
    idle_timeout: Option<Duration>,
}

impl<S: NetStack, C: ProxyUdpClient> UdpSession<S, C> {
    /// Create a session for `pcb` and register its capture handler
    ///
    /// Acquires the stack lock, so it must not be called while holding it.
    /// Nothing is registered when the proxy client cannot be created.
    pub async fn new<F>(
        id: SessionId,
        pcb: UdpPcb,
        stack: StackHandle<S>,
        connector: &F,
        config: &UdpConfig,
    ) -> Result<Self, SessionError>
    where
        F: ProxyConnector<Client = C>,
    {
        let client = connector.new_client().map_err(SessionError::Construction)?;

        let base = SessionBase::new(id);
        let queue: SharedQueue<S::Buffer> = Arc::new(Mutex::new(FrameQueue::new(config.pool_size)));

        stack
            .lock()
            .await
            .set_recv_handler(pcb.id, Some(capture_handler(base.clone(), queue.clone())));

        debug!(
            "UDP session {} new: {}:{} <- {}:{}",
            id, pcb.local_ip, pcb.local_port, pcb.remote_ip, pcb.remote_port
        );

        Ok(UdpSession {
            base,
            pcb,
            attached: true,
            stack,
            client,
            queue,
            buf_size: config.buf_size,
            idle_timeout: config.idle_timeout(),
        })
    }

    /// Endpoint served by this session
    pub fn pcb(&self) -> &UdpPcb {
        &self.pcb
    }

    /// Number of captured frames waiting to be forwarded
    pub fn queued(&self) -> usize {
        self.lock_queue().len()
    }

    fn lock_queue(&self) -> MutexGuard<'_, FrameQueue<S::Buffer>> {
        lock_queue(&self.queue)
    }

    /// Forward the oldest queued frame to the proxy
    ///
    /// `Ok(false)` when the queue is empty.
    async fn forward(&self) -> Result<bool, SessionError> {
        let next = self.lock_queue().dequeue_front();
        let frame = match next {
            Some(frame) => frame,
            None => return Ok(false),
        };

        self.client
            .send_to(frame.data.as_ref(), &frame.addr)
            .await
            .map_err(SessionError::Send)?;

        trace!(
            "UDP session {} fwd {} bytes to {}",
            self.base.id(),
            frame.data.as_ref().len(),
            frame.addr
        );
        Ok(true)
    }

    /// Move one reply from the proxy into the virtual endpoint
    ///
    /// `Ok(false)` when the proxy has nothing to deliver.
    async fn backward(&self) -> Result<bool, SessionError> {
        if !self.client.try_peek().map_err(SessionError::Receive)? {
            return Ok(false);
        }

        let buf = {
            let mut stack = self.stack.lock().await;
            stack.alloc(self.buf_size)
        };
        let mut buf = buf.ok_or_else(|| {
            SessionError::Allocation(format!("{} byte receive buffer", self.buf_size))
        })?;

        let (len, from) = match self.client.recv_from(buf.as_mut()).await {
            Ok(received) => received,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(e) => return Err(SessionError::Receive(e)),
        };

        let (src_ip, src_port) = from_target_for(&from, &self.pcb.remote_ip)?;
        buf.truncate(len);

        self.stack
            .lock()
            .await
            .send_from(self.pcb.id, buf, &src_ip, src_port)
            .map_err(SessionError::Send)?;

        trace!("UDP session {} bwd {} bytes from {}", self.base.id(), len, from);
        Ok(true)
    }

    fn progress(&self, direction: &str, step: Result<bool, SessionError>) -> Progress {
        match step {
            Ok(true) => Progress::Advanced,
            Ok(false) => Progress::Idle,
            Err(e) => {
                warn!("UDP session {} {}: {}", self.base.id(), direction, e);
                Progress::Failed
            }
        }
    }

    /// Sleep until a frame is queued, the proxy becomes readable or the
    /// session is terminated
    ///
    /// Returns `false` when the session should stop.
    async fn wait_io(&self) -> bool {
        let wait = async {
            tokio::select! {
                _ = self.base.notified() => Ok(()),
                ready = self.client.readable() => ready,
            }
        };

        let ready = match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(ready) => ready,
                Err(_) => {
                    debug!("UDP session {} idle for {:?}", self.base.id(), limit);
                    return false;
                }
            },
            None => wait.await,
        };

        match ready {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "UDP session {} wait: {}",
                    self.base.id(),
                    SessionError::Receive(e)
                );
                false
            }
        }
    }
}

#[async_trait]
impl<S: NetStack, C: ProxyUdpClient> Session for UdpSession<S, C> {
    fn base(&self) -> &Arc<SessionBase> {
        &self.base
    }

    async fn splice(&mut self) {
        debug!("UDP session {} splice", self.base.id());

        let mut fwd = Progress::Advanced;
        let mut bwd = Progress::Advanced;

        loop {
            if self.base.is_terminated() {
                break;
            }

            if fwd != Progress::Failed {
                let step = self.forward().await;
                fwd = self.progress("fwd", step);
            }
            if bwd != Progress::Failed {
                let step = self.backward().await;
                bwd = self.progress("bwd", step);
            }

            if fwd == Progress::Failed || bwd == Progress::Failed {
                break;
            }

            if fwd == Progress::Advanced || bwd == Progress::Advanced {
                tokio::task::yield_now().await;
            } else if !self.wait_io().await {
                break;
            }
        }

        debug!("UDP session {} splice done", self.base.id());
    }

    async fn destruct(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;

        let released = self.lock_queue().drain();
        debug!(
            "UDP session {} destruct, {} frames released",
            self.base.id(),
            released
        );

        {
            let mut stack = self.stack.lock().await;
            stack.set_recv_handler(self.pcb.id, None);
            stack.remove(self.pcb.id);
        }

        self.base.destruct();
    }
}

impl<S: NetStack, C: ProxyUdpClient> Drop for UdpSession<S, C> {
    fn drop(&mut self) {
        if !self.attached {
            return;
        }

        // Dropped without destruct, e.g. an aborted task.
        match self.stack.try_lock() {
            Ok(mut stack) => {
                stack.set_recv_handler(self.pcb.id, None);
                stack.remove(self.pcb.id);
            }
            Err(_) => warn!(
                "UDP session {} dropped while stack busy, endpoint {} left attached",
                self.base.id(),
                self.pcb.id
            ),
        }
    }
}

fn lock_queue<B>(queue: &Mutex<FrameQueue<B>>) -> MutexGuard<'_, FrameQueue<B>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build the handler the stack calls for each captured datagram
///
/// The reported address is always the endpoint's own local address: every
/// endpoint carries exactly one flow, so the per-datagram source is not
/// consulted.
fn capture_handler<B: PacketBuf>(base: Arc<SessionBase>, queue: SharedQueue<B>) -> RecvHandler<B> {
    Box::new(move |pcb: &UdpPcb, data: Option<B>, _addr: &StackAddr, _port: u16| {
        let data = match data {
            Some(data) => data,
            None => {
                base.terminate();
                return;
            }
        };

        let addr = to_target(&pcb.local_ip, pcb.local_port);
        let queued = lock_queue(&queue).enqueue(addr, data);

        match queued {
            Ok(_) => base.wakeup(),
            Err(Dropped::Full) => trace!("UDP session {} queue full, datagram dropped", base.id()),
            Err(Dropped::OutOfMemory) => warn!(
                "UDP session {} {}, datagram dropped",
                base.id(),
                SessionError::Allocation("frame".to_string())
            ),
        }
    })
}

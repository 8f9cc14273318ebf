//! Relay sessions
//!
//! A session owns one virtual endpoint and one proxy client and runs as its
//! own tokio task. [`SessionBase`] is the part shared with the outside
//! world (the capture handler and the tunnel registry): it wakes the task
//! and carries the termination flag.

mod queue;
mod udp;

pub use queue::{Dropped, Frame, FrameQueue};
pub use udp::UdpSession;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Identifier assigned to each session
pub type SessionId = u64;

/// Outcome of one step in one relay direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A datagram was moved
    Advanced,
    /// Nothing to move right now
    Idle,
    /// The direction broke; the session must end
    Failed,
}

/// Lifecycle state shared between a session task and its wakers
#[derive(Debug)]
pub struct SessionBase {
    id: SessionId,
    wakeup: Notify,
    terminated: AtomicBool,
}

impl SessionBase {
    /// Create the shared state for a new session
    pub fn new(id: SessionId) -> Arc<Self> {
        Arc::new(SessionBase {
            id,
            wakeup: Notify::new(),
            terminated: AtomicBool::new(false),
        })
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wake the session task if it is waiting for I/O
    ///
    /// A wakeup sent while the task is busy is kept and consumed by its
    /// next wait.
    pub fn wakeup(&self) {
        self.wakeup.notify_one();
    }

    /// Wait for the next [`SessionBase::wakeup`]
    pub async fn notified(&self) {
        self.wakeup.notified().await
    }

    /// Ask the session to stop at its next iteration boundary
    pub fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            debug!("session {} terminate", self.id);
        }
        self.wakeup();
    }

    /// Whether termination was requested
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Final step of every session's destructor
    pub fn destruct(&self) {
        self.terminated.store(true, Ordering::Release);
        debug!("session {} destruct", self.id);
    }
}

/// Behaviour shared by every session kind
#[async_trait]
pub trait Session: Send + 'static {
    /// Shared lifecycle state
    fn base(&self) -> &Arc<SessionBase>;

    /// Relay traffic until a direction fails or termination is requested
    async fn splice(&mut self);

    /// Release everything the session holds
    ///
    /// Only called once `splice` has returned. Calling it again is a no-op.
    async fn destruct(&mut self);
}

/// Task body of a session: splice to completion, then tear down
pub async fn run<T: Session>(mut session: T) {
    session.splice().await;
    session.destruct().await;
}

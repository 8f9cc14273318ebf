//! UDP tunnel
//!
//! Turns new virtual UDP endpoints into running sessions and keeps track of
//! them so they can all be stopped together.

use crate::config::{Config, UdpConfig};
use crate::error::TunnelError;
use crate::proxy::{ProxyConnector, Socks5Connector};
use crate::session::{self, Session, SessionBase, SessionId, UdpSession};
use crate::stack::{NetStack, StackHandle, UdpPcb};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Registry = Arc<Mutex<HashMap<SessionId, Arc<SessionBase>>>>;

/// Registry and spawner of UDP sessions sharing one virtual stack
pub struct UdpTunnel<S: NetStack, F: ProxyConnector> {
    /// Virtual stack shared by every session
    stack: StackHandle<S>,
    /// Creates one proxy client per session
    connector: Arc<F>,
    /// Session tunables
    config: UdpConfig,
    /// Running sessions
    sessions: Registry,
    /// Next session id
    next_id: AtomicU64,
}

impl<S: NetStack> UdpTunnel<S, Socks5Connector> {
    /// Create a tunnel relaying through the SOCKS5 proxy in `config`
    pub fn from_config(stack: StackHandle<S>, config: &Config) -> Self {
        UdpTunnel::new(
            stack,
            Socks5Connector::new(config.socks5.clone()),
            config.udp.clone(),
        )
    }
}

impl<S: NetStack, F: ProxyConnector> UdpTunnel<S, F> {
    /// Create a tunnel with an explicit connector
    pub fn new(stack: StackHandle<S>, connector: F, config: UdpConfig) -> Self {
        UdpTunnel {
            stack,
            connector: Arc::new(connector),
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a session for a newly seen endpoint
    ///
    /// The session task splices until the flow ends, then tears itself down
    /// and leaves the registry, also when the task is aborted. If the session
    /// cannot be built the endpoint is removed from the stack and the error
    /// returned.
    pub async fn accept(&self, pcb: UdpPcb) -> Result<JoinHandle<()>, TunnelError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pcb_id = pcb.id;

        let session = match UdpSession::<S, F::Client>::new(
            id,
            pcb,
            self.stack.clone(),
            self.connector.as_ref(),
            &self.config,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!("UDP session {} for endpoint {}: {}", id, pcb_id, e);
                self.stack.lock().await.remove(pcb_id);
                return Err(e.into());
            }
        };

        lock_registry(&self.sessions).insert(id, session.base().clone());

        let registered = Registered {
            sessions: self.sessions.clone(),
            id,
        };
        let handle = tokio::spawn(async move {
            let _registered = registered;
            session::run(session).await;
        });

        Ok(handle)
    }

    /// Terminate every running session
    ///
    /// Sessions finish their current iteration, destruct, and deregister
    /// on their own.
    pub fn shutdown(&self) {
        let sessions = lock_registry(&self.sessions);
        info!("Terminating {} UDP sessions", sessions.len());

        for base in sessions.values() {
            base.terminate();
        }
    }

    /// Number of sessions currently registered
    pub fn session_count(&self) -> usize {
        lock_registry(&self.sessions).len()
    }
}

/// Registry entry of a running session, removed on drop
struct Registered {
    sessions: Registry,
    id: SessionId,
}

impl Drop for Registered {
    fn drop(&mut self) {
        lock_registry(&self.sessions).remove(&self.id);
        debug!("UDP session {} finished", self.id);
    }
}

fn lock_registry(
    sessions: &Mutex<HashMap<SessionId, Arc<SessionBase>>>,
) -> std::sync::MutexGuard<'_, HashMap<SessionId, Arc<SessionBase>>> {
    sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

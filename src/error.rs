//! Error types for Tunsplice
//!
//! This module defines the crate-level error and the session-scoped error
//! taxonomy used by the UDP splice loop.

use std::io;
use thiserror::Error;

/// Main error type for Tunsplice operations
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors scoped to a single UDP session
///
/// None of these are fatal to the process. `Send`, `Receive`,
/// `UnsupportedFamily` and a failed receive-buffer `Allocation` fail the
/// direction they occur in, which ends the whole session. A failed frame
/// allocation on the capture side only drops that datagram.
/// `Construction` is returned to whoever asked for the session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Proxy or virtual endpoint rejected a send
    #[error("Send failure: {0}")]
    Send(#[source] io::Error),

    /// Proxy receive failed with something other than would-block
    #[error("Receive failure: {0}")]
    Receive(#[source] io::Error),

    /// Buffer or frame allocation failed
    #[error("Allocation failure: {0}")]
    Allocation(String),

    /// Address family is neither IPv4 nor IPv6
    #[error("Unsupported address family: {0}")]
    UnsupportedFamily(String),

    /// Proxy client could not be created
    #[error("Construction failure: {0}")]
    Construction(#[source] io::Error),
}

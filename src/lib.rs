//! # Tunsplice - UDP relay between a virtual stack and a SOCKS5 proxy
//!
//! Tunsplice is the UDP half of a tun2socks-style tunnel. Datagrams captured
//! on virtual UDP endpoints of a TUN-side TCP/IP stack are forwarded to a
//! SOCKS5 proxy in UDP-associate format, and the proxy's replies are
//! injected back into the endpoint as if they came from the real remote.
//!
//! ## Features
//!
//! - **One Session per Flow**: Each virtual endpoint gets its own task and
//!   its own proxy client
//! - **Bounded Capture Queue**: Up to 512 datagrams wait per session, newer
//!   ones are dropped beyond that
//! - **Dual Stack**: IPv4 and IPv6 on both the virtual and the proxy side
//! - **Shared Stack Discipline**: Every call into the virtual stack happens
//!   under one async mutex
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tunsplice::config::load_config;
//! use tunsplice::tunnel::UdpTunnel;
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("tunsplice.toml")?;
//!     tunsplice::logging::init(&config.log)?;
//!
//!     let stack = Arc::new(Mutex::new(MyStack::new()));
//!     let tunnel = UdpTunnel::from_config(stack, &config);
//!
//!     // For every new UDP endpoint reported by the stack:
//!     // tunnel.accept(pcb).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! virtual stack -> capture handler -> FrameQueue -> UdpSession -> proxy client -> SOCKS5 proxy
//! SOCKS5 proxy -> proxy client -> UdpSession -> virtual stack
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod addr;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod session;
pub mod socks;
pub mod stack;
pub mod tunnel;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{SessionError, TunnelError};
pub use session::{Session, UdpSession};
pub use tunnel::UdpTunnel;

/// Version of the Tunsplice library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

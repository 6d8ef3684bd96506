//! Datagram transport abstraction.
//!
//! Agents talk exclusively through connectionless, unordered, unreliable
//! datagrams. The [`Transport`] trait keeps the agents independent of the
//! socket type; [`UdpTransport`] is the production backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Requester   │   │ Responder 1  │   │ Responder N  │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ UdpTransport │   │ UdpTransport │   │ UdpTransport │
//! │  :5000       │   │  :5001       │   │  :500N       │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```

mod udp;

pub use udp::UdpTransport;

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use crate::error::Result;

/// Boxed future returned by [`Transport`] operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Transport trait for pluggable datagram backends.
pub trait Transport: Send + Sync {
    /// Send one datagram to `target`. Returns the number of bytes sent.
    fn send_to<'a>(&'a self, payload: &'a [u8], target: SocketAddr)
        -> TransportFuture<'a, usize>;

    /// Wait for the next datagram. Payloads larger than `buf` are truncated.
    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> TransportFuture<'a, (usize, SocketAddr)>;

    /// Take an already queued datagram without waiting.
    fn try_recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>>;

    /// Address this transport is bound to.
    fn local_addr(&self) -> SocketAddr;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}

/// Receive with an upper bound on the wait.
///
/// Returns `Ok(None)` when `limit` elapses with no datagram.
pub async fn recv_within<T>(
    transport: &T,
    buf: &mut [u8],
    limit: Duration,
) -> Result<Option<(usize, SocketAddr)>>
where
    T: Transport + ?Sized,
{
    match tokio::time::timeout(limit, transport.recv_from(buf)).await {
        Ok(received) => received.map(Some),
        Err(_elapsed) => Ok(None),
    }
}

//! UDP transport backed by a tokio socket.

use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use super::{Transport, TransportFuture};
use crate::error::{QuorumError, Result};

/// UDP datagram transport bound to a single local endpoint.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    /// Address actually bound (resolves port 0).
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind `addr` on behalf of `agent`.
    ///
    /// Failure is reported as [`QuorumError::Bind`] naming the agent.
    pub async fn bind(agent: &str, addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| QuorumError::Bind {
                agent: agent.to_string(),
                addr,
                source,
            })?;
        let local_addr = socket.local_addr()?;

        tracing::debug!("{} bound UDP {}", agent, local_addr);
        Ok(Self { socket, local_addr })
    }

    /// Bind on the IPv4 loopback address.
    pub async fn localhost(agent: &str, port: u16) -> Result<Self> {
        Self::bind(agent, SocketAddr::from(([127, 0, 0, 1], port))).await
    }
}

impl Transport for UdpTransport {
    fn send_to<'a>(
        &'a self,
        payload: &'a [u8],
        target: SocketAddr,
    ) -> TransportFuture<'a, usize> {
        Box::pin(async move {
            self.socket
                .send_to(payload, target)
                .await
                .map_err(|e| QuorumError::Network(format!("send to {target} failed: {e}")))
        })
    }

    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> TransportFuture<'a, (usize, SocketAddr)> {
        Box::pin(async move {
            self.socket
                .recv_from(buf)
                .await
                .map_err(|e| QuorumError::Network(format!("receive failed: {e}")))
        })
    }

    fn try_recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.socket.try_recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(QuorumError::Network(format!("receive failed: {e}"))),
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}

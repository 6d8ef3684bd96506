//! Responder agent.
//!
//! Waits for `#NeedSupport_<period>` requests, thinks for a while, and
//! answers each one with `Ok`, `No` or silence as its policy decides.
//! Anything that is not a well-formed request is dropped without reply.

use std::net::SocketAddr;
use std::time::Duration;

use super::decision::DecisionPolicy;
use super::AgentId;
use crate::protocol::{Request, Response, MAX_DATAGRAM_SIZE};
use crate::transport::Transport;

/// Pause after a failed receive before trying again
const RECV_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Responder agent
pub struct Responder<T, P> {
    id: AgentId,
    transport: T,
    policy: P,
    buffer_size: usize,
}

impl<T, P> Responder<T, P>
where
    T: Transport,
    P: DecisionPolicy,
{
    /// Create a responder listening on `transport`.
    pub fn new(id: AgentId, transport: T, policy: P) -> Self {
        Self {
            id,
            transport,
            policy,
            buffer_size: MAX_DATAGRAM_SIZE,
        }
    }

    /// Set the receive buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Responder identity
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Bound endpoint
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Serve requests until the task is dropped or aborted.
    pub async fn run(mut self) {
        let mut buf = vec![0u8; self.buffer_size];
        tracing::info!("{} ready on {}", self.id, self.transport.local_addr());

        loop {
            let (len, source) = match self.transport.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!("{}: {}", self.id, e);
                    tokio::time::sleep(RECV_RETRY_DELAY).await;
                    continue;
                },
            };
            self.handle(&buf[..len], source).await;
        }
    }

    /// Process one datagram from `source`.
    ///
    /// Returns the response that was sent, `None` for dropped input, silence
    /// or a failed send.
    pub async fn handle(&mut self, payload: &[u8], source: SocketAddr) -> Option<Response> {
        let request = match Request::decode(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("{} dropping datagram from {}: {}", self.id, source, e);
                return None;
            },
        };

        let delay = self.policy.thinking_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let Some(verdict) = self.policy.decide(&request).verdict() else {
            tracing::info!("{} ignoring request {} (silence)", self.id, request.period);
            return None;
        };

        let response = request.respond(verdict);
        let datagram = match response.to_datagram(self.buffer_size) {
            Ok(datagram) => datagram,
            Err(e) => {
                tracing::warn!("{} cannot encode {}: {}", self.id, response, e);
                return None;
            },
        };

        match self.transport.send_to(&datagram, source).await {
            Ok(_) => {
                tracing::info!("{} sent {} to requester after {:.2?}", self.id, response, delay);
                Some(response)
            },
            Err(e) => {
                tracing::warn!("{}: {}", self.id, e);
                None
            },
        }
    }
}

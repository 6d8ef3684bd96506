//! Quorum simulation error types.
//!
//! Only [`QuorumError::Bind`] is fatal to a run. Every other variant is
//! produced by per-datagram work (decoding, sending) and is absorbed by the
//! agent that hit it: logged, counted, and never propagated across agents.

use std::net::SocketAddr;

use thiserror::Error;

/// Quorum simulation errors.
#[derive(Error, Debug)]
pub enum QuorumError {
    /// An agent could not bind its local endpoint.
    #[error("{agent} failed to bind {addr}: {source}")]
    Bind {
        /// Human-readable agent name (e.g. `requester`, `responder 2`).
        agent: String,
        /// Address the agent tried to bind.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Datagram payload did not match the expected wire format.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Network communication error after startup.
    #[error("Network error: {0}")]
    Network(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for quorum operations
pub type Result<T> = std::result::Result<T, QuorumError>;

impl QuorumError {
    /// Whether this error should abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Config(_))
    }
}

impl From<toml::de::Error> for QuorumError {
    fn from(err: toml::de::Error) -> Self {
        QuorumError::Config(format!("Failed to parse config: {err}"))
    }
}

impl From<toml::ser::Error> for QuorumError {
    fn from(err: toml::ser::Error) -> Self {
        QuorumError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_agent_and_port() {
        let err = QuorumError::Bind {
            agent: "responder 2".to_string(),
            addr: "127.0.0.1:5002".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("responder 2"));
        assert!(msg.contains("5002"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_message_not_fatal() {
        let err = QuorumError::InvalidMessage("garbage".to_string());
        assert!(!err.is_fatal());
    }
}

//! Requester and responder agents.
//!
//! Agents own their transport and share no mutable state; everything they
//! learn about each other arrives as a datagram.

mod decision;
mod metrics;
mod requester;
mod responder;

pub use decision::{sample_between, Decision, DecisionPolicy, FixedPolicy, RandomPolicy};
pub use metrics::{Metrics, MetricsSummary};
pub use requester::{Requester, RequesterSettings};
pub use responder::Responder;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Responder identity, 1-based in configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "responder {}", self.0)
    }
}

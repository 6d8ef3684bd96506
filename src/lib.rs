//! # Quorum - Help-Request Quorum Simulation
//!
//! A requester agent broadcasts a support request to a fixed set of responder
//! agents once per period over UDP. Each responder thinks for a random while
//! and then approves, denies or ignores the request. A period is satisfied
//! when at least two approvals arrive before the round's wait budget runs out.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │        Simulation        │
//!                 │ binds, spawns, reports   │
//!                 └────────────┬─────────────┘
//!            spawn x N         │          run on caller
//!        ┌─────────────────────┼─────────────────────┐
//!        v                     v                     v
//! ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//! │ Responder 1 │  ...  │ Responder N │       │  Requester  │
//! └──────┬──────┘       └──────┬──────┘       └──────┬──────┘
//!        └────────── UDP datagrams only ─────────────┘
//! ```
//!
//! ## Wire Formats
//!
//! | Direction             | Format                  |
//! |-----------------------|-------------------------|
//! | Requester → Responder | `#NeedSupport_<period>` |
//! | Responder → Requester | `Ok_<period>`           |
//! | Responder → Requester | `No_<period>`           |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quorum::{Config, Simulation};
//!
//! let report = Simulation::new(Config::default())?.run().await?;
//! println!("{report}");
//! ```
//!
//! ### Deterministic responders
//!
//! ```rust,ignore
//! use quorum::{Config, FixedPolicy, Simulation};
//!
//! let report = Simulation::new(config)?
//!     .with_policies(|_| Box::new(FixedPolicy::approve()))
//!     .run()
//!     .await?;
//! assert_eq!(report.metrics.satisfaction_percent(), 100.0);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Wire messages and round state machine
//! - [`agent`]: Requester, responder, decision policies and metrics
//! - [`transport`]: Datagram transport trait and UDP backend
//! - [`simulation`]: Orchestrator and final report
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod agent;
pub mod config;
pub mod error;
pub mod protocol;
pub mod simulation;
pub mod transport;

// Re-exports for convenience
pub use agent::{
    AgentId, Decision, DecisionPolicy, FixedPolicy, Metrics, RandomPolicy, Requester,
    RequesterSettings, Responder,
};
pub use config::Config;
pub use error::{QuorumError, Result};
pub use protocol::{Request, Response, Round, RoundOutcome, Verdict};
pub use simulation::{Simulation, SimulationReport};
pub use transport::{Transport, UdpTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

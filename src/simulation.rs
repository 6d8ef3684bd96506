//! Simulation orchestrator.
//!
//! Binds every endpoint up front, spawns one task per responder, runs the
//! requester on the calling task and aborts the responders once the last
//! period is scored.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{
    AgentId, DecisionPolicy, Metrics, MetricsSummary, RandomPolicy, Requester, RequesterSettings,
    Responder,
};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::CloseReason;
use crate::transport::{Transport, UdpTransport};

/// Builds the decision policy for each responder.
pub type PolicyFactory = Box<dyn Fn(AgentId) -> Box<dyn DecisionPolicy> + Send + Sync>;

/// One requester plus a fixed set of responders.
pub struct Simulation {
    config: Config,
    policies: PolicyFactory,
    run_id: Uuid,
}

impl Simulation {
    /// Validate `config` and prepare a run with randomized responders.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let policy = config.policy.clone();
        let timing = config.timing.clone();
        let policies: PolicyFactory = Box::new(move |id| {
            Box::new(RandomPolicy::from_config(&policy, &timing, id)) as Box<dyn DecisionPolicy>
        });

        Ok(Self {
            config,
            policies,
            run_id: Uuid::new_v4(),
        })
    }

    /// Replace the responder policies.
    pub fn with_policies<F>(mut self, factory: F) -> Self
    where
        F: Fn(AgentId) -> Box<dyn DecisionPolicy> + Send + Sync + 'static,
    {
        self.policies = Box::new(factory);
        self
    }

    /// Run identifier attached to every log line of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run all periods and report.
    ///
    /// Fails only if an endpoint cannot be bound or a request cannot be
    /// encoded; everything else is absorbed into the metrics.
    pub async fn run(self) -> Result<SimulationReport> {
        let span = tracing::info_span!("simulation", run_id = %self.run_id);
        self.execute().instrument(span).await
    }

    async fn execute(self) -> Result<SimulationReport> {
        let network = &self.config.network;
        let requester_transport = UdpTransport::bind("requester", network.requester_addr()).await?;

        let mut responder_transports = Vec::with_capacity(network.responder_ports.len());
        for (index, addr) in network.responder_addrs().into_iter().enumerate() {
            let id = AgentId(index as u32 + 1);
            let transport = UdpTransport::bind(&id.to_string(), addr).await?;
            responder_transports.push((id, transport));
        }

        let responders: Vec<SocketAddr> = responder_transports
            .iter()
            .map(|(_, transport)| transport.local_addr())
            .collect();
        let requester_addr = requester_transport.local_addr();

        let handles: Vec<_> = responder_transports
            .into_iter()
            .map(|(id, transport)| {
                let responder = Responder::new(id, transport, (self.policies)(id))
                    .with_buffer_size(network.buffer_size);
                tokio::spawn(responder.run().in_current_span())
            })
            .collect();

        let mut requester = Requester::new(
            requester_transport,
            responders.clone(),
            RequesterSettings::from_config(&self.config),
        );
        if let Some(seed) = self.config.policy.seed {
            requester = requester.with_seed(seed);
        }

        let result = requester.run(self.config.simulation.periods).await;

        for handle in &handles {
            handle.abort();
        }

        Ok(SimulationReport {
            run_id: self.run_id.to_string(),
            requester: requester_addr,
            responders,
            quorum: self.config.simulation.quorum,
            metrics: result?,
        })
    }
}

/// Final report of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Run identifier
    pub run_id: String,
    /// Requester endpoint
    pub requester: SocketAddr,
    /// Responder endpoints, in id order
    pub responders: Vec<SocketAddr>,
    /// Quorum threshold used
    pub quorum: usize,
    /// Requester metrics
    pub metrics: Metrics,
}

impl SimulationReport {
    /// Headline numbers
    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "FINAL REPORT ({})", self.run_id)?;
        for round in self.metrics.rounds() {
            let status = if round.satisfied { "satisfied" } else { "failed" };
            let reason = match round.reason {
                CloseReason::Quorum => "quorum",
                CloseReason::Timeout => "timeout",
            };
            writeln!(
                f,
                "  period {:>3}: {:<9} Ok={} No={} closed by {} after {:.2?}",
                round.period, status, round.affirmative, round.negative, reason, round.elapsed
            )?;
        }
        writeln!(f, "Total periods:      {}", summary.periods)?;
        writeln!(f, "Satisfied periods:  {}", summary.satisfied)?;
        writeln!(f, "Satisfaction:       {:.1}%", summary.satisfaction_percent)?;
        writeln!(
            f,
            "Discarded:          {} stale, {} malformed",
            summary.stale_replies, summary.malformed_datagrams
        )?;
        write!(f, "{}", "=".repeat(50))
    }
}

//! Requester run metrics.
//!
//! Tracks per-round outcomes plus the datagrams the requester discarded.

use serde::{Deserialize, Serialize};

use crate::protocol::RoundOutcome;

/// Aggregate metrics for one requester run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Scored rounds, in period order
    rounds: Vec<RoundOutcome>,
    /// Well-formed replies for a period other than the open round
    stale_replies: u64,
    /// Datagrams that did not parse as a reply
    malformed_datagrams: u64,
}

impl Metrics {
    /// Create empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a closed round into the aggregate
    pub fn record_round(&mut self, outcome: RoundOutcome) {
        self.rounds.push(outcome);
    }

    /// Count a discarded out-of-round reply
    pub fn record_stale(&mut self) {
        self.stale_replies += 1;
    }

    /// Count a discarded unparseable datagram
    pub fn record_malformed(&mut self) {
        self.malformed_datagrams += 1;
    }

    /// Scored rounds
    pub fn rounds(&self) -> &[RoundOutcome] {
        &self.rounds
    }

    /// Periods attempted
    pub fn periods(&self) -> u64 {
        self.rounds.len() as u64
    }

    /// Periods that reached quorum
    pub fn satisfied(&self) -> u64 {
        self.rounds.iter().filter(|r| r.satisfied).count() as u64
    }

    /// Periods that closed without quorum
    pub fn failed(&self) -> u64 {
        self.periods() - self.satisfied()
    }

    /// Stale replies discarded
    pub fn stale_replies(&self) -> u64 {
        self.stale_replies
    }

    /// Malformed datagrams discarded
    pub fn malformed_datagrams(&self) -> u64 {
        self.malformed_datagrams
    }

    /// In-round `Ok` replies across all periods
    pub fn affirmative_replies(&self) -> u64 {
        self.rounds.iter().map(|r| r.affirmative as u64).sum()
    }

    /// In-round `No` replies across all periods
    pub fn negative_replies(&self) -> u64 {
        self.rounds.iter().map(|r| r.negative as u64).sum()
    }

    /// `satisfied / periods * 100`, 0 when nothing ran
    pub fn satisfaction_percent(&self) -> f64 {
        let periods = self.periods();
        if periods == 0 {
            0.0
        } else {
            self.satisfied() as f64 / periods as f64 * 100.0
        }
    }

    /// Snapshot of the headline numbers
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            periods: self.periods(),
            satisfied: self.satisfied(),
            satisfaction_percent: self.satisfaction_percent(),
            affirmative_replies: self.affirmative_replies(),
            negative_replies: self.negative_replies(),
            stale_replies: self.stale_replies,
            malformed_datagrams: self.malformed_datagrams,
        }
    }
}

/// Headline numbers of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Periods attempted
    pub periods: u64,
    /// Periods that reached quorum
    pub satisfied: u64,
    /// Satisfied share in percent
    pub satisfaction_percent: f64,
    /// In-round `Ok` replies
    pub affirmative_replies: u64,
    /// In-round `No` replies
    pub negative_replies: u64,
    /// Out-of-round replies discarded
    pub stale_replies: u64,
    /// Unparseable datagrams discarded
    pub malformed_datagrams: u64,
}

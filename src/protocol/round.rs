//! Requester-side round state for a single period.
//!
//! A round moves through `Broadcasting → Collecting → Closed`. While
//! collecting it accepts only responses for its own period; the affirmative
//! count never decreases and is frozen once the round closes. Time is passed
//! in explicitly so the transitions are deterministic under test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::message::{Request, Response};

/// Round state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Request not yet sent, deadline not armed
    Broadcasting,
    /// Deadline armed, accepting replies for this period
    Collecting,
    /// Round scored, no further replies accepted
    Closed,
}

/// Why a round closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Affirmative count reached quorum before the deadline
    Quorum,
    /// Wait budget elapsed
    Timeout,
}

/// Effect of feeding one response into a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Reply for this period, counted. Quorum not (yet) reached.
    Counted {
        /// Affirmative count after this reply
        affirmative: usize,
    },
    /// This reply completed the quorum; the round is now closed.
    QuorumReached,
    /// Reply belongs to another period and was discarded.
    Stale {
        /// Period carried by the discarded reply
        period: u64,
    },
    /// Round is not collecting; reply had no effect.
    Ignored,
}

/// Final result of a round, folded into run metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Period identifier
    pub period: u64,
    /// `Ok` replies received for this period
    pub affirmative: usize,
    /// `No` replies received for this period
    pub negative: usize,
    /// Quorum reached at close
    pub satisfied: bool,
    /// Close cause
    pub reason: CloseReason,
    /// Time from broadcast to close
    pub elapsed: Duration,
}

/// Round state for one period
#[derive(Debug, Clone)]
pub struct Round {
    period: u64,
    quorum: usize,
    wait: Duration,
    state: RoundState,
    opened_at: Option<Instant>,
    affirmative: usize,
    negative: usize,
    closed: Option<(CloseReason, Duration)>,
}

impl Round {
    /// Create a round for `period` that needs `quorum` affirmative replies
    /// within `wait` of the broadcast.
    pub fn new(period: u64, quorum: usize, wait: Duration) -> Self {
        Self {
            period,
            quorum,
            wait,
            state: RoundState::Broadcasting,
            opened_at: None,
            affirmative: 0,
            negative: 0,
            closed: None,
        }
    }

    /// Period identifier
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Current state
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Affirmative replies counted so far
    pub fn affirmative(&self) -> usize {
        self.affirmative
    }

    /// Negative replies counted so far
    pub fn negative(&self) -> usize {
        self.negative
    }

    /// Request to broadcast for this round
    pub fn request(&self) -> Request {
        Request::new(self.period)
    }

    /// Arm the deadline. Call once the broadcast has been sent.
    pub fn begin_collecting(&mut self, now: Instant) {
        if self.state == RoundState::Broadcasting {
            self.opened_at = Some(now);
            self.state = RoundState::Collecting;
        }
    }

    /// Time left before the deadline, or `None` if the round is not
    /// collecting or the budget is spent.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.state != RoundState::Collecting {
            return None;
        }
        let elapsed = self.elapsed(now);
        if elapsed >= self.wait {
            None
        } else {
            Some(self.wait - elapsed)
        }
    }

    /// Feed one decoded response into the round.
    pub fn observe(&mut self, response: &Response, now: Instant) -> Observation {
        if self.state != RoundState::Collecting {
            return Observation::Ignored;
        }
        if response.period != self.period {
            return Observation::Stale {
                period: response.period,
            };
        }

        if response.verdict.is_affirmative() {
            self.affirmative += 1;
        } else {
            self.negative += 1;
        }

        if self.has_quorum() {
            self.close(CloseReason::Quorum, now);
            Observation::QuorumReached
        } else {
            Observation::Counted {
                affirmative: self.affirmative,
            }
        }
    }

    /// Close the round because the wait budget ran out.
    pub fn expire(&mut self, now: Instant) {
        self.close(CloseReason::Timeout, now);
    }

    /// Whether the affirmative count meets the quorum threshold.
    pub fn has_quorum(&self) -> bool {
        self.affirmative >= self.quorum
    }

    /// Scored result, available once the round is closed.
    pub fn outcome(&self) -> Option<RoundOutcome> {
        let (reason, elapsed) = self.closed?;
        Some(self.scored(reason, elapsed))
    }

    /// Close the round if still open (as a timeout) and score it.
    pub fn finish(&mut self, now: Instant) -> RoundOutcome {
        self.close(CloseReason::Timeout, now);
        let (reason, elapsed) = self
            .closed
            .unwrap_or((CloseReason::Timeout, self.elapsed(now)));
        self.scored(reason, elapsed)
    }

    fn scored(&self, reason: CloseReason, elapsed: Duration) -> RoundOutcome {
        RoundOutcome {
            period: self.period,
            affirmative: self.affirmative,
            negative: self.negative,
            satisfied: self.has_quorum(),
            reason,
            elapsed,
        }
    }

    fn close(&mut self, reason: CloseReason, now: Instant) {
        if self.state == RoundState::Closed {
            return;
        }
        self.closed = Some((reason, self.elapsed(now)));
        self.state = RoundState::Closed;
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.opened_at
            .map(|opened| now.saturating_duration_since(opened))
            .unwrap_or_default()
    }
}

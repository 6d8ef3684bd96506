//! Responder decision policies.
//!
//! A policy answers two questions for every valid request: how long to think,
//! and whether to approve, deny or stay silent. [`RandomPolicy`] draws both
//! from an RNG; [`FixedPolicy`] always gives the same answer.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::AgentId;
use crate::config::{PolicyConfig, TimingConfig};
use crate::protocol::{Request, Verdict};

/// Outcome of a responder's deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Reply `Ok_<period>`
    Approve,
    /// Reply `No_<period>`
    Deny,
    /// Send nothing
    Ignore,
}

impl Decision {
    /// Verdict to send, `None` for silence.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Approve => Some(Verdict::Ok),
            Self::Deny => Some(Verdict::No),
            Self::Ignore => None,
        }
    }

    /// Map a uniform draw in `[0, 1)` onto a decision.
    ///
    /// `[0, approve_below)` approves, `[approve_below, deny_below)` denies,
    /// the rest is silence.
    pub fn classify(draw: f64, approve_below: f64, deny_below: f64) -> Self {
        if draw < approve_below {
            Self::Approve
        } else if draw < deny_below {
            Self::Deny
        } else {
            Self::Ignore
        }
    }
}

/// Decision provider used by a responder.
pub trait DecisionPolicy: Send {
    /// Decide how to answer `request`.
    fn decide(&mut self, request: &Request) -> Decision;

    /// Delay before answering the next request.
    fn thinking_delay(&mut self) -> Duration {
        Duration::ZERO
    }
}

impl<P: DecisionPolicy + ?Sized> DecisionPolicy for Box<P> {
    fn decide(&mut self, request: &Request) -> Decision {
        (**self).decide(request)
    }

    fn thinking_delay(&mut self) -> Duration {
        (**self).thinking_delay()
    }
}

/// Probabilistic policy: 40% approve, 50% deny, 10% silence by default,
/// with a uniform thinking delay.
#[derive(Debug, Clone)]
pub struct RandomPolicy<R = StdRng> {
    rng: R,
    approve_below: f64,
    deny_below: f64,
    think: (Duration, Duration),
}

impl RandomPolicy<StdRng> {
    /// Build the policy for responder `id`.
    ///
    /// With a configured seed every responder gets a distinct, reproducible
    /// stream (`seed + id`).
    pub fn from_config(policy: &PolicyConfig, timing: &TimingConfig, id: AgentId) -> Self {
        let rng = match policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(id.0))),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, policy, timing)
    }
}

impl<R: Rng + Send> RandomPolicy<R> {
    /// Build the policy around an existing RNG.
    pub fn with_rng(rng: R, policy: &PolicyConfig, timing: &TimingConfig) -> Self {
        Self {
            rng,
            approve_below: policy.approve_below,
            deny_below: policy.deny_below,
            think: timing.think_range(),
        }
    }
}

impl<R: Rng + Send> DecisionPolicy for RandomPolicy<R> {
    fn decide(&mut self, _request: &Request) -> Decision {
        let draw: f64 = self.rng.gen();
        Decision::classify(draw, self.approve_below, self.deny_below)
    }

    fn thinking_delay(&mut self) -> Duration {
        sample_between(&mut self.rng, self.think.0, self.think.1)
    }
}

/// Deterministic policy that always gives the same decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy {
    decision: Decision,
    delay: Duration,
}

impl FixedPolicy {
    /// Always answer with `decision`, immediately.
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            delay: Duration::ZERO,
        }
    }

    /// Always approve
    pub fn approve() -> Self {
        Self::new(Decision::Approve)
    }

    /// Always deny
    pub fn deny() -> Self {
        Self::new(Decision::Deny)
    }

    /// Never reply
    pub fn silent() -> Self {
        Self::new(Decision::Ignore)
    }

    /// Think for `delay` before every decision.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl DecisionPolicy for FixedPolicy {
    fn decide(&mut self, _request: &Request) -> Decision {
        self.decision
    }

    fn thinking_delay(&mut self) -> Duration {
        self.delay
    }
}

/// Uniform duration in `[lo, hi]`; `lo` when the range is empty.
pub fn sample_between<R: Rng + ?Sized>(rng: &mut R, lo: Duration, hi: Duration) -> Duration {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

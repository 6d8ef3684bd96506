//! Requester agent.
//!
//! Drives the period loop: broadcast a request, collect replies until quorum
//! or deadline, score the round, pause, repeat.
//!
//! The deadline is enforced by checking the wall clock before every receive
//! and bounding each receive by the time left (and by the idle timeout), so a
//! round never outlives its wait budget even if no datagram ever arrives.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::decision::sample_between;
use super::metrics::Metrics;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{
    Observation, Response, Round, RoundOutcome, DEFAULT_QUORUM, MAX_DATAGRAM_SIZE,
};
use crate::transport::{recv_within, Transport};

/// Requester tuning derived from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequesterSettings {
    /// Affirmative replies needed per period
    pub quorum: usize,
    /// Wait budget per round
    pub round_wait: Duration,
    /// Upper bound on a single receive
    pub idle_timeout: Duration,
    /// Inter-period pause range
    pub pause: (Duration, Duration),
    /// Delay before the first broadcast
    pub startup_delay: Duration,
    /// Receive buffer size
    pub buffer_size: usize,
}

impl Default for RequesterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RequesterSettings {
    /// Extract the requester's view of the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            quorum: config.simulation.quorum,
            round_wait: config.timing.round_wait(),
            idle_timeout: config.timing.idle_timeout(),
            pause: config.timing.pause_range(),
            startup_delay: config.timing.startup_delay(),
            buffer_size: config.network.buffer_size,
        }
    }

    /// Zero pauses, a single wait budget for rounds and receives.
    pub fn immediate(round_wait: Duration) -> Self {
        Self {
            quorum: DEFAULT_QUORUM,
            round_wait,
            idle_timeout: round_wait,
            pause: (Duration::ZERO, Duration::ZERO),
            startup_delay: Duration::ZERO,
            buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Requester agent
pub struct Requester<T> {
    transport: T,
    targets: Vec<SocketAddr>,
    settings: RequesterSettings,
    rng: StdRng,
    metrics: Metrics,
}

impl<T: Transport> Requester<T> {
    /// Create a requester that broadcasts to `targets`.
    pub fn new(transport: T, targets: Vec<SocketAddr>, settings: RequesterSettings) -> Self {
        Self {
            transport,
            targets,
            settings,
            rng: StdRng::from_entropy(),
            metrics: Metrics::new(),
        }
    }

    /// Seed the pause sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Bound endpoint
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Metrics accumulated so far
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run periods `1..=total_periods` and return the aggregate.
    ///
    /// The random pause separates consecutive periods only; the run returns
    /// as soon as the last round closes, with no trailing pause.
    pub async fn run(mut self, total_periods: u64) -> Result<Metrics> {
        tracing::info!(
            "requester ready on {} ({}), periods to simulate: {}",
            self.transport.local_addr(),
            self.transport.name(),
            total_periods
        );

        if !self.settings.startup_delay.is_zero() {
            tokio::time::sleep(self.settings.startup_delay).await;
        }

        for period in 1..=total_periods {
            self.run_round(period).await?;

            if period < total_periods {
                let (lo, hi) = self.settings.pause;
                let pause = sample_between(&mut self.rng, lo, hi);
                tracing::info!("waiting {:.2?} before next period", pause);
                tokio::time::sleep(pause).await;
            }
        }

        let metrics = self.metrics;
        tracing::info!(
            periods = metrics.periods(),
            satisfied = metrics.satisfied(),
            "run complete: {:.1}% satisfied",
            metrics.satisfaction_percent()
        );
        Ok(metrics)
    }

    /// Run a single round for `period` and fold it into the metrics.
    pub async fn run_round(&mut self, period: u64) -> Result<RoundOutcome> {
        let mut buf = vec![0u8; self.settings.buffer_size];
        self.drain_pending(&mut buf);

        let mut round = Round::new(period, self.settings.quorum, self.settings.round_wait);
        let datagram = round.request().to_datagram(self.settings.buffer_size)?;

        tracing::info!("---- period {} start ----", period);
        let reached = self.broadcast(&datagram).await;
        round.begin_collecting(Instant::now());
        tracing::info!(
            "broadcast {} to {}/{} responders",
            round.request(),
            reached,
            self.targets.len()
        );

        loop {
            let Some(remaining) = round.remaining(Instant::now()) else {
                tracing::info!("wait budget exhausted for period {}", period);
                break;
            };

            let limit = remaining.min(self.settings.idle_timeout);
            let (len, source) = match recv_within(&self.transport, &mut buf, limit).await {
                Ok(Some(received)) => received,
                Ok(None) => {
                    tracing::info!("receive timed out for period {}", period);
                    break;
                },
                Err(e) => {
                    tracing::warn!("requester: {}", e);
                    continue;
                },
            };

            let response = match Response::decode(&buf[..len]) {
                Ok(response) => response,
                Err(e) => {
                    self.metrics.record_malformed();
                    tracing::debug!("noise from {}: {}", source, e);
                    continue;
                },
            };

            match round.observe(&response, Instant::now()) {
                Observation::Stale { .. } => {
                    self.metrics.record_stale();
                    tracing::info!(
                        "received {} from {} (stale, period {} is open)",
                        response,
                        source,
                        period
                    );
                },
                Observation::Counted { affirmative } => {
                    tracing::info!(
                        "received {} from {} ({}/{} Ok)",
                        response,
                        source,
                        affirmative,
                        self.settings.quorum
                    );
                },
                Observation::QuorumReached => {
                    tracing::info!(
                        "received {} from {}: quorum reached for period {}",
                        response,
                        source,
                        period
                    );
                    break;
                },
                Observation::Ignored => break,
            }
        }

        let outcome = round.finish(Instant::now());
        if outcome.satisfied {
            tracing::info!("period {} satisfied in {:.2?}", period, outcome.elapsed);
        } else {
            tracing::info!(
                "period {} FAILED (only {} Ok)",
                period,
                outcome.affirmative
            );
        }
        tracing::info!("---- period {} end ----", period);

        self.metrics.record_round(outcome.clone());
        Ok(outcome)
    }

    async fn broadcast(&self, datagram: &[u8]) -> usize {
        let mut reached = 0;
        for &target in &self.targets {
            match self.transport.send_to(datagram, target).await {
                Ok(_) => reached += 1,
                Err(e) => tracing::warn!("broadcast: {}", e),
            }
        }
        reached
    }

    /// Discard datagrams that queued up while no round was open.
    fn drain_pending(&mut self, buf: &mut [u8]) {
        loop {
            match self.transport.try_recv_from(buf) {
                Ok(Some((len, source))) => match Response::decode(&buf[..len]) {
                    Ok(response) => {
                        self.metrics.record_stale();
                        tracing::info!("drained late reply {} from {}", response, source);
                    },
                    Err(_) => self.metrics.record_malformed(),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("drain: {}", e);
                    break;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CloseReason;
    use crate::transport::UdpTransport;

    const WAIT: Duration = Duration::from_millis(300);

    async fn requester_with_peer() -> (Requester<UdpTransport>, UdpTransport) {
        let peer = UdpTransport::localhost("peer", 0).await.unwrap();
        let transport = UdpTransport::localhost("requester", 0).await.unwrap();
        let requester = Requester::new(
            transport,
            vec![peer.local_addr()],
            RequesterSettings::immediate(WAIT),
        );
        (requester, peer)
    }

    #[tokio::test]
    async fn test_round_broadcasts_request() {
        let (mut requester, peer) = requester_with_peer().await;
        let target = requester.local_addr();

        let peer_task = tokio::spawn(async move {
            let mut buf = [0u8; 32];
            let (len, from) = peer.recv_from(&mut buf).await.unwrap();
            assert_eq!(from, target);
            buf[..len].to_vec()
        });

        requester.run_round(1).await.unwrap();
        assert_eq!(peer_task.await.unwrap(), b"#NeedSupport_1".to_vec());
    }

    #[tokio::test]
    async fn test_round_times_out_without_replies() {
        let (mut requester, _peer) = requester_with_peer().await;

        let start = Instant::now();
        let outcome = requester.run_round(1).await.unwrap();

        assert!(!outcome.satisfied);
        assert_eq!(outcome.reason, CloseReason::Timeout);
        assert!(outcome.elapsed >= WAIT);
        assert!(start.elapsed() < WAIT + Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_idle_timeout_bounds_receive() {
        let peer = UdpTransport::localhost("peer", 0).await.unwrap();
        let transport = UdpTransport::localhost("requester", 0).await.unwrap();
        let settings = RequesterSettings {
            idle_timeout: Duration::from_millis(100),
            ..RequesterSettings::immediate(Duration::from_secs(5))
        };
        let mut requester = Requester::new(transport, vec![peer.local_addr()], settings);

        let start = Instant::now();
        let outcome = requester.run_round(1).await.unwrap();
        assert_eq!(outcome.reason, CloseReason::Timeout);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_run_counts_periods() {
        let (requester, _peer) = requester_with_peer().await;
        let metrics = requester.run(2).await.unwrap();

        assert_eq!(metrics.periods(), 2);
        assert_eq!(metrics.satisfied(), 0);
        assert_eq!(metrics.rounds()[1].period, 2);
    }

    #[tokio::test]
    async fn test_drain_discards_late_replies() {
        let (mut requester, peer) = requester_with_peer().await;
        let target = requester.local_addr();

        peer.send_to(b"Ok_7", target).await.unwrap();
        peer.send_to(b"junk", target).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let outcome = requester.run_round(8).await.unwrap();
        assert_eq!(outcome.affirmative, 0);
        assert_eq!(
            requester.metrics().stale_replies() + requester.metrics().malformed_datagrams(),
            2
        );
    }

    #[tokio::test]
    async fn test_run_skips_pause_after_last_period() {
        let peer = UdpTransport::localhost("peer", 0).await.unwrap();
        let transport = UdpTransport::localhost("requester", 0).await.unwrap();
        let mut settings = RequesterSettings::immediate(WAIT);
        settings.pause = (Duration::from_secs(10), Duration::from_secs(10));
        let requester = Requester::new(transport, vec![peer.local_addr()], settings);

        let start = Instant::now();
        let metrics = requester.run(1).await.unwrap();

        assert_eq!(metrics.periods(), 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}

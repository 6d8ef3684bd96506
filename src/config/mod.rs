//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`QUORUM_*`)
//! - CLI arguments (applied by the binary on top of the above)
//!
//! Every agent receives the values it needs at construction; nothing here is
//! read through globals.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, Result};
use crate::protocol::{max_encoded_len, DEFAULT_QUORUM, MAX_DATAGRAM_SIZE};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoints and buffer sizing
    #[serde(default)]
    pub network: NetworkConfig,

    /// Round, thinking and pacing timings
    #[serde(default)]
    pub timing: TimingConfig,

    /// Responder decision policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Run length and quorum
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            QuorumError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `QUORUM_*` environment overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(host) = env_parse("QUORUM_HOST") {
            self.network.host = host;
        }
        if let Some(port) = env_parse("QUORUM_REQUESTER_PORT") {
            self.network.requester_port = port;
        }
        if let Ok(ports) = std::env::var("QUORUM_RESPONDER_PORTS") {
            if let Ok(ports) = parse_port_list(&ports) {
                self.network.responder_ports = ports;
            }
        }
        if let Some(periods) = env_parse("QUORUM_PERIODS") {
            self.simulation.periods = periods;
        }
        if let Some(quorum) = env_parse("QUORUM_QUORUM") {
            self.simulation.quorum = quorum;
        }
        if let Some(wait) = env_parse("QUORUM_ROUND_WAIT_SECS") {
            self.timing.round_wait_secs = wait;
        }
        if let Some(seed) = env_parse("QUORUM_SEED") {
            self.policy.seed = Some(seed);
        }

        self
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.timing.validate()?;
        self.policy.validate()?;

        let sim = &self.simulation;
        if sim.periods == 0 {
            return Err(QuorumError::Config("periods must be at least 1".to_string()));
        }
        if sim.quorum == 0 {
            return Err(QuorumError::Config("quorum must be at least 1".to_string()));
        }
        if sim.quorum > self.network.responder_ports.len() {
            tracing::warn!(
                "quorum {} exceeds responder count {}: no period can be satisfied",
                sim.quorum,
                self.network.responder_ports.len()
            );
        }

        let needed = max_encoded_len(sim.periods);
        if self.network.buffer_size < needed {
            return Err(QuorumError::Config(format!(
                "buffer_size {} too small for {} periods (need {needed} bytes)",
                self.network.buffer_size, sim.periods
            )));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address every agent binds on
    pub host: IpAddr,

    /// Requester port (0 = ephemeral)
    pub requester_port: u16,

    /// One port per responder, responder ids follow list order starting at 1
    pub responder_ports: Vec<u16>,

    /// Receive buffer size in bytes
    pub buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            requester_port: 5000,
            responder_ports: vec![5001, 5002, 5003],
            buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl NetworkConfig {
    /// Requester bind address
    pub fn requester_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.requester_port)
    }

    /// Responder bind addresses, in id order
    pub fn responder_addrs(&self) -> Vec<SocketAddr> {
        self.responder_ports
            .iter()
            .map(|&port| SocketAddr::new(self.host, port))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.responder_ports.is_empty() {
            return Err(QuorumError::Config(
                "at least one responder port is required".to_string(),
            ));
        }

        let mut fixed: Vec<u16> = self
            .responder_ports
            .iter()
            .copied()
            .chain(std::iter::once(self.requester_port))
            .filter(|&port| port != 0)
            .collect();
        let total = fixed.len();
        fixed.sort_unstable();
        fixed.dedup();
        if fixed.len() != total {
            return Err(QuorumError::Config(
                "requester and responder ports must be disjoint".to_string(),
            ));
        }

        Ok(())
    }
}

/// Timing configuration (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait budget per round, measured from the broadcast
    pub round_wait_secs: f64,

    /// Upper bound on a single receive attempt
    pub idle_timeout_secs: f64,

    /// Shortest responder thinking delay
    pub think_min_secs: f64,

    /// Longest responder thinking delay
    pub think_max_secs: f64,

    /// Shortest pause between periods
    pub pause_min_secs: f64,

    /// Longest pause between periods
    pub pause_max_secs: f64,

    /// Delay before the first broadcast
    pub startup_delay_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            round_wait_secs: 3.0,
            idle_timeout_secs: 3.0,
            think_min_secs: 0.5,
            think_max_secs: 3.5,
            pause_min_secs: 2.0,
            pause_max_secs: 4.0,
            startup_delay_secs: 1.0,
        }
    }
}

impl TimingConfig {
    /// All delays set to zero except the round wait and idle timeout.
    pub fn immediate(round_wait: Duration) -> Self {
        Self {
            round_wait_secs: round_wait.as_secs_f64(),
            idle_timeout_secs: round_wait.as_secs_f64(),
            think_min_secs: 0.0,
            think_max_secs: 0.0,
            pause_min_secs: 0.0,
            pause_max_secs: 0.0,
            startup_delay_secs: 0.0,
        }
    }

    /// Multiply every timing by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            round_wait_secs: self.round_wait_secs * factor,
            idle_timeout_secs: self.idle_timeout_secs * factor,
            think_min_secs: self.think_min_secs * factor,
            think_max_secs: self.think_max_secs * factor,
            pause_min_secs: self.pause_min_secs * factor,
            pause_max_secs: self.pause_max_secs * factor,
            startup_delay_secs: self.startup_delay_secs * factor,
        }
    }

    /// Round wait budget
    pub fn round_wait(&self) -> Duration {
        secs(self.round_wait_secs)
    }

    /// Receive idle timeout
    pub fn idle_timeout(&self) -> Duration {
        secs(self.idle_timeout_secs)
    }

    /// Thinking delay range
    pub fn think_range(&self) -> (Duration, Duration) {
        (secs(self.think_min_secs), secs(self.think_max_secs))
    }

    /// Inter-period pause range
    pub fn pause_range(&self) -> (Duration, Duration) {
        (secs(self.pause_min_secs), secs(self.pause_max_secs))
    }

    /// Startup delay
    pub fn startup_delay(&self) -> Duration {
        secs(self.startup_delay_secs)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("round_wait_secs", self.round_wait_secs),
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("think_min_secs", self.think_min_secs),
            ("think_max_secs", self.think_max_secs),
            ("pause_min_secs", self.pause_min_secs),
            ("pause_max_secs", self.pause_max_secs),
            ("startup_delay_secs", self.startup_delay_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(QuorumError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.round_wait_secs == 0.0 || self.idle_timeout_secs == 0.0 {
            return Err(QuorumError::Config(
                "round_wait_secs and idle_timeout_secs must be positive".to_string(),
            ));
        }
        if self.think_min_secs > self.think_max_secs {
            return Err(QuorumError::Config(
                "think_min_secs exceeds think_max_secs".to_string(),
            ));
        }
        if self.pause_min_secs > self.pause_max_secs {
            return Err(QuorumError::Config(
                "pause_min_secs exceeds pause_max_secs".to_string(),
            ));
        }

        Ok(())
    }
}

/// Responder decision policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Draws below this value approve
    pub approve_below: f64,

    /// Draws below this value (and not approving) deny; the rest stay silent
    pub deny_below: f64,

    /// Seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            approve_below: 0.40,
            deny_below: 0.90,
            seed: None,
        }
    }
}

impl PolicyConfig {
    fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.approve_below
            && self.approve_below <= self.deny_below
            && self.deny_below <= 1.0;
        if !ordered {
            return Err(QuorumError::Config(format!(
                "policy thresholds must satisfy 0 <= approve_below ({}) <= deny_below ({}) <= 1",
                self.approve_below, self.deny_below
            )));
        }
        Ok(())
    }
}

/// Simulation run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of periods to run
    pub periods: u64,

    /// Affirmative replies needed to satisfy a period
    pub quorum: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            periods: 3,
            quorum: DEFAULT_QUORUM,
        }
    }
}

/// Parse a comma separated port list such as `5001,5002,5003`.
pub fn parse_port_list(s: &str) -> Result<Vec<u16>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>()
                .map_err(|e| QuorumError::Config(format!("Invalid port {p:?}: {e}")))
        })
        .collect()
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

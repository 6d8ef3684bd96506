//! Quorum simulation CLI binary.
//!
//! # Commands
//!
//! - `run` - Run the help-request simulation and print the final report
//! - `config` - Print the effective configuration as TOML

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quorum::{config::parse_port_list, Config, Simulation, VERSION};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(version = VERSION)]
#[command(about = "Quorum-based help-request simulation over UDP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Overrides {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of periods to simulate
    #[arg(short, long)]
    periods: Option<u64>,

    /// Affirmative replies required per period
    #[arg(short, long)]
    quorum: Option<usize>,

    /// Seed for reproducible decisions and pauses
    #[arg(short, long)]
    seed: Option<u64>,

    /// Bind host for all agents
    #[arg(long)]
    host: Option<std::net::IpAddr>,

    /// Requester port
    #[arg(long)]
    requester_port: Option<u16>,

    /// Comma separated responder ports (e.g. 5001,5002,5003)
    #[arg(long)]
    responder_ports: Option<String>,

    /// Scale every timing down by 10x
    #[arg(long)]
    fast: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            overrides,
            json,
            json_logs,
            verbose,
        } => cmd_run(&overrides, json, json_logs, verbose),
        Commands::Config { overrides } => cmd_config(&overrides),
    }
}

fn load_config(overrides: &Overrides) -> anyhow::Result<Config> {
    let mut config = match &overrides.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env();

    if let Some(periods) = overrides.periods {
        config.simulation.periods = periods;
    }
    if let Some(quorum) = overrides.quorum {
        config.simulation.quorum = quorum;
    }
    if let Some(seed) = overrides.seed {
        config.policy.seed = Some(seed);
    }
    if let Some(host) = overrides.host {
        config.network.host = host;
    }
    if let Some(port) = overrides.requester_port {
        config.network.requester_port = port;
    }
    if let Some(ports) = &overrides.responder_ports {
        config.network.responder_ports = parse_port_list(ports)?;
    }
    if overrides.fast {
        config.timing = config.timing.scaled(0.1);
    }

    config.validate()?;
    Ok(config)
}

fn cmd_run(overrides: &Overrides, json: bool, json_logs: bool, verbose: bool) -> anyhow::Result<()> {
    // Initialize logging
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = load_config(overrides)?;
    let simulation = Simulation::new(config)?;
    tracing::info!(
        "Starting simulation {}: {} responders, {} periods, quorum {}",
        simulation.run_id(),
        simulation.config().network.responder_ports.len(),
        simulation.config().simulation.periods,
        simulation.config().simulation.quorum
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(simulation.run())?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!();
        println!("{report}");
    }

    Ok(())
}

fn cmd_config(overrides: &Overrides) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_report_and_json_logs_are_independent() {
        let cli = Cli::try_parse_from(["quorum", "run", "--json-logs"]).unwrap();
        match cli.command {
            Commands::Run {
                json, json_logs, ..
            } => {
                assert!(!json);
                assert!(json_logs);
            },
            Commands::Config { .. } => panic!("Expected run command"),
        }

        let cli = Cli::try_parse_from(["quorum", "run", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                json: true,
                json_logs: false,
                ..
            }
        ));
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let cli = Cli::try_parse_from([
            "quorum",
            "config",
            "--periods",
            "5",
            "--responder-ports",
            "6001",
        ])
        .unwrap();
        let Commands::Config { overrides } = cli.command else {
            panic!("Expected config command");
        };

        let config = load_config(&overrides).unwrap();
        assert_eq!(config.simulation.periods, 5);
        assert_eq!(config.network.responder_ports, vec![6001]);
    }
}


//! meshreg CLI - Main Entry Point
//!
//! Manages networks, peers and groups in the local registry and renders
//! status, peer configs and topology maps.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use meshreg_cli::commands::{group, network, peer, report};
use meshreg_cli::{output, settings};
use meshreg_common::Registry;

/// meshreg - private mesh address and peer registry
#[derive(Parser)]
#[command(name = "meshreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Store directory (default: ~/.meshreg)
    #[arg(long, env = "MESHREG_STORE", global = true)]
    store: Option<PathBuf>,

    /// Configuration file (default: <store>/config.toml)
    #[arg(long, env = "MESHREG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show networks and peer counts
    Status,

    /// Render the configuration document for a peer
    Config {
        /// Peer name
        peer_name: String,
    },

    /// Draw the topology of a network
    Map {
        /// Network ID or name
        network: String,
    },

    /// Simulated reachability check; no packets are sent
    Ping {
        /// Peer name
        peer_name: String,
    },

    /// Manage networks
    #[command(subcommand)]
    Network(network::NetworkCommands),

    /// Manage peers
    #[command(subcommand)]
    Peer(peer::PeerCommands),

    /// Manage peer groups
    #[command(subcommand)]
    Group(group::GroupCommands),

    /// Show version information
    Version,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let (store, config) = (cli.store, cli.config);
    let open = || -> anyhow::Result<Registry> {
        let config = settings::resolve(store, config)?;
        Ok(meshreg_common::open_registry(&config)?)
    };

    match cli.command {
        Commands::Version => println!("meshreg v{}", meshreg_common::VERSION),
        Commands::Status => report::status(&open()?, format)?,
        Commands::Config { peer_name } => report::config(&open()?, &peer_name)?,
        Commands::Map { network } => report::map(&open()?, &network)?,
        Commands::Ping { peer_name } => report::ping(&open()?, &peer_name, format)?,
        Commands::Network(cmd) => network::execute(cmd, &open()?, format)?,
        Commands::Peer(cmd) => peer::execute(cmd, &open()?, format)?,
        Commands::Group(cmd) => group::execute(cmd, &open()?, format)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            let validation = e
                .downcast_ref::<meshreg_common::Error>()
                .map(meshreg_common::Error::is_validation)
                .unwrap_or(false);
            if validation {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

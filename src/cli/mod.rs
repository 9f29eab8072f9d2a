use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use daoctl::contracts::abi::U256;
use daoctl::contracts::ContractBinder;
use daoctl::governance::{GovernanceWorkflow, ProposalRepository, VoteChoice};
use daoctl::ledger::{ConnectionNegotiator, HttpWalletProvider};
use daoctl::notify::StderrNotifier;

pub mod actions;
pub mod config;
pub mod init;
pub mod proposals;
pub mod render;
pub mod status;
pub mod version;

use config::{DaoConfig, LoggingConfig, DEFAULT_RPC_URL};

#[derive(Parser)]
#[command(name = "daoctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for an NFT-gated governance DAO", long_about = None)]
pub struct Cli {
    /// Path to config file (default: <config dir>/daoctl/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print JSON instead of text (read commands)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// JSON-RPC endpoint to put in the new file
        #[arg(long, default_value = DEFAULT_RPC_URL)]
        rpc_url: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show treasury balance, proposal count and your membership balance
    Status,

    /// List all proposals
    Proposals,

    /// Show one proposal
    Proposal {
        /// Proposal ID
        id: u64,
    },

    /// Propose buying an NFT with treasury funds
    Create {
        /// Token ID of the NFT to purchase (decimal or 0x-prefixed hex)
        #[arg(long)]
        token_id: U256,
    },

    /// Vote on an open proposal
    Vote {
        /// Proposal ID
        id: u64,

        /// yay or nay
        choice: VoteChoice,
    },

    /// Execute a proposal whose deadline has passed
    Execute {
        /// Proposal ID
        id: u64,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.map(PathBuf::from);
    let json = cli.json;

    match cli.command {
        Commands::Init { rpc_url, force } => init::execute(config_path, rpc_url, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
        Commands::Status => status::execute(&load(config_path)?, json).await,
        Commands::Proposals => proposals::list(&load(config_path)?, json).await,
        Commands::Proposal { id } => proposals::show(&load(config_path)?, id, json).await,
        Commands::Create { token_id } => actions::create(&load(config_path)?, token_id).await,
        Commands::Vote { id, choice } => actions::vote(&load(config_path)?, id, choice).await,
        Commands::Execute { id } => actions::execute(&load(config_path)?, id).await,
    }
}

/// Load config, start logging and wire the workflow to the RPC endpoint.
fn load(config_path: Option<PathBuf>) -> Result<GovernanceWorkflow, Box<dyn std::error::Error>> {
    let (config, path) = DaoConfig::resolve(config_path.as_deref())?;
    init_logging(&config.logging)?;
    tracing::debug!(config = %path.display(), rpc_url = %config.network.rpc_url, "loaded config");

    let provider = Arc::new(HttpWalletProvider::new(
        config.network.rpc_url.clone(),
        config.network.account,
    ));
    let negotiator =
        ConnectionNegotiator::new(provider, config.network.chain_id(), Arc::new(StderrNotifier));
    let repository = ProposalRepository::new(negotiator, ContractBinder::new(config.contracts));

    Ok(GovernanceWorkflow::new(
        repository,
        config.transactions.policy()?,
    ))
}

/// `RUST_LOG` overrides the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| format!("Invalid log level '{}': {}", logging.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| format!("Failed to initialize logging: {}", e).into())
}

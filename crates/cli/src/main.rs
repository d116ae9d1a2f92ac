//! heatctl - shard heat engine CLI
//!
//! Computes shard temperatures offline from collector snapshots and
//! queries the latest node and shard temperatures of a running agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{compute, temperature};
use heat_lib::{temperature::DEFAULT_THRESHOLD, Dimension, HeatZone};
use std::path::PathBuf;

/// Shard heat engine CLI
#[derive(Parser)]
#[command(name = "heatctl")]
#[command(author, version, about = "CLI for the shard heat engine", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via HEATCTL_AGENT_URL env var)
    #[arg(long, env = "HEATCTL_AGENT_URL")]
    pub agent_url: Option<String>,

    /// Output format (defaults to the config file's, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute shard temperatures from a snapshot file
    Compute {
        /// Snapshot JSON holding the four collector datasets
        #[arg(long, short)]
        snapshot: PathBuf,

        /// Resource dimension (cpu, heap_alloc_rate, io_read_syscall_rate, io_write_syscall_rate)
        #[arg(long, short)]
        dimension: Dimension,

        /// Distance from the node average beyond which a shard is hot or cold
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },

    /// Show the latest node temperature of an agent
    Node {
        /// Only this dimension
        #[arg(long, short)]
        dimension: Option<Dimension>,
    },

    /// List shards tracked by an agent
    Shards {
        /// Only shards in this zone (hot, lukewarm, cold)
        #[arg(long, short)]
        zone: Option<HeatZone>,

        /// Only this dimension
        #[arg(long, short)]
        dimension: Option<Dimension>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or_default();

    let result = match cli.command {
        Commands::Compute {
            snapshot,
            dimension,
            threshold,
        } => compute::compute(&snapshot, dimension, threshold, format).await,
        Commands::Node { dimension } => {
            let client = client::ApiClient::new(&config.agent_url(cli.agent_url))?;
            temperature::show_node(&client, dimension, format).await
        }
        Commands::Shards { zone, dimension } => {
            let client = client::ApiClient::new(&config.agent_url(cli.agent_url))?;
            temperature::show_shards(&client, zone, dimension, format).await
        }
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

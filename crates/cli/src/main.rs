//! Network traffic scorer CLI
//!
//! A command-line tool for inspecting the bandwidth queries the scorer sends
//! and ranking nodes against a live Prometheus.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{query, rank};
use netscore_lib::{NetworkTrafficArgs, NormalizationStrategy};

/// Network traffic node scorer CLI
#[derive(Parser)]
#[command(name = "netscore")]
#[command(author, version, about = "Rank Kubernetes nodes by received network traffic", long_about = None)]
pub struct Cli {
    /// Prometheus endpoint URL
    #[arg(long, env = "NETSCORE_PROMETHEUS_URL", default_value = "http://localhost:9090")]
    pub prometheus_url: String,

    /// Network interface to measure
    #[arg(long, short, env = "NETSCORE_INTERFACE", default_value = "eth0")]
    pub interface: String,

    /// Window summed by the bandwidth query, in minutes
    #[arg(long, env = "NETSCORE_TIME_RANGE_MINUTES", default_value_t = 5)]
    pub time_range_minutes: i64,

    /// Normalization formula
    #[arg(long, value_enum, default_value = "legacy")]
    pub normalization: Normalization,

    /// Per-query timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Log every query and score to stderr
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Normalization {
    /// MAX - (raw - MAX / highest)
    Legacy,
    /// MAX - raw * MAX / highest, clamped
    RuleOfThree,
}

impl From<Normalization> for NormalizationStrategy {
    fn from(value: Normalization) -> Self {
        match value {
            Normalization::Legacy => NormalizationStrategy::Legacy,
            Normalization::RuleOfThree => NormalizationStrategy::RuleOfThree,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the PromQL sent for a node
    Query {
        /// Node name
        node: String,
    },

    /// Score and rank nodes in one cycle
    Rank {
        /// Candidate node names
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Maximum number of concurrent Prometheus queries (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_concurrent: usize,
    },
}

impl Cli {
    fn plugin_args(&self, max_concurrent_queries: usize) -> NetworkTrafficArgs {
        NetworkTrafficArgs {
            address: self.prometheus_url.clone(),
            network_interface: self.interface.clone(),
            time_range_in_minutes: self.time_range_minutes,
            normalization: self.normalization.into(),
            query_timeout_secs: self.timeout_secs,
            max_concurrent_queries,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter("debug")
            .init();
    }

    match &cli.command {
        Commands::Query { node } => {
            query::show_query(&cli.plugin_args(0), node, cli.format)?;
        }
        Commands::Rank {
            nodes,
            max_concurrent,
        } => {
            rank::rank_nodes(&cli.plugin_args(*max_concurrent), nodes, cli.verbose, cli.format)
                .await?;
        }
    }

    Ok(())
}

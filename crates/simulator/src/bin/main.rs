//! Layered spanning tree simulator CLI.
//!
//! Runs the protocol on a generated or file-supplied topology and prints
//! every node's final state.

use anyhow::{bail, Context};
use bfstree_simulation::{LinkOrdering, NetworkConfig};
use bfstree_simulator::{Simulator, SimulatorConfig, TopologyFile, TopologyShape};
use bfstree_types::NodeId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bfstree-sim")]
#[command(about = "Simulate layered spanning tree construction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the protocol until no message is left in flight
    Run {
        /// Number of nodes to generate
        #[arg(short, long, default_value = "16")]
        nodes: u64,

        /// Topology shape (path, ring, star, complete, grid, random, random:<extra links>)
        #[arg(long, default_value = "grid")]
        shape: TopologyShape,

        /// Read the topology from a TOML file instead of generating one
        #[arg(long, conflicts_with_all = ["nodes", "shape", "duplicate_links"])]
        topology_file: Option<PathBuf>,

        /// Root node (overrides the topology file's root)
        #[arg(long)]
        root: Option<u64>,

        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Minimum link latency in milliseconds
        #[arg(long, default_value = "1")]
        min_latency_ms: u64,

        /// Maximum link latency in milliseconds
        #[arg(long, default_value = "1000")]
        max_latency_ms: u64,

        /// Deliver every message instantly
        #[arg(long)]
        immediate: bool,

        /// Link ordering (unordered, fifo)
        #[arg(long, default_value = "unordered")]
        ordering: String,

        /// Parallel copies of random links to add, as a fraction of the link count
        #[arg(long, default_value = "0.0")]
        duplicate_links: f64,

        /// When the root wakes up, in seconds
        #[arg(long, default_value = "10")]
        trigger_at_secs: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_ordering(s: &str) -> Result<LinkOrdering, String> {
    match s.to_lowercase().as_str() {
        "fifo" => Ok(LinkOrdering::Fifo),
        "unordered" | "random" => Ok(LinkOrdering::Unordered),
        _ => Err(format!("Unknown link ordering: {}", s)),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            nodes,
            shape,
            topology_file,
            root,
            seed,
            min_latency_ms,
            max_latency_ms,
            immediate,
            ordering,
            duplicate_links,
            trigger_at_secs,
            json,
        } => {
            if !(0.0..=1.0).contains(&duplicate_links) {
                bail!("--duplicate-links must be between 0.0 and 1.0");
            }
            let ordering = parse_ordering(&ordering).map_err(anyhow::Error::msg)?;

            let network = if immediate {
                NetworkConfig::immediate()
            } else {
                NetworkConfig::default().with_latency(
                    Duration::from_millis(min_latency_ms),
                    Duration::from_millis(max_latency_ms),
                )
            }
            .with_ordering(ordering);

            let config = SimulatorConfig::new(shape, nodes)
                .with_network(network)
                .with_trigger_at(Duration::from_secs(trigger_at_secs))
                .with_seed(seed);

            let simulator = match topology_file {
                Some(path) => {
                    let file = TopologyFile::load(&path)
                        .with_context(|| format!("loading {}", path.display()))?;
                    let topology = file.to_topology()?;
                    let root = NodeId(root.unwrap_or(file.root));
                    Simulator::with_topology(config.with_root(root), topology)
                }
                None => {
                    let generated = Simulator::new(config.clone());
                    let extra = (generated.topology().link_count() as f64 * duplicate_links)
                        .round() as usize;
                    let config = config
                        .with_duplicate_links(extra)
                        .with_root(NodeId(root.unwrap_or(0)));
                    Simulator::new(config)
                }
            };

            let report = simulator.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
    }

    Ok(())
}

//! Demo harness: wires a small topology, starts every node's dispatch loop,
//! injects periodic OGMs and a `speed_test` flow, and logs what happens.
//!
//! This binary is the "harness" spec §6 describes — topology bootstrap and
//! traffic injection live here, never inside the core crate.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use meshsim::{Address, Edge, Neighbor, Node, SimConfig};

/// Run a small line-topology mesh simulation.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of nodes in the line topology (A, B, C, ...).
    #[arg(long, default_value_t = 3)]
    nodes: usize,

    /// Throughput of every edge, in bits per second.
    #[arg(long, default_value_t = 1_000_000.0)]
    throughput_bps: f64,

    /// Per-hop link quality baked into each edge's `Neighbor::packet_success`.
    #[arg(long, default_value_t = 0.98)]
    link_quality: f64,

    /// How often each node originates a fresh OGM.
    #[arg(long, default_value_t = 1.0)]
    ogm_interval_secs: f64,

    /// How often the first node sends a `speed_test` payload to the last.
    #[arg(long, default_value_t = 0.2)]
    speed_test_interval_secs: f64,

    /// Bytes per `speed_test` payload.
    #[arg(long, default_value_t = 1024)]
    payload_size: usize,

    /// How long to run the simulation before shutting down.
    #[arg(long, default_value_t = 10.0)]
    duration_secs: f64,

    /// Optional path to a TOML file overriding `SimConfig` tunables.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn load_config(path: Option<&std::path::Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn node_name(index: usize) -> String {
    ((b'A' + index as u8) as char).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if cli.nodes < 2 {
        anyhow::bail!("--nodes must be at least 2 to form a line topology");
    }

    let names: Vec<Address> = (0..cli.nodes).map(|i| Address::from(node_name(i))).collect();

    let mut nodes = Vec::with_capacity(cli.nodes);
    let mut handles = Vec::with_capacity(cli.nodes);
    for name in &names {
        let (node, handle) = Node::new(name.clone(), config);
        nodes.push(node);
        handles.push(handle);
    }

    // Wire a line: each consecutive pair gets a bidirectional edge.
    for i in 0..cli.nodes - 1 {
        let forward = Edge::new(
            format!("{}->{}", names[i], names[i + 1]),
            cli.throughput_bps,
            config.frame_overhead_bits,
            handles[i + 1].mailbox(),
        );
        let backward = Edge::new(
            format!("{}->{}", names[i + 1], names[i]),
            cli.throughput_bps,
            config.frame_overhead_bits,
            handles[i].mailbox(),
        );

        nodes[i].add_neighbor(Neighbor {
            address: names[i + 1].clone(),
            packet_success: cli.link_quality,
            edge: forward,
        });
        nodes[i + 1].add_neighbor(Neighbor {
            address: names[i].clone(),
            packet_success: cli.link_quality,
            edge: backward,
        });
    }

    info!(nodes = cli.nodes, throughput_bps = cli.throughput_bps, "starting simulation");

    let mut join_set = Vec::new();
    for node in nodes {
        join_set.push(tokio::spawn(node.run()));
    }

    let ogm_interval = Duration::from_secs_f64(cli.ogm_interval_secs);
    let mut ticker_handles = Vec::new();
    for handle in &handles {
        ticker_handles.push(handle.spawn_originator(ogm_interval));
    }

    let first = handles.first().expect("at least two nodes");
    let last = names.last().expect("at least two nodes").clone();
    ticker_handles.push(first.speed_test(
        last,
        Duration::from_secs_f64(cli.speed_test_interval_secs),
        cli.payload_size,
    ));

    tokio::time::sleep(Duration::from_secs_f64(cli.duration_secs)).await;

    for h in ticker_handles {
        h.abort();
    }
    for h in join_set {
        h.abort();
    }

    info!("simulation finished");
    Ok(())
}

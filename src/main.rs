use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use routesim::network::ChangeEvent;
use routesim::protocol::{DistanceVectorEngine, LinkStateEngine, RoutingEngine};
use routesim::report::{self, RunReport};
use routesim::scenario;
use routesim::{Message, Simulation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Protocol {
    /// Distance Vector routing
    Dvr,
    /// Link State routing
    Lsr,
}

#[derive(Parser)]
#[command(
    name = "routesim",
    about = "Simulates Distance Vector or Link State routing over a scripted topology"
)]
struct Cli {
    /// Routing algorithm to simulate
    #[arg(long, value_enum, default_value_t = Protocol::Dvr)]
    protocol: Protocol,

    /// Topology file: one `node node cost` triple per line
    topology: PathBuf,

    /// Message file: `source destination payload` per line
    messages: PathBuf,

    /// Change file: `node node cost` per line, cost -999 removes the edge
    changes: PathBuf,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit the report as JSON instead of the legacy text format
    #[arg(long)]
    json: bool,
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// The legacy control flow: converge and report once on the initial
/// topology, then re-converge and re-report after every single change.
fn replay<E: RoutingEngine>(
    mut sim: Simulation<E>,
    messages: &[Message],
    changes: &[ChangeEvent],
) -> Result<RunReport> {
    let mut report = RunReport::default();
    run_epoch(&mut sim, messages, &mut report)?;
    for change in changes {
        sim.apply_change(change)?;
        run_epoch(&mut sim, messages, &mut report)?;
    }
    report.rounds = sim.round();
    Ok(report)
}

fn run_epoch<E: RoutingEngine>(
    sim: &mut Simulation<E>,
    messages: &[Message],
    report: &mut RunReport,
) -> Result<()> {
    sim.converge().context("routing failed to converge")?;
    report.snapshots.push(sim.snapshot());
    for message in messages {
        report.deliveries.push(sim.route(message));
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let topology = scenario::parse_topology(&read_input(&cli.topology)?)
        .with_context(|| format!("invalid topology file {}", cli.topology.display()))?;
    let messages = scenario::parse_messages(&read_input(&cli.messages)?)
        .with_context(|| format!("invalid message file {}", cli.messages.display()))?;
    let changes = scenario::parse_changes(&read_input(&cli.changes)?)
        .with_context(|| format!("invalid change file {}", cli.changes.display()))?;

    info!(
        "simulating {:?} over {} nodes, {} edges, {} messages, {} changes",
        cli.protocol,
        topology.node_count(),
        topology.edge_count(),
        messages.len(),
        changes.len()
    );

    let report = match cli.protocol {
        Protocol::Dvr => {
            let engine = DistanceVectorEngine::new(&topology);
            replay(Simulation::new(topology, engine), &messages, &changes)?
        }
        Protocol::Lsr => {
            let engine = LinkStateEngine::new(&topology);
            replay(Simulation::new(topology, engine), &messages, &changes)?
        }
    };

    let rendered = if cli.json {
        report::to_json(&report).context("serializing report")?
    } else {
        report::render_epochs(&report, messages.len())
    };

    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{rendered}"),
    }

    Ok(())
}

//! Tangle Command-Line Interface
//!
//! Runs a preset circuit on an in-process cluster of ranks and reports the
//! measured outcomes.
//!
//! ```text
//! tangle 5                          # X on every qubit, one shot: 11111
//! tangle 10 --nodes 8 -c ghz -s 1000
//! TANGLE_NODES=4 tangle 6 -c hadamard -s 500 --format json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tangle_core::config::DEFAULT_MAX_MESSAGE_AMPS;
use tangle_core::{ClusterConfig, Counts, LocalCluster, PartitionedState, TangleResult};

mod circuit;
mod report;

use circuit::Circuit;

/// Tangle - distributed statevector simulation
#[derive(Parser)]
#[command(name = "tangle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of qubits in the register
    num_qubits: usize,

    /// Number of ranks to shard the state across (power of two)
    #[arg(short, long, env = "TANGLE_NODES", default_value = "1")]
    nodes: usize,

    /// Largest number of amplitudes carried by one message
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_AMPS)]
    max_message_amps: usize,

    /// Preset circuit to run before measuring
    #[arg(short, long, value_enum, default_value_t = Circuit::FlipAll)]
    circuit: Circuit,

    /// Number of measurements to take
    #[arg(short, long, default_value = "1")]
    shots: usize,

    /// Print every amplitude after the circuit runs
    #[arg(long)]
    print_state: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_thread_names(true)
        .init();

    if let Err(e) = execute(&cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn execute(cli: &Cli) -> Result<()> {
    let config = ClusterConfig::new(cli.nodes).with_max_message_amps(cli.max_message_amps);
    let cluster = LocalCluster::new(config).context("Invalid cluster configuration")?;

    info!(
        num_qubits = cli.num_qubits,
        nodes = cli.nodes,
        circuit = ?cli.circuit,
        shots = cli.shots,
        "starting simulation"
    );

    let num_qubits = cli.num_qubits;
    let circuit = cli.circuit;
    let shots = cli.shots;
    let dump = cli.print_state;

    let results = cluster.run(|env| -> TangleResult<Option<Counts>> {
        let mut state = PartitionedState::new(num_qubits, env)?;
        circuit.apply(env, &mut state)?;
        if dump {
            tangle_core::print_state(env, &state)?;
        }
        tangle_core::sample_counts(env, &state, shots)
    })?;

    let mut counts = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(result) if rank == 0 => counts = result,
            Ok(_) => {}
            // Every rank rejects bad parameters identically; report it once.
            Err(e) if e.is_configuration() => {
                return Err(anyhow::Error::new(e).context("Invalid simulation parameters"));
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("Rank {rank} failed"))),
        }
    }
    let counts = counts.context("Rank 0 returned no measurements")?;

    let report = report::Report::new(num_qubits, cli.nodes, circuit, shots, &counts);
    match cli.format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))?;
            println!("{json}");
        }
        Format::Table => report.print(),
    }

    Ok(())
}

//! Sampling a basis outcome from a sharded state.
//!
//! Rank 0 draws a residual in (0, 1] and the residual travels once around
//! the ranks in order. Each rank subtracts |amplitude|² of its resident
//! amplitudes until the residual drops to zero or below; the amplitude that
//! crosses zero is the outcome. Downstream ranks see a non-positive residual
//! and skip their scan. The rank that finds the outcome reports it to rank 0.
//!
//! Rounding can leave a sliver of residual after the last amplitude. The
//! residual message therefore also carries the global index of the last
//! non-zero amplitude seen so far, and the last rank reports that index if it
//! is still holding positive residual. Every call yields exactly one outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use crate::env::Environment;
use crate::error::{TangleError, TangleResult};
use crate::state::PartitionedState;
use crate::transport::{Message, Source, Tag, Transport};

const TAG_RESIDUAL: Tag = Tag(5);
const TAG_OUTCOME: Tag = Tag(6);

/// Outcome histogram: global basis index → number of shots.
pub type Counts = FxHashMap<u64, u64>;

/// Result of scanning one shard.
struct Scan {
    residual: f64,
    found: Option<u64>,
    fallback: Option<u64>,
}

fn scan(state: &PartitionedState, mut residual: f64, mut fallback: Option<u64>) -> Scan {
    if residual <= 0.0 {
        return Scan {
            residual,
            found: None,
            fallback,
        };
    }
    let base = state.global_offset() as u64;
    for (offset, amp) in state.resident().iter().enumerate() {
        let p = amp.norm_sqr();
        if p == 0.0 {
            continue;
        }
        let global = base + offset as u64;
        fallback = Some(global);
        residual -= p;
        if residual <= 0.0 {
            return Scan {
                residual,
                found: Some(global),
                fallback,
            };
        }
    }
    Scan {
        residual,
        found: None,
        fallback,
    }
}

/// Sample one global basis index with probability |amplitude|².
///
/// Returns `Some(index)` on rank 0 and `None` on every other rank. The state
/// is read, not collapsed. Rank 0 seeds a fresh generator for each call;
/// other ranks never touch the entropy source.
pub fn measure<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
) -> TangleResult<Option<u64>> {
    ring(env, state, || StdRng::from_entropy().r#gen())
}

/// [`measure`] drawing rank 0's residual from `rng`.
///
/// Only rank 0 consumes randomness; other ranks may pass any generator.
pub fn measure_with_rng<T: Transport, R: Rng>(
    env: &Environment<T>,
    state: &PartitionedState,
    mut rng: R,
) -> TangleResult<Option<u64>> {
    ring(env, state, || rng.r#gen())
}

/// One pass of the residual around the ranks. `draw` runs on rank 0 only.
#[instrument(skip_all, fields(rank = env.rank()))]
fn ring<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
    draw: impl FnOnce() -> f64,
) -> TangleResult<Option<u64>> {
    let rank = env.rank();
    let nodes = env.nodes();
    let transport = env.transport();

    let (residual, fallback) = if rank == 0 {
        // (0, 1]: a zero draw would select nothing.
        (1.0 - draw(), None)
    } else {
        match transport.recv(Source::Rank(rank - 1), TAG_RESIDUAL)? {
            (_, Message::Residual { residual, fallback }) => (residual, fallback),
            (sender, other) => {
                return Err(TangleError::UnexpectedMessage {
                    rank,
                    sender,
                    tag: TAG_RESIDUAL,
                    found: other.kind(),
                });
            }
        }
    };

    let Scan {
        residual,
        found,
        fallback,
    } = scan(state, residual, fallback);

    let outcome = match found {
        Some(index) => Some(index),
        None if rank == nodes - 1 && residual > 0.0 => {
            let index = fallback.unwrap_or(state.layout().global_amps() as u64 - 1);
            warn!(residual, index, "probability left over after the last shard");
            Some(index)
        }
        None => None,
    };

    if rank + 1 < nodes {
        transport.send(rank + 1, TAG_RESIDUAL, Message::Residual { residual, fallback })?;
    }

    if rank == 0 {
        let index = match outcome {
            Some(index) => index,
            None => match transport.recv(Source::Any, TAG_OUTCOME)? {
                (_, Message::Outcome(index)) => index,
                (sender, other) => {
                    return Err(TangleError::UnexpectedMessage {
                        rank,
                        sender,
                        tag: TAG_OUTCOME,
                        found: other.kind(),
                    });
                }
            },
        };
        debug!(outcome = index, "measured");
        Ok(Some(index))
    } else {
        if let Some(index) = outcome {
            debug!(outcome = index, "outcome found on this shard");
            transport.send(0, TAG_OUTCOME, Message::Outcome(index))?;
        }
        Ok(None)
    }
}

/// Measure `shots` times and tally the outcomes on rank 0.
///
/// Returns `None` on every rank but 0. Rank 0 seeds one generator on its
/// first shot and reuses it for the rest.
pub fn sample_counts<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
    shots: usize,
) -> TangleResult<Option<Counts>> {
    let mut rng: Option<StdRng> = None;
    sample_with(env, state, shots, || {
        rng.get_or_insert_with(StdRng::from_entropy).r#gen()
    })
}

/// [`sample_counts`] drawing from `rng`.
pub fn sample_counts_with_rng<T: Transport, R: Rng>(
    env: &Environment<T>,
    state: &PartitionedState,
    shots: usize,
    rng: &mut R,
) -> TangleResult<Option<Counts>> {
    sample_with(env, state, shots, || rng.r#gen())
}

fn sample_with<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
    shots: usize,
    mut draw: impl FnMut() -> f64,
) -> TangleResult<Option<Counts>> {
    let mut counts = Counts::default();
    for shot in 0..shots {
        if let Some(index) = ring(env, state, &mut draw)? {
            *counts.entry(index).or_insert(0) += 1;
        }
        if shot > 0 && shot % 1000 == 0 {
            debug!("Completed {} shots", shot);
        }
    }
    Ok(env.is_root().then_some(counts))
}

/// Render `outcome` as a bitstring with qubit 0 leftmost.
pub fn outcome_to_bitstring(outcome: u64, num_qubits: usize) -> String {
    format!("{:0width$b}", outcome, width = num_qubits)
        .chars()
        .rev()
        .collect()
}

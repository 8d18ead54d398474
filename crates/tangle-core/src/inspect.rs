//! Reading a sharded state back out.

use std::io::{self, Write};

use num_complex::Complex64;
use tracing::debug;

use crate::channel::message_size;
use crate::env::Environment;
use crate::error::TangleResult;
use crate::state::PartitionedState;
use crate::transport::{Message, Source, Tag, Transport};

const TAG_GATHER: Tag = Tag(7);

/// Write every resident amplitude as `global_index: re + iim`, one per line.
pub fn write_shard<W: Write>(state: &PartitionedState, mut out: W) -> io::Result<()> {
    let base = state.global_offset();
    for (offset, amp) in state.resident().iter().enumerate() {
        writeln!(out, "{}: {:.6} + i{:.6}", base + offset, amp.re, amp.im)?;
    }
    out.flush()
}

/// Print the whole state to stdout in global index order.
///
/// Ranks take turns, separated by barriers, so lines never interleave.
pub fn print_state<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
) -> TangleResult<()> {
    write_state(env, state, io::stdout())
}

/// [`print_state`] into `out`.
///
/// A rank whose write fails still takes part in every barrier and reports
/// the write error afterwards.
pub fn write_state<T: Transport, W: Write>(
    env: &Environment<T>,
    state: &PartitionedState,
    mut out: W,
) -> TangleResult<()> {
    let mut written = Ok(());
    for turn in 0..env.nodes() {
        if turn == env.rank() {
            written = write_shard(state, &mut out);
        }
        env.barrier()?;
    }
    Ok(written?)
}

/// Collect the full amplitude vector on rank 0.
///
/// Returns `Some(vector)` on rank 0 and `None` elsewhere. Shards travel in
/// chunks no larger than the transport's message ceiling.
pub fn gather_state<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
) -> TangleResult<Option<Vec<Complex64>>> {
    let layout = state.layout();
    let chunk = message_size(layout.node_amps, env.max_message_amps());
    let transport = env.transport();

    let gathered = if env.is_root() {
        collect_shards(env, state, chunk).map(Some)
    } else {
        state
            .resident()
            .chunks(chunk)
            .try_for_each(|block| {
                transport.send(0, TAG_GATHER, Message::Amplitudes(block.to_vec()))
            })
            .map(|()| None)
    };

    // Reached even when the gather failed, so peers are not left waiting.
    let synced = env.barrier();
    let gathered = gathered?;
    synced?;
    Ok(gathered)
}

fn collect_shards<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
    chunk: usize,
) -> TangleResult<Vec<Complex64>> {
    let layout = state.layout();
    let mut global = Vec::with_capacity(layout.global_amps());
    global.extend_from_slice(state.resident());
    for rank in 1..env.nodes() {
        for _ in 0..layout.node_amps / chunk {
            let block = env
                .transport()
                .recv_amplitudes(Source::Rank(rank), TAG_GATHER)?;
            global.extend_from_slice(&block);
        }
    }
    debug!(amplitudes = global.len(), "state gathered");
    Ok(global)
}

/// |amplitude|² for every global index, on rank 0.
pub fn probabilities<T: Transport>(
    env: &Environment<T>,
    state: &PartitionedState,
) -> TangleResult<Option<Vec<f64>>> {
    Ok(gather_state(env, state)?
        .map(|global| global.iter().map(Complex64::norm_sqr).collect()))
}

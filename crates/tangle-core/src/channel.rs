//! Chunked pairwise exchange of half-shard blocks.
//!
//! A cross-node gate moves exactly `temp_amps` amplitudes each way between
//! two ranks. The transport caps the size of a single call, so the block is
//! cut into equal power-of-two chunks and each chunk goes out as its own
//! paired send/receive. Chunks never overlap, and tags identify the exchange
//! rather than the chunk, so per-source FIFO delivery keeps them in order.

use num_complex::Complex64;
use tracing::{debug, trace};

use crate::env::Environment;
use crate::error::TangleResult;
use crate::state::PartitionedState;
use crate::transport::{Tag, Transport};

const TAG_LOW_OUT: Tag = Tag(1);
const TAG_HIGH_OUT: Tag = Tag(2);
const TAG_LOW_BACK: Tag = Tag(3);
const TAG_HIGH_BACK: Tag = Tag(4);

/// The four exchange shapes used by cross-node gates.
///
/// The lower rank of a pair issues `SendTop` then `ReceiveTop`; the upper
/// rank issues the mirrored `SendBottom` then `ReceiveBottom`. Each shape's
/// send tag is its counterpart's receive tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Resident low half out, peer's block into scratch.
    SendTop,
    /// Scratch out, peer's block into the resident low half.
    ReceiveTop,
    /// Resident high half out, peer's block into scratch.
    SendBottom,
    /// Scratch out, peer's block into the resident high half.
    ReceiveBottom,
}

/// Which side of the resident/scratch boundary a shape reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ResidentToScratch,
    ScratchToResident,
}

impl Exchange {
    /// `(direction, resident offset, send tag, receive tag)` for a shard with
    /// `temp_amps` scratch slots.
    fn shape(self, temp_amps: usize) -> (Direction, usize, Tag, Tag) {
        match self {
            Exchange::SendTop => (Direction::ResidentToScratch, 0, TAG_LOW_OUT, TAG_HIGH_OUT),
            Exchange::ReceiveTop => (Direction::ScratchToResident, 0, TAG_LOW_BACK, TAG_HIGH_BACK),
            Exchange::SendBottom => (
                Direction::ResidentToScratch,
                temp_amps,
                TAG_HIGH_OUT,
                TAG_LOW_OUT,
            ),
            Exchange::ReceiveBottom => (
                Direction::ScratchToResident,
                temp_amps,
                TAG_HIGH_BACK,
                TAG_LOW_BACK,
            ),
        }
    }
}

/// Chunk length for moving `temp_amps` amplitudes through a transport that
/// carries at most `max_message_amps` per call.
///
/// Always a power of two no larger than `temp_amps`, so the block splits
/// into equal chunks with no remainder.
pub fn message_size(temp_amps: usize, max_message_amps: usize) -> usize {
    let ceiling = if max_message_amps.is_power_of_two() {
        max_message_amps
    } else {
        // Round a stray ceiling down rather than overrun it.
        1 << max_message_amps.max(1).ilog2()
    };
    ceiling.min(temp_amps).max(1)
}

/// Swap a `temp_amps` block with `peer` according to `exchange`.
pub fn exchange<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    peer: usize,
    exchange: Exchange,
) -> TangleResult<()> {
    let temp_amps = state.layout().temp_amps;
    let (direction, offset, send_tag, recv_tag) = exchange.shape(temp_amps);
    let chunk = message_size(temp_amps, env.max_message_amps());

    let (resident, scratch) = state.regions_mut();
    let half = &mut resident[offset..offset + temp_amps];
    let (outgoing, incoming): (&[Complex64], &mut [Complex64]) = match direction {
        Direction::ResidentToScratch => (&*half, scratch),
        Direction::ScratchToResident => (&*scratch, half),
    };

    debug!(
        rank = env.rank(),
        peer,
        ?exchange,
        temp_amps,
        chunks = temp_amps / chunk,
        "pairwise exchange"
    );
    for (i, (out, inc)) in outgoing
        .chunks(chunk)
        .zip(incoming.chunks_mut(chunk))
        .enumerate()
    {
        trace!(rank = env.rank(), peer, chunk = i, len = out.len(), "exchange chunk");
        env.transport().sendrecv(peer, out, send_tag, inc, recv_tag)?;
    }
    Ok(())
}

/// Lower rank, phase one: resident low half to the peer's scratch.
pub fn send_top<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    peer: usize,
) -> TangleResult<()> {
    exchange(env, state, peer, Exchange::SendTop)
}

/// Lower rank, phase two: scratch back to the peer, results into the low half.
pub fn receive_top<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    peer: usize,
) -> TangleResult<()> {
    exchange(env, state, peer, Exchange::ReceiveTop)
}

/// Upper rank, phase one: resident high half to the peer's scratch.
pub fn send_bottom<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    peer: usize,
) -> TangleResult<()> {
    exchange(env, state, peer, Exchange::SendBottom)
}

/// Upper rank, phase two: scratch back to the peer, results into the high half.
pub fn receive_bottom<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    peer: usize,
) -> TangleResult<()> {
    exchange(env, state, peer, Exchange::ReceiveBottom)
}

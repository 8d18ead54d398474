//! Gate application over a sharded state.
//!
//! Every entry point rewrites the resident amplitudes in place and ends with
//! a full barrier, so no rank starts the next gate while a peer may still be
//! using its scratch region.
//!
//! A target qubit below `m` pairs amplitudes inside one shard and needs no
//! communication. A target at or above `m` pairs every amplitude of this
//! shard with the amplitude at the same offset on a peer rank. Each side then
//! runs a two-phase round:
//!
//! 1. swap one resident half with the peer (the lower rank sends its low
//!    half, the upper rank its high half), landing the peer's block in scratch;
//! 2. transform the pairs formed by the kept half and the scratch block,
//!    writing both results in place;
//! 3. send the scratch block back, receiving the peer's results for the half
//!    that was sent out in step 1.
//!
//! Only `node_amps / 2` amplitudes cross the wire in each direction per phase.

use num_complex::Complex64;
use tracing::{debug, instrument};

use crate::channel;
use crate::env::Environment;
use crate::error::{TangleError, TangleResult};
use crate::gate::Gate;
use crate::state::{PartitionedState, ShardLayout};
use crate::transport::Transport;

/// Which half of a cross-node pair a rank holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// This rank's amplitudes have the target bit clear.
    Lower,
    /// This rank's amplitudes have the target bit set.
    Upper,
}

/// Where the amplitude pairs of a target qubit live, as seen from one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Both halves of every pair are in this shard.
    Local,
    /// The other half of every pair is on `peer`.
    Cross {
        /// Rank holding the partner amplitudes.
        peer: usize,
        /// Which half this rank holds.
        side: Side,
    },
}

/// Decide how `rank` takes part in a gate on `target`.
pub fn route(layout: &ShardLayout, rank: usize, target: usize) -> Route {
    if layout.is_local(target) {
        return Route::Local;
    }
    let stride = 1usize << (target - layout.m);
    if rank & stride == 0 {
        Route::Cross {
            peer: rank + stride,
            side: Side::Lower,
        }
    } else {
        Route::Cross {
            peer: rank - stride,
            side: Side::Upper,
        }
    }
}

/// Per-pair update.
#[derive(Debug, Clone, Copy)]
enum Kernel {
    Full(Gate),
    SwapScale(Gate),
}

impl Kernel {
    #[inline]
    fn apply(self, zero: Complex64, one: Complex64) -> (Complex64, Complex64) {
        match self {
            Kernel::Full(gate) => gate.transform(zero, one),
            Kernel::SwapScale(gate) => gate.swap_scale(zero, one),
        }
    }
}

#[inline]
fn bit_set(index: usize, bit: usize) -> bool {
    (index >> bit) & 1 == 1
}

fn check_qubit(state: &PartitionedState, qubit: usize) -> TangleResult<()> {
    if qubit >= state.num_qubits() {
        return Err(TangleError::QubitOutOfRange {
            qubit,
            num_qubits: state.num_qubits(),
        });
    }
    Ok(())
}

fn check_control(state: &PartitionedState, control: usize, target: usize) -> TangleResult<()> {
    check_qubit(state, control)?;
    check_qubit(state, target)?;
    if control == target {
        return Err(TangleError::ControlIsTarget(target));
    }
    Ok(())
}

/// Apply `kernel` to every pair split by `target`, skipping pairs whose
/// global index has `control` clear when a control is given.
fn apply_pairs<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
    control: Option<usize>,
    kernel: Kernel,
) -> TangleResult<()> {
    let layout = *state.layout();
    let base = state.global_offset();
    let selected = |global: usize| control.is_none_or(|c| bit_set(global, c));

    let route = route(&layout, state.rank(), target);
    debug!(rank = state.rank(), target, ?control, ?route, "routing gate");

    match route {
        Route::Local => {
            let half = 1usize << target;
            let resident = state.resident_mut();
            for window in (0..layout.node_amps).step_by(half << 1) {
                for zero in window..window + half {
                    if !selected(base + zero) {
                        continue;
                    }
                    let one = zero + half;
                    (resident[zero], resident[one]) = kernel.apply(resident[zero], resident[one]);
                }
            }
        }
        Route::Cross {
            peer,
            side: Side::Lower,
        } => {
            // Keep the high half; its partners (the peer's high half) arrive in scratch.
            channel::send_top(env, state, peer)?;
            let temp = layout.temp_amps;
            let (resident, scratch) = state.regions_mut();
            for (i, (zero, one)) in resident[temp..]
                .iter_mut()
                .zip(scratch.iter_mut())
                .enumerate()
            {
                if selected(base + temp + i) {
                    (*zero, *one) = kernel.apply(*zero, *one);
                }
            }
            channel::receive_top(env, state, peer)?;
        }
        Route::Cross {
            peer,
            side: Side::Upper,
        } => {
            // Keep the low half; its partners (the peer's low half) arrive in scratch.
            channel::send_bottom(env, state, peer)?;
            let peer_base = layout.shard_start(peer);
            let temp = layout.temp_amps;
            let (resident, scratch) = state.regions_mut();
            for (i, (zero, one)) in scratch
                .iter_mut()
                .zip(resident[..temp].iter_mut())
                .enumerate()
            {
                if selected(peer_base + i) {
                    (*zero, *one) = kernel.apply(*zero, *one);
                }
            }
            channel::receive_bottom(env, state, peer)?;
        }
    }

    env.barrier()
}

/// Apply an arbitrary 2×2 `gate` to `target`.
#[instrument(skip(env, state), fields(rank = env.rank()))]
pub fn apply_general<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    check_qubit(state, target)?;
    apply_pairs(env, state, target, None, Kernel::Full(gate))
}

/// Apply a gate with `b == c == 0`.
///
/// Each amplitude is scaled by `a` or `d` depending on its own target bit,
/// so no pairing and no communication is needed for any target.
#[instrument(skip(env, state), fields(rank = env.rank()))]
pub fn apply_diagonal<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    check_qubit(state, target)?;
    let base = state.global_offset();
    for (offset, amp) in state.resident_mut().iter_mut().enumerate() {
        *amp *= if bit_set(base + offset, target) {
            gate.d
        } else {
            gate.a
        };
    }
    env.barrier()
}

/// Apply a gate with `a == d == 0`: swap each pair and scale by `b` / `c`.
#[instrument(skip(env, state), fields(rank = env.rank()))]
pub fn apply_antidiagonal<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    check_qubit(state, target)?;
    apply_pairs(env, state, target, None, Kernel::SwapScale(gate))
}

/// Apply `gate` to `target` on the pairs whose `control` bit is set.
/// Pairs with the control bit clear are left bit-for-bit untouched.
#[instrument(skip(env, state), fields(rank = env.rank()))]
pub fn apply_controlled<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    control: usize,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    check_control(state, control, target)?;
    apply_pairs(env, state, target, Some(control), Kernel::Full(gate))
}

/// Controlled form of [`apply_diagonal`].
// TODO: scale in place like apply_diagonal instead of pairing and exchanging.
pub fn apply_controlled_diagonal<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    control: usize,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    apply_controlled(env, state, control, target, gate)
}

/// Controlled form of [`apply_antidiagonal`].
// TODO: swap and scale with the SwapScale kernel instead of the full matrix.
pub fn apply_controlled_antidiagonal<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    control: usize,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    apply_controlled(env, state, control, target, gate)
}

/// Apply `gate` to `target` through the cheapest entry point its shape allows.
pub fn apply<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
    gate: Gate,
) -> TangleResult<()> {
    if gate.is_diagonal() {
        apply_diagonal(env, state, target, gate)
    } else if gate.is_antidiagonal() {
        apply_antidiagonal(env, state, target, gate)
    } else {
        apply_general(env, state, target, gate)
    }
}

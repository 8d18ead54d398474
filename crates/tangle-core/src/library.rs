//! Named gates.
//!
//! Each gate is a fixed matrix from [`Gate`] routed through the engine entry
//! point that matches its shape. Adding a gate means picking a matrix and an
//! entry point; the engine itself does not change.

use crate::engine;
use crate::env::Environment;
use crate::error::TangleResult;
use crate::gate::Gate;
use crate::state::PartitionedState;
use crate::transport::Transport;

/// Pauli-X on `target`.
pub fn x<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_antidiagonal(env, state, target, Gate::x())
}

/// Pauli-Y on `target`.
pub fn y<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_antidiagonal(env, state, target, Gate::y())
}

/// Pauli-Z on `target`.
pub fn z<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_diagonal(env, state, target, Gate::z())
}

/// Hadamard on `target`.
pub fn h<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_general(env, state, target, Gate::h())
}

/// S on `target`.
pub fn s<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_diagonal(env, state, target, Gate::s())
}

/// T on `target`.
pub fn t<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    target: usize,
) -> TangleResult<()> {
    engine::apply_diagonal(env, state, target, Gate::t())
}

/// Controlled-X (CNOT).
pub fn cx<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    control: usize,
    target: usize,
) -> TangleResult<()> {
    engine::apply_controlled_antidiagonal(env, state, control, target, Gate::x())
}

/// Controlled-Z.
pub fn cz<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    control: usize,
    target: usize,
) -> TangleResult<()> {
    engine::apply_controlled_diagonal(env, state, control, target, Gate::z())
}

/// Apply `gate` to every qubit, lowest first.
pub fn apply_all<T: Transport>(
    env: &Environment<T>,
    state: &mut PartitionedState,
    gate: Gate,
) -> TangleResult<()> {
    for target in 0..state.num_qubits() {
        engine::apply(env, state, target, gate)?;
    }
    Ok(())
}

//! Shared helpers for multi-rank integration tests.

#![allow(dead_code)]

use num_complex::Complex64;
use tangle_core::{
    ClusterConfig, Environment, LocalCluster, LocalEndpoint, PartitionedState, TangleResult,
    gather_state,
};

pub const TOLERANCE: f64 = 1e-10;

/// Run `circuit` on a fresh `num_qubits` state over `nodes` ranks and return
/// the gathered global vector.
pub fn run_gathered<F>(num_qubits: usize, nodes: usize, circuit: F) -> Vec<Complex64>
where
    F: Fn(&Environment<LocalEndpoint>, &mut PartitionedState) -> TangleResult<()> + Sync,
{
    run_gathered_with(ClusterConfig::new(nodes), num_qubits, circuit)
}

/// [`run_gathered`] with an explicit cluster configuration.
pub fn run_gathered_with<F>(config: ClusterConfig, num_qubits: usize, circuit: F) -> Vec<Complex64>
where
    F: Fn(&Environment<LocalEndpoint>, &mut PartitionedState) -> TangleResult<()> + Sync,
{
    let cluster = LocalCluster::new(config).unwrap();
    let mut results = cluster
        .run(|env| -> TangleResult<Option<Vec<Complex64>>> {
            let mut state = PartitionedState::new(num_qubits, env)?;
            circuit(env, &mut state)?;
            gather_state(env, &state)
        })
        .unwrap();
    for (rank, result) in results.iter().enumerate().skip(1) {
        assert!(matches!(result, Ok(None)), "rank {rank} returned {result:?}");
    }
    results.swap_remove(0).unwrap().unwrap()
}

/// A deterministic, non-normalised vector with distinct entries.
pub fn distinct_vector(num_qubits: usize) -> Vec<Complex64> {
    (0..1usize << num_qubits)
        .map(|i| Complex64::new(0.1 * (i + 1) as f64, -0.03 * i as f64))
        .collect()
}

pub fn assert_states_close(actual: &[Complex64], expected: &[Complex64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).norm() < TOLERANCE,
            "amplitude {i}: got {a}, expected {e}"
        );
    }
}

pub fn basis_state(num_qubits: usize, index: usize) -> Vec<Complex64> {
    let mut v = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
    v[index] = Complex64::new(1.0, 0.0);
    v
}

//! Tests for shard sizing and the initial distributed state.

mod common;

use num_complex::Complex64;

use common::{basis_state, run_gathered};
use tangle_core::{LocalCluster, PartitionedState, ShardLayout, TangleError, TangleResult};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn layout_splits_qubits_into_local_and_global() {
    let layout = ShardLayout::new(10, 8).unwrap();
    assert_eq!(layout.k, 3);
    assert_eq!(layout.m, 7);
    assert_eq!(layout.node_amps, 128);
    assert_eq!(layout.temp_amps, 64);
    assert_eq!(layout.global_amps(), 1024);
    assert!(layout.is_local(6));
    assert!(!layout.is_local(7));
}

#[test]
fn layout_locates_global_indices() {
    let layout = ShardLayout::new(5, 4).unwrap();
    assert_eq!(layout.locate(0), (0, 0));
    assert_eq!(layout.locate(9), (1, 1));
    assert_eq!(layout.locate(31), (3, 7));
    assert_eq!(layout.shard_start(2), 16);
}

#[test]
fn layout_rejects_bad_shapes() {
    assert!(matches!(ShardLayout::new(0, 1), Err(TangleError::NoQubits)));
    assert!(matches!(
        ShardLayout::new(4, 3),
        Err(TangleError::NodesNotPowerOfTwo(3))
    ));
    assert!(matches!(
        ShardLayout::new(2, 8),
        Err(TangleError::TooManyNodes { .. })
    ));
    assert!(matches!(
        ShardLayout::new(usize::BITS as usize, 1),
        Err(TangleError::TooManyQubits { .. })
    ));
}

// ---------------------------------------------------------------------------
// Initial state
// ---------------------------------------------------------------------------

#[test]
fn only_rank_zero_holds_the_initial_amplitude() {
    let cluster = LocalCluster::with_nodes(4).unwrap();
    let shards = cluster
        .run(|env| -> TangleResult<(usize, f64)> {
            let state = PartitionedState::new(4, env)?;
            Ok((state.global_offset(), state.local_norm_sqr()))
        })
        .unwrap();

    let shards: Vec<_> = shards.into_iter().map(Result::unwrap).collect();
    assert_eq!(shards, vec![(0, 1.0), (4, 0.0), (8, 0.0), (12, 0.0)]);
}

#[test]
fn gathered_initial_state_is_all_zeros_basis() {
    for nodes in [1, 2, 4, 8] {
        let state = run_gathered(4, nodes, |_, _| Ok(()));
        assert_eq!(state, basis_state(4, 0), "nodes = {nodes}");
    }
}

#[test]
fn single_qubit_on_one_node_has_two_amplitudes() {
    let state = run_gathered(1, 1, |_, _| Ok(()));
    assert_eq!(state.len(), 2);
    assert_eq!(state[0], Complex64::new(1.0, 0.0));
}

#[test]
fn scratch_is_half_a_shard() {
    let state = PartitionedState::for_rank(6, 1, 4).unwrap();
    assert_eq!(state.resident().len(), 16);
    assert_eq!(state.scratch().len(), 8);
}

#[test]
fn one_amplitude_shards_are_rejected_on_every_rank() {
    let cluster = LocalCluster::with_nodes(4).unwrap();
    let results = cluster
        .run(|env| PartitionedState::new(2, env).map(|_| ()))
        .unwrap();
    for result in results {
        assert!(matches!(
            result,
            Err(TangleError::ShardTooSmall {
                num_qubits: 2,
                nodes: 4,
                max_nodes: 2
            })
        ));
    }
}

#[test]
fn configuration_errors_are_classified() {
    let err = PartitionedState::for_rank(0, 0, 1).unwrap_err();
    assert!(err.is_configuration());
    let err = PartitionedState::for_rank(3, 0, 16).unwrap_err();
    assert!(err.is_configuration());
}

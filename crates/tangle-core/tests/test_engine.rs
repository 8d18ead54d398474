//! Tests for gate application across local and cross-node paths.

mod common;

use num_complex::Complex64;

use common::{
    assert_states_close, basis_state, distinct_vector, run_gathered, run_gathered_with,
};
use tangle_core::engine;
use tangle_core::{
    ClusterConfig, Environment, Gate, LocalCluster, LocalEndpoint, PartitionedState, TangleError,
    TangleResult, library,
};

/// Dense single-process application of `gate` to `target`, optionally
/// conditioned on `control`.
fn reference(
    input: &[Complex64],
    target: usize,
    control: Option<usize>,
    gate: Gate,
) -> Vec<Complex64> {
    let mut out = input.to_vec();
    let bit = 1usize << target;
    for zero in (0..input.len()).filter(|i| i & bit == 0) {
        if control.is_some_and(|c| (zero >> c) & 1 == 0) {
            continue;
        }
        let one = zero | bit;
        out[zero] = gate.a * input[zero] + gate.b * input[one];
        out[one] = gate.c * input[zero] + gate.d * input[one];
    }
    out
}

const NUM_QUBITS: usize = 5;
const NODE_COUNTS: [usize; 4] = [1, 2, 4, 8];

fn gates() -> Vec<Gate> {
    vec![
        Gate::x(),
        Gate::y(),
        Gate::z(),
        Gate::h(),
        Gate::s(),
        Gate::t(),
        Gate::phase(0.7),
        Gate::new(
            Complex64::new(0.6, 0.0),
            Complex64::new(0.0, 0.8),
            Complex64::new(0.0, 0.8),
            Complex64::new(0.6, 0.0),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Agreement with a dense reference
// ---------------------------------------------------------------------------

#[test]
fn apply_matches_reference_for_every_target_and_node_count() {
    let input = distinct_vector(NUM_QUBITS);
    for gate in gates() {
        for target in 0..NUM_QUBITS {
            let expected = reference(&input, target, None, gate);
            for nodes in NODE_COUNTS {
                let got = run_gathered(NUM_QUBITS, nodes, |env, state| {
                    state.load_global(&input)?;
                    engine::apply(env, state, target, gate)
                });
                assert_states_close(&got, &expected);
            }
        }
    }
}

#[test]
fn general_path_matches_specialised_paths() {
    let input = distinct_vector(NUM_QUBITS);
    for target in 0..NUM_QUBITS {
        let general_z = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_general(env, state, target, Gate::z())
        });
        let diagonal_z = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_diagonal(env, state, target, Gate::z())
        });
        assert_states_close(&general_z, &diagonal_z);

        let general_x = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_general(env, state, target, Gate::x())
        });
        let swapped_x = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_antidiagonal(env, state, target, Gate::x())
        });
        assert_states_close(&general_x, &swapped_x);
    }
}

#[test]
fn diagonal_scales_by_global_target_bit() {
    // Qubit 4 is encoded in the rank when 5 qubits span 4 nodes.
    let input = distinct_vector(NUM_QUBITS);
    let got = run_gathered(NUM_QUBITS, 4, |env, state| {
        state.load_global(&input)?;
        library::z(env, state, 4)
    });
    for (i, (g, x)) in got.iter().zip(&input).enumerate() {
        let expect = if i >= 16 { -*x } else { *x };
        assert_eq!(*g, expect, "index {i}");
    }
}

// ---------------------------------------------------------------------------
// Algebraic identities
// ---------------------------------------------------------------------------

#[test]
fn x_twice_restores_state_on_every_qubit() {
    let input = distinct_vector(NUM_QUBITS);
    for nodes in NODE_COUNTS {
        for target in 0..NUM_QUBITS {
            let got = run_gathered(NUM_QUBITS, nodes, |env, state| {
                state.load_global(&input)?;
                library::x(env, state, target)?;
                library::x(env, state, target)
            });
            assert_eq!(got, input, "nodes = {nodes}, target = {target}");
        }
    }
}

#[test]
fn h_twice_restores_state() {
    let input = distinct_vector(NUM_QUBITS);
    for target in 0..NUM_QUBITS {
        let got = run_gathered(NUM_QUBITS, 8, |env, state| {
            state.load_global(&input)?;
            library::h(env, state, target)?;
            library::h(env, state, target)
        });
        assert_states_close(&got, &input);
    }
}

#[test]
fn identity_is_a_no_op() {
    let input = distinct_vector(NUM_QUBITS);
    let got = run_gathered(NUM_QUBITS, 4, |env, state| {
        state.load_global(&input)?;
        for target in 0..NUM_QUBITS {
            engine::apply_general(env, state, target, Gate::identity())?;
        }
        Ok(())
    });
    assert_eq!(got, input);
}

#[test]
fn x_on_every_qubit_reaches_all_ones() {
    for nodes in NODE_COUNTS {
        let got = run_gathered(NUM_QUBITS, nodes, |env, state| {
            library::apply_all(env, state, Gate::x())
        });
        assert_eq!(got, basis_state(NUM_QUBITS, 31), "nodes = {nodes}");
    }
}

#[test]
fn hadamard_on_global_qubit_splits_across_ranks() {
    let got = run_gathered(3, 2, |env, state| library::h(env, state, 2));
    let amp = std::f64::consts::FRAC_1_SQRT_2;
    assert!((got[0].re - amp).abs() < 1e-12);
    assert!((got[4].re - amp).abs() < 1e-12);
    assert_eq!(got.iter().filter(|c| c.norm_sqr() > 0.0).count(), 2);
}

#[test]
fn norm_is_preserved() {
    let got = run_gathered(6, 8, |env, state| {
        library::apply_all(env, state, Gate::h())?;
        library::t(env, state, 5)?;
        library::cx(env, state, 5, 0)?;
        library::y(env, state, 3)?;
        library::cz(env, state, 1, 4)
    });
    let norm: f64 = got.iter().map(Complex64::norm_sqr).sum();
    assert!((norm - 1.0).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Controlled gates
// ---------------------------------------------------------------------------

#[test]
fn controlled_x_is_exact_permutation() {
    let input = distinct_vector(NUM_QUBITS);
    for nodes in NODE_COUNTS {
        for control in 0..NUM_QUBITS {
            for target in (0..NUM_QUBITS).filter(|&t| t != control) {
                let got = run_gathered(NUM_QUBITS, nodes, |env, state| {
                    state.load_global(&input)?;
                    library::cx(env, state, control, target)
                });
                for (g, amp) in got.iter().enumerate() {
                    let source = if (g >> control) & 1 == 1 {
                        g ^ (1 << target)
                    } else {
                        g
                    };
                    assert_eq!(
                        *amp, input[source],
                        "nodes = {nodes}, control = {control}, target = {target}, index = {g}"
                    );
                }
            }
        }
    }
}

#[test]
fn controlled_general_matches_reference() {
    let input = distinct_vector(NUM_QUBITS);
    for gate in gates() {
        for (control, target) in [(0, 4), (4, 0), (3, 4), (1, 2)] {
            let expected = reference(&input, target, Some(control), gate);
            let got = run_gathered(NUM_QUBITS, 4, |env, state| {
                state.load_global(&input)?;
                engine::apply_controlled(env, state, control, target, gate)
            });
            assert_states_close(&got, &expected);
        }
    }
}

#[test]
fn controlled_variants_agree() {
    let input = distinct_vector(NUM_QUBITS);
    for (control, target) in [(4, 1), (2, 3)] {
        let general = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_controlled(env, state, control, target, Gate::z())
        });
        let diagonal = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_controlled_diagonal(env, state, control, target, Gate::z())
        });
        assert_eq!(general, diagonal);

        let general = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_controlled(env, state, control, target, Gate::x())
        });
        let antidiagonal = run_gathered(NUM_QUBITS, 4, |env, state| {
            state.load_global(&input)?;
            engine::apply_controlled_antidiagonal(env, state, control, target, Gate::x())
        });
        assert_eq!(general, antidiagonal);
    }
}

#[test]
fn bell_pair_across_ranks() {
    let got = run_gathered(2, 2, |env, state| {
        library::h(env, state, 0)?;
        library::cx(env, state, 0, 1)
    });
    let amp = std::f64::consts::FRAC_1_SQRT_2;
    assert!((got[0].re - amp).abs() < 1e-12);
    assert!((got[3].re - amp).abs() < 1e-12);
    assert!(got[1].norm_sqr() < 1e-24 && got[2].norm_sqr() < 1e-24);
}

// ---------------------------------------------------------------------------
// Chunked exchanges
// ---------------------------------------------------------------------------

#[test]
fn tiny_message_ceiling_gives_same_result() {
    let input = distinct_vector(6);
    let circuit = |env: &Environment<LocalEndpoint>,
                   state: &mut PartitionedState|
     -> TangleResult<()> {
        state.load_global(&input)?;
        library::h(env, state, 5)?;
        library::cx(env, state, 0, 4)?;
        library::y(env, state, 3)?;
        engine::apply_controlled(env, state, 5, 2, Gate::h())
    };
    let whole = run_gathered(6, 4, circuit);
    for max in [1, 2, 4] {
        let chunked =
            run_gathered_with(ClusterConfig::new(4).with_max_message_amps(max), 6, circuit);
        assert_eq!(chunked, whole, "max_message_amps = {max}");
    }
}

// ---------------------------------------------------------------------------
// Argument checks
// ---------------------------------------------------------------------------

#[test]
fn out_of_range_qubits_are_rejected_on_every_rank() {
    let cluster = LocalCluster::with_nodes(2).unwrap();
    let results = cluster
        .run(|env| -> TangleResult<()> {
            let mut state = PartitionedState::new(3, env)?;
            library::h(env, &mut state, 3)
        })
        .unwrap();
    for result in results {
        assert!(matches!(
            result,
            Err(TangleError::QubitOutOfRange {
                qubit: 3,
                num_qubits: 3
            })
        ));
    }
}

#[test]
fn control_equal_to_target_is_rejected() {
    let cluster = LocalCluster::with_nodes(2).unwrap();
    let results = cluster
        .run(|env| -> TangleResult<()> {
            let mut state = PartitionedState::new(3, env)?;
            library::cx(env, &mut state, 2, 2)
        })
        .unwrap();
    for result in results {
        assert!(matches!(result, Err(TangleError::ControlIsTarget(2))));
    }
}

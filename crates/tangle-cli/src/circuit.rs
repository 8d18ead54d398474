//! Preset circuits selectable from the command line.

use clap::ValueEnum;
use serde::Serialize;

use tangle_core::{Environment, Gate, PartitionedState, TangleResult, Transport, library};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Circuit {
    /// X on every qubit; always measures all ones
    FlipAll,
    /// H on every qubit; uniform over all outcomes
    Hadamard,
    /// H on qubit 0 then a CX chain; measures all zeros or all ones
    Ghz,
}

impl Circuit {
    pub fn apply<T: Transport>(
        self,
        env: &Environment<T>,
        state: &mut PartitionedState,
    ) -> TangleResult<()> {
        match self {
            Circuit::FlipAll => library::apply_all(env, state, Gate::x()),
            Circuit::Hadamard => library::apply_all(env, state, Gate::h()),
            Circuit::Ghz => {
                library::h(env, state, 0)?;
                for target in 1..state.num_qubits() {
                    library::cx(env, state, target - 1, target)?;
                }
                Ok(())
            }
        }
    }
}

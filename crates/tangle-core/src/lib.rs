//! Tangle Distributed Statevector Simulator
//!
//! This crate simulates an N-qubit register by holding the full vector of
//! 2^N complex amplitudes, split evenly across a fixed set of cooperating
//! ranks. Gates and measurement behave exactly as on a single machine; the
//! shard boundary only decides whether a gate runs locally or exchanges half
//! a shard with one peer rank.
//!
//! # Components
//!
//! - [`Environment`]: rank identity and the [`Transport`] connecting ranks
//! - [`PartitionedState`]: this rank's shard plus a half-size scratch region
//! - [`channel`]: chunked, tagged pairwise exchange of amplitude blocks
//! - [`engine`]: general, diagonal, antidiagonal and controlled gate entry points
//! - [`library`]: named gates (X, Y, Z, H, S, T, CX, CZ)
//! - [`measure`](mod@measure): ring-ordered sampling of one basis outcome
//! - [`LocalCluster`]: runs one worker thread per rank inside this process
//!
//! # Memory
//!
//! | Qubits | Per-rank shard, 1 rank | Per-rank shard, 16 ranks |
//! |--------|------------------------|--------------------------|
//! | 20 | ~24 MB | ~1.5 MB |
//! | 25 | ~768 MB | ~48 MB |
//! | 30 | ~24 GB | ~1.5 GB |
//!
//! Each rank holds 1.5× its share of the vector (shard + scratch).
//!
//! # Example
//!
//! ```rust
//! use tangle_core::{LocalCluster, PartitionedState, TangleResult, library, measure};
//!
//! let cluster = LocalCluster::with_nodes(4).unwrap();
//! let outcomes = cluster
//!     .run(|env| -> TangleResult<Option<u64>> {
//!         let mut state = PartitionedState::new(5, env)?;
//!         for qubit in 0..5 {
//!             library::x(env, &mut state, qubit)?;
//!         }
//!         measure(env, &state)
//!     })
//!     .unwrap();
//!
//! // Only rank 0 reports the outcome.
//! assert_eq!(outcomes[0].as_ref().unwrap(), &Some(0b11111));
//! assert!(outcomes[1..].iter().all(|o| matches!(o, Ok(None))));
//! ```

pub mod channel;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod gate;
pub mod inspect;
pub mod library;
pub mod measure;
pub mod state;
pub mod transport;

pub use cluster::{LocalCluster, LocalEndpoint};
pub use config::ClusterConfig;
pub use env::Environment;
pub use error::{TangleError, TangleResult};
pub use gate::Gate;
pub use inspect::{gather_state, print_state, probabilities, write_state};
pub use measure::{Counts, measure, measure_with_rng, sample_counts};
pub use state::{PartitionedState, ShardLayout};
pub use transport::{Message, Source, Tag, Transport};

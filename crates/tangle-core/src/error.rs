//! Error types for the tangle crate.
//!
//! Every error is fatal for the run: a gate application or measurement is a
//! synchronized step across all ranks, so there is nothing to retry locally.
//! The split below only exists so callers can report configuration mistakes
//! differently from transport failures.

use thiserror::Error;

use crate::transport::Tag;

/// Errors produced while configuring or running a distributed simulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TangleError {
    /// A state needs at least one qubit.
    #[error("a state needs at least one qubit")]
    NoQubits,

    /// The local shard would not fit in the address space.
    #[error("{num_qubits} qubits over {nodes} nodes exceeds the addressable shard size")]
    TooManyQubits {
        /// Requested qubit count.
        num_qubits: usize,
        /// Cluster size.
        nodes: usize,
    },

    /// Node count must be a non-zero power of two.
    #[error("node count must be a power of two, got {0}")]
    NodesNotPowerOfTwo(usize),

    /// More nodes than global amplitudes.
    #[error("{nodes} nodes cannot share a {num_qubits}-qubit state")]
    TooManyNodes {
        /// Requested qubit count.
        num_qubits: usize,
        /// Cluster size.
        nodes: usize,
    },

    /// A shard of one amplitude leaves no room for the scratch region.
    #[error(
        "{num_qubits} qubits over {nodes} nodes leaves one amplitude per shard; use at most {max_nodes} nodes"
    )]
    ShardTooSmall {
        /// Requested qubit count.
        num_qubits: usize,
        /// Cluster size.
        nodes: usize,
        /// Largest usable cluster size for this qubit count.
        max_nodes: usize,
    },

    /// The per-call message ceiling must be a non-zero power of two.
    #[error("message size must be a positive power of two, got {0}")]
    InvalidMessageSize(usize),

    /// A gate referenced a qubit outside the state.
    #[error("qubit {qubit} out of range for a {num_qubits}-qubit state")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: usize,
        /// Number of qubits in the state.
        num_qubits: usize,
    },

    /// Control and target of a controlled gate coincide.
    #[error("control and target must differ, both are qubit {0}")]
    ControlIsTarget(usize),

    /// A replicated global vector has the wrong length.
    #[error("global vector has {got} amplitudes, state expects {expected}")]
    GlobalLengthMismatch {
        /// 2^num_qubits.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// A message was addressed to a rank outside the cluster.
    #[error("rank {rank} is outside a cluster of {nodes} nodes")]
    InvalidRank {
        /// Requested destination.
        rank: usize,
        /// Cluster size.
        nodes: usize,
    },

    /// The destination rank has already released its transport.
    #[error("rank {0} is no longer reachable")]
    PeerUnreachable(usize),

    /// A peer this rank was waiting on has left the run.
    #[error("rank {rank}: peer left while waiting for tag {tag}")]
    Disconnected {
        /// Rank that was blocked.
        rank: usize,
        /// Tag it was waiting for.
        tag: Tag,
    },

    /// A message with the right tag carried the wrong payload.
    #[error("rank {rank}: unexpected {found} payload from rank {sender} on tag {tag}")]
    UnexpectedMessage {
        /// Receiving rank.
        rank: usize,
        /// Sending rank.
        sender: usize,
        /// Tag of the message.
        tag: Tag,
        /// Payload kind that arrived.
        found: &'static str,
    },

    /// An amplitude block arrived with a different length than the receive buffer.
    #[error("amplitude block of {got} elements does not fit a {expected}-element buffer")]
    LengthMismatch {
        /// Receive buffer length.
        expected: usize,
        /// Received block length.
        got: usize,
    },

    /// A worker thread of the in-process cluster panicked.
    #[error("worker for rank {0} panicked")]
    WorkerPanicked(usize),

    /// Writing a state dump failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TangleError {
    /// Whether this error stems from the requested sizes or gate arguments
    /// rather than from the transport.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TangleError::NoQubits
                | TangleError::TooManyQubits { .. }
                | TangleError::NodesNotPowerOfTwo(_)
                | TangleError::TooManyNodes { .. }
                | TangleError::ShardTooSmall { .. }
                | TangleError::InvalidMessageSize(_)
                | TangleError::QubitOutOfRange { .. }
                | TangleError::ControlIsTarget(_)
                | TangleError::GlobalLengthMismatch { .. }
        )
    }
}

/// Result type for tangle operations.
pub type TangleResult<T> = Result<T, TangleError>;

//! Sharded statevector storage.
//!
//! The global vector of `2^num_qubits` amplitudes is split evenly across
//! `nodes = 2^k` ranks. The top `k` qubits pick the rank that owns an
//! amplitude; the low `m = num_qubits - k` qubits pick its offset inside that
//! rank's shard:
//!
//! ```text
//! global index = rank * node_amps + local offset
//! ```
//!
//! Each rank allocates its resident shard plus a scratch region half that
//! size, used as transit storage when a gate pairs amplitudes across ranks.

use num_complex::Complex64;
use tracing::debug;

use crate::env::Environment;
use crate::error::{TangleError, TangleResult};
use crate::transport::Transport;

/// Largest qubit count whose global indices still fit in a `usize`.
pub const MAX_QUBITS: usize = usize::BITS as usize - 2;

/// How a `num_qubits` state is divided over `nodes` ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLayout {
    /// Total qubits in the simulated system.
    pub num_qubits: usize,
    /// Number of ranks.
    pub nodes: usize,
    /// Qubits encoded in the owning rank (`log2(nodes)`).
    pub k: usize,
    /// Qubits encoded in the local offset.
    pub m: usize,
    /// Amplitudes resident on each rank (`2^m`).
    pub node_amps: usize,
    /// Scratch region size (`node_amps / 2`).
    pub temp_amps: usize,
}

impl ShardLayout {
    /// Compute the layout for `num_qubits` over `nodes` ranks.
    pub fn new(num_qubits: usize, nodes: usize) -> TangleResult<Self> {
        if num_qubits == 0 {
            return Err(TangleError::NoQubits);
        }
        if num_qubits > MAX_QUBITS {
            return Err(TangleError::TooManyQubits { num_qubits, nodes });
        }
        if !nodes.is_power_of_two() {
            return Err(TangleError::NodesNotPowerOfTwo(nodes));
        }
        let k = nodes.trailing_zeros() as usize;
        if k > num_qubits {
            return Err(TangleError::TooManyNodes { num_qubits, nodes });
        }
        let m = num_qubits - k;
        let node_amps = 1usize << m;
        Ok(Self {
            num_qubits,
            nodes,
            k,
            m,
            node_amps,
            temp_amps: node_amps / 2,
        })
    }

    /// Number of amplitudes in the whole system (`2^num_qubits`).
    pub fn global_amps(&self) -> usize {
        1usize << self.num_qubits
    }

    /// Whether `qubit` lives inside a shard.
    pub fn is_local(&self, qubit: usize) -> bool {
        qubit < self.m
    }

    /// First global index owned by `rank`.
    pub fn shard_start(&self, rank: usize) -> usize {
        rank * self.node_amps
    }

    /// Split a global index into `(rank, local offset)`.
    pub fn locate(&self, global: usize) -> (usize, usize) {
        (global >> self.m, global & (self.node_amps - 1))
    }
}

/// This rank's shard of the global amplitude vector.
///
/// The backing allocation holds `node_amps` resident amplitudes followed by
/// `temp_amps` scratch slots. The two regions are only reachable through
/// their own accessors.
#[derive(Debug, Clone)]
pub struct PartitionedState {
    layout: ShardLayout,
    rank: usize,
    amplitudes: Vec<Complex64>,
}

impl PartitionedState {
    /// Allocate this rank's shard of a `num_qubits` state initialised to
    /// |0...0⟩, then wait for every rank to do the same.
    pub fn new<T: Transport>(num_qubits: usize, env: &Environment<T>) -> TangleResult<Self> {
        let state = Self::for_rank(num_qubits, env.rank(), env.nodes())?;
        debug!(
            rank = env.rank(),
            num_qubits,
            m = state.layout.m,
            k = state.layout.k,
            node_amps = state.layout.node_amps,
            "state allocated"
        );
        env.barrier()?;
        Ok(state)
    }

    /// Allocate the shard `rank` would own, without synchronizing.
    pub fn for_rank(num_qubits: usize, rank: usize, nodes: usize) -> TangleResult<Self> {
        let layout = ShardLayout::new(num_qubits, nodes)?;
        if nodes > 1 && layout.m == 0 {
            return Err(TangleError::ShardTooSmall {
                num_qubits,
                nodes,
                max_nodes: nodes / 2,
            });
        }
        if rank >= nodes {
            return Err(TangleError::InvalidRank { rank, nodes });
        }

        let mut amplitudes = vec![Complex64::new(0.0, 0.0); layout.node_amps + layout.temp_amps];
        if rank == 0 {
            amplitudes[0] = Complex64::new(1.0, 0.0);
        }
        Ok(Self {
            layout,
            rank,
            amplitudes,
        })
    }

    /// Sizing of the distributed state.
    pub fn layout(&self) -> &ShardLayout {
        &self.layout
    }

    /// Total qubits in the simulated system.
    pub fn num_qubits(&self) -> usize {
        self.layout.num_qubits
    }

    /// Rank owning this shard.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks sharing the state.
    pub fn nodes(&self) -> usize {
        self.layout.nodes
    }

    /// Global index of local offset 0.
    pub fn global_offset(&self) -> usize {
        self.layout.shard_start(self.rank)
    }

    /// Resident amplitudes, in local offset order.
    pub fn resident(&self) -> &[Complex64] {
        &self.amplitudes[..self.layout.node_amps]
    }

    /// Mutable resident amplitudes.
    pub fn resident_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes[..self.layout.node_amps]
    }

    /// Scratch region contents.
    pub fn scratch(&self) -> &[Complex64] {
        &self.amplitudes[self.layout.node_amps..]
    }

    /// Both regions at once, for kernels that pair resident amplitudes with
    /// amplitudes received into scratch.
    pub fn regions_mut(&mut self) -> (&mut [Complex64], &mut [Complex64]) {
        self.amplitudes.split_at_mut(self.layout.node_amps)
    }

    /// Amplitude at `global`, if this rank owns it.
    pub fn amplitude(&self, global: usize) -> Option<Complex64> {
        let (owner, offset) = self.layout.locate(global);
        (owner == self.rank && global < self.layout.global_amps())
            .then(|| self.amplitudes[offset])
    }

    /// Sum of |amplitude|² over the resident shard.
    pub fn local_norm_sqr(&self) -> f64 {
        self.resident().iter().map(Complex64::norm_sqr).sum()
    }

    /// Overwrite the resident shard with this rank's slice of `global`.
    ///
    /// Every rank passes the same replicated vector; no messages are sent.
    pub fn load_global(&mut self, global: &[Complex64]) -> TangleResult<()> {
        let expected = self.layout.global_amps();
        if global.len() != expected {
            return Err(TangleError::GlobalLengthMismatch {
                expected,
                got: global.len(),
            });
        }
        let start = self.global_offset();
        let node_amps = self.layout.node_amps;
        self.resident_mut()
            .copy_from_slice(&global[start..start + node_amps]);
        Ok(())
    }
}

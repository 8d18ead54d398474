//! Process identity within a simulation.

use tracing::debug;

use crate::error::TangleResult;
use crate::transport::Transport;

/// A worker's view of the cluster: its rank, the node count, and the
/// transport connecting it to its peers.
///
/// One `Environment` exists per rank for the lifetime of a run. It is not
/// `Clone`; [`Environment::destroy`] consumes it, so teardown happens exactly
/// once.
pub struct Environment<T: Transport> {
    rank: usize,
    nodes: usize,
    transport: T,
}

impl<T: Transport> Environment<T> {
    /// Wrap an already connected transport.
    pub fn new(transport: T) -> Self {
        let rank = transport.rank();
        let nodes = transport.nodes();
        debug!(rank, nodes, "environment initialized");
        Self {
            rank,
            nodes,
            transport,
        }
    }

    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Whether this is rank 0, the only rank that reports results.
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    /// Per-call element ceiling of the underlying transport.
    pub fn max_message_amps(&self) -> usize {
        self.transport.max_message_amps()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Block until every rank arrives.
    pub fn barrier(&self) -> TangleResult<()> {
        self.transport.barrier()
    }

    /// Synchronize with every rank one last time and release the transport.
    pub fn destroy(self) -> TangleResult<()> {
        self.transport.barrier()?;
        debug!(rank = self.rank, "environment destroyed");
        Ok(())
    }
}

//! Cluster configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TangleError, TangleResult};

/// Largest amplitude count a single exchange call may carry by default.
pub const DEFAULT_MAX_MESSAGE_AMPS: usize = 1 << 29;

/// Shape of an in-process cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of ranks. Must be a power of two.
    pub nodes: usize,
    /// Per-call element ceiling of the transport. Must be a power of two.
    #[serde(default = "default_max_message_amps")]
    pub max_message_amps: usize,
}

fn default_max_message_amps() -> usize {
    DEFAULT_MAX_MESSAGE_AMPS
}

impl ClusterConfig {
    /// Configuration for `nodes` ranks with the default message ceiling.
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            max_message_amps: DEFAULT_MAX_MESSAGE_AMPS,
        }
    }

    /// Set the number of ranks.
    #[must_use]
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the per-call element ceiling.
    #[must_use]
    pub fn with_max_message_amps(mut self, max_message_amps: usize) -> Self {
        self.max_message_amps = max_message_amps;
        self
    }

    /// Check that both sizes are non-zero powers of two.
    pub fn validate(&self) -> TangleResult<()> {
        if !self.nodes.is_power_of_two() {
            return Err(TangleError::NodesNotPowerOfTwo(self.nodes));
        }
        if !self.max_message_amps.is_power_of_two() {
            return Err(TangleError::InvalidMessageSize(self.max_message_amps));
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

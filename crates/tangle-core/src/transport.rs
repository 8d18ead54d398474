//! Point-to-point messaging between ranks.
//!
//! The simulator only ever needs four primitives from the runtime that
//! connects its workers: a buffered tagged send, a matching blocking receive,
//! a paired exchange of amplitude blocks, and a full barrier. [`Transport`]
//! captures exactly that, so the gate engine and measurement never see how
//! ranks are actually wired together. [`crate::cluster::LocalCluster`] is the
//! in-process implementation.

use std::fmt;

use num_complex::Complex64;

use crate::error::{TangleError, TangleResult};

/// Message tag. Receives only match messages carrying the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which sender a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Only messages from this rank.
    Rank(usize),
    /// The first matching message from any rank.
    Any,
}

impl Source {
    /// Whether a message from `rank` satisfies this source.
    pub fn accepts(self, rank: usize) -> bool {
        match self {
            Source::Rank(r) => r == rank,
            Source::Any => true,
        }
    }
}

/// Payloads exchanged between ranks.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A contiguous block of amplitudes.
    Amplitudes(Vec<Complex64>),
    /// Leftover probability mass threaded through the measurement ring.
    Residual {
        /// Probability mass not yet consumed by earlier ranks.
        residual: f64,
        /// Global index of the last non-zero amplitude scanned so far.
        fallback: Option<u64>,
    },
    /// A sampled global basis index.
    Outcome(u64),
}

impl Message {
    /// Short payload name for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Amplitudes(_) => "amplitudes",
            Message::Residual { .. } => "residual",
            Message::Outcome(_) => "outcome",
        }
    }
}

/// Messaging runtime connecting the ranks of one simulation.
///
/// `send` must be buffered: it returns without waiting for the matching
/// receive. Messages from one source with one tag are delivered in the order
/// they were sent. Implementations with rendezvous semantics must override
/// [`Transport::sendrecv`], because the default relies on buffering to stay
/// deadlock-free.
pub trait Transport {
    /// This worker's rank in `0..nodes()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the cluster.
    fn nodes(&self) -> usize;

    /// Largest number of amplitudes a single `sendrecv` may carry.
    fn max_message_amps(&self) -> usize;

    /// Queue `message` for `dest`.
    fn send(&self, dest: usize, tag: Tag, message: Message) -> TangleResult<()>;

    /// Block until a message with `tag` from `source` arrives.
    /// Returns the sender's rank along with the payload.
    fn recv(&self, source: Source, tag: Tag) -> TangleResult<(usize, Message)>;

    /// Block until every rank has called `barrier`.
    fn barrier(&self) -> TangleResult<()>;

    /// Send `outgoing` to `peer` under `send_tag` and fill `incoming` with
    /// the block `peer` sends under `recv_tag`.
    fn sendrecv(
        &self,
        peer: usize,
        outgoing: &[Complex64],
        send_tag: Tag,
        incoming: &mut [Complex64],
        recv_tag: Tag,
    ) -> TangleResult<()> {
        self.send(peer, send_tag, Message::Amplitudes(outgoing.to_vec()))?;
        let block = self.recv_amplitudes(Source::Rank(peer), recv_tag)?;
        if block.len() != incoming.len() {
            return Err(TangleError::LengthMismatch {
                expected: incoming.len(),
                got: block.len(),
            });
        }
        incoming.copy_from_slice(&block);
        Ok(())
    }

    /// Receive an amplitude block, rejecting any other payload.
    fn recv_amplitudes(&self, source: Source, tag: Tag) -> TangleResult<Vec<Complex64>> {
        match self.recv(source, tag)? {
            (_, Message::Amplitudes(block)) => Ok(block),
            (from, other) => Err(TangleError::UnexpectedMessage {
                rank: self.rank(),
                sender: from,
                tag,
                found: other.kind(),
            }),
        }
    }
}

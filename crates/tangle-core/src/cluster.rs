//! In-process cluster: one worker thread per rank.
//!
//! Each rank gets its own [`Environment`] and runs the same closure (SPMD).
//! Ranks share nothing but the channels between them, so every cross-shard
//! effect, barriers included, goes through explicit messages.
//!
//! A rank leaves the run when its endpoint is dropped: after a normal
//! teardown, after returning an error, or while unwinding from a panic. The
//! endpoint announces its departure to every peer, and a peer blocked on the
//! departed rank fails with [`TangleError::Disconnected`] instead of waiting
//! forever.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace, warn};

use crate::config::ClusterConfig;
use crate::env::Environment;
use crate::error::{TangleError, TangleResult};
use crate::transport::{Message, Source, Tag, Transport};

/// Reported as the awaited tag when a barrier is interrupted.
const TAG_BARRIER: Tag = Tag(0);

enum Payload {
    Message { tag: Tag, message: Message },
    /// Arrival at a barrier (to rank 0) or release from it (from rank 0).
    Barrier,
    /// The sender's endpoint has been dropped.
    Departed,
}

struct Envelope {
    source: usize,
    payload: Payload,
}

/// What a blocked endpoint is waiting for.
#[derive(Debug, Clone, Copy)]
enum Expect {
    Message(Tag),
    Barrier,
}

impl Expect {
    fn matches(self, envelope: &Envelope, source: Source) -> bool {
        source.accepts(envelope.source)
            && match (self, &envelope.payload) {
                (Expect::Message(tag), Payload::Message { tag: t, .. }) => *t == tag,
                (Expect::Barrier, Payload::Barrier) => true,
                _ => false,
            }
    }

    fn tag(self) -> Tag {
        match self {
            Expect::Message(tag) => tag,
            Expect::Barrier => TAG_BARRIER,
        }
    }
}

/// One rank's end of the in-process cluster.
///
/// Holds senders to every other rank but none to itself. Dropping it tells
/// every peer that this rank is gone.
pub struct LocalEndpoint {
    rank: usize,
    nodes: usize,
    max_message_amps: usize,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    /// Arrived messages no receive has matched yet.
    pending: RefCell<VecDeque<Envelope>>,
    /// Peers that have announced their departure.
    departed: RefCell<Vec<bool>>,
}

impl LocalEndpoint {
    fn post(&self, dest: usize, payload: Payload) -> TangleResult<()> {
        let envelope = Envelope {
            source: self.rank,
            payload,
        };
        if dest == self.rank {
            self.pending.borrow_mut().push_back(envelope);
            return Ok(());
        }
        let sender = self
            .peers
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(TangleError::InvalidRank {
                rank: dest,
                nodes: self.nodes,
            })?;
        sender
            .send(envelope)
            .map_err(|_| TangleError::PeerUnreachable(dest))
    }

    fn has_departed(&self, source: Source) -> bool {
        let departed = self.departed.borrow();
        match source {
            Source::Rank(rank) => departed.get(rank).copied().unwrap_or(false),
            Source::Any => departed.iter().any(|&gone| gone),
        }
    }

    /// Block until an envelope matching `expect` arrives from `source`.
    fn take(&self, source: Source, expect: Expect) -> TangleResult<Envelope> {
        let disconnected = || TangleError::Disconnected {
            rank: self.rank,
            tag: expect.tag(),
        };

        let mut pending = self.pending.borrow_mut();
        if let Some(pos) = pending.iter().position(|e| expect.matches(e, source)) {
            if let Some(envelope) = pending.remove(pos) {
                return Ok(envelope);
            }
        }
        if self.has_departed(source) {
            return Err(disconnected());
        }

        loop {
            let envelope = self.inbox.recv().map_err(|_| disconnected())?;
            if let Payload::Departed = envelope.payload {
                debug!(rank = self.rank, peer = envelope.source, "peer departed");
                if let Some(gone) = self.departed.borrow_mut().get_mut(envelope.source) {
                    *gone = true;
                }
                if source.accepts(envelope.source) {
                    return Err(disconnected());
                }
                continue;
            }
            if expect.matches(&envelope, source) {
                return Ok(envelope);
            }
            pending.push_back(envelope);
        }
    }
}

impl Transport for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn nodes(&self) -> usize {
        self.nodes
    }

    fn max_message_amps(&self) -> usize {
        self.max_message_amps
    }

    fn send(&self, dest: usize, tag: Tag, message: Message) -> TangleResult<()> {
        trace!(from = self.rank, to = dest, %tag, "send");
        self.post(dest, Payload::Message { tag, message })
    }

    fn recv(&self, source: Source, tag: Tag) -> TangleResult<(usize, Message)> {
        let envelope = self.take(source, Expect::Message(tag))?;
        trace!(rank = self.rank, from = envelope.source, %tag, "recv");
        match envelope.payload {
            Payload::Message { message, .. } => Ok((envelope.source, message)),
            _ => Err(TangleError::UnexpectedMessage {
                rank: self.rank,
                sender: envelope.source,
                tag,
                found: "control",
            }),
        }
    }

    /// Gather at rank 0, then release every other rank.
    fn barrier(&self) -> TangleResult<()> {
        let left = |_: TangleError| TangleError::Disconnected {
            rank: self.rank,
            tag: TAG_BARRIER,
        };
        if self.rank == 0 {
            for peer in 1..self.nodes {
                self.take(Source::Rank(peer), Expect::Barrier)?;
            }
            for peer in 1..self.nodes {
                self.post(peer, Payload::Barrier).map_err(left)?;
            }
        } else {
            self.post(0, Payload::Barrier).map_err(left)?;
            self.take(Source::Rank(0), Expect::Barrier)?;
        }
        Ok(())
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        for sender in self.peers.iter().flatten() {
            // A peer that already left has dropped its inbox; nothing to tell it.
            let _ = sender.send(Envelope {
                source: self.rank,
                payload: Payload::Departed,
            });
        }
    }
}

/// A fixed set of ranks running inside the current process.
#[derive(Debug, Clone)]
pub struct LocalCluster {
    config: ClusterConfig,
}

impl LocalCluster {
    /// Validate `config` and prepare a cluster of that shape.
    pub fn new(config: ClusterConfig) -> TangleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Cluster of `nodes` ranks with the default message ceiling.
    pub fn with_nodes(nodes: usize) -> TangleResult<Self> {
        Self::new(ClusterConfig::new(nodes))
    }

    /// The cluster's configuration.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Wire up one endpoint per rank, in rank order.
    pub fn endpoints(&self) -> Vec<LocalEndpoint> {
        let nodes = self.config.nodes;
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..nodes).map(|_| unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalEndpoint {
                rank,
                nodes,
                max_message_amps: self.config.max_message_amps,
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                    .collect(),
                inbox,
                pending: RefCell::new(VecDeque::new()),
                departed: RefCell::new(vec![false; nodes]),
            })
            .collect()
    }

    /// Run `f` once on every rank and collect each rank's result in rank
    /// order.
    ///
    /// A rank that returns `Ok` synchronizes with the others in
    /// [`Environment::destroy`]. A rank that returns `Err` leaves at once,
    /// so peers still waiting on it fail with
    /// [`TangleError::Disconnected`] instead of blocking. A panicking rank
    /// leaves the same way and the whole run reports
    /// [`TangleError::WorkerPanicked`].
    pub fn run<F, R>(&self, f: F) -> TangleResult<Vec<TangleResult<R>>>
    where
        F: Fn(&Environment<LocalEndpoint>) -> TangleResult<R> + Sync,
        R: Send,
    {
        let endpoints = self.endpoints();
        debug!(
            nodes = self.config.nodes,
            max_message_amps = self.config.max_message_amps,
            "launching local cluster"
        );

        thread::scope(|scope| {
            let f = &f;
            let mut handles = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                let rank = endpoint.rank;
                let handle = thread::Builder::new()
                    .name(format!("tangle-rank-{rank}"))
                    .spawn_scoped(scope, move || {
                        let env = Environment::new(endpoint);
                        match f(&env) {
                            Ok(output) => {
                                if let Err(e) = env.destroy() {
                                    warn!(rank, error = %e, "peers left before teardown");
                                }
                                Ok(output)
                            }
                            Err(e) => {
                                warn!(rank, error = %e, "rank failed, leaving the run");
                                Err(e)
                            }
                        }
                    })?;
                handles.push((rank, handle));
            }

            // Join every rank before reporting, so no panicked thread is left
            // for the scope to re-raise.
            let joined: Vec<_> = handles
                .into_iter()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| TangleError::WorkerPanicked(rank))
                })
                .collect();
            joined.into_iter().collect()
        })
    }
}

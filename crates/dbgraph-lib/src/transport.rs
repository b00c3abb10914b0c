//! Worker groups and the all-to-all exchange primitive
//!
//! The node index only needs a handful of collective operations from its
//! transport, captured by [`WorkerGroup`]. Two implementations ship with the
//! crate:
//!
//! - [`SoloGroup`]: a single worker owning every shard, no communication.
//! - [`LocalGroup`]: workers on threads of one process, wired pairwise by
//!   unbounded crossbeam channels.
//!
//! Every collective must be entered by all workers in the same order. Each
//! ordered pair of workers has its own FIFO channel, so the frames of
//! successive rounds can never be confused even when one worker runs ahead.

use crate::index::NodeMessage;
use crossbeam::channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error};

/// Failures of the transport. Any of them is fatal to the whole build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A peer went away (crashed or dropped its endpoint) mid-collective
    #[error("worker {rank} disconnected during exchange")]
    PeerDisconnected {
        /// Rank of the unreachable worker
        rank: usize,
    },
    /// A peer sent something the protocol does not allow at this point
    #[error("protocol violation by worker {rank}: {reason}")]
    ProtocolViolation {
        /// Rank of the offending worker
        rank: usize,
        /// What was wrong
        reason: String,
    },
    /// A peer aborted the build
    #[error("worker {rank} aborted the build: {reason}")]
    Aborted {
        /// Rank of the aborting worker
        rank: usize,
        /// Reason given by the aborting worker
        reason: String,
    },
    /// The caller passed the wrong number of outgoing batches
    #[error("exchange needs one outgoing batch per worker: expected {expected}, got {actual}")]
    BatchCount {
        /// Number of workers in the group
        expected: usize,
        /// Number of batches supplied
        actual: usize,
    },
}

/// A fixed group of workers that build one index together
pub trait WorkerGroup {
    /// This worker's rank in `0..size()`
    fn rank(&self) -> usize;

    /// Number of workers; stable for the lifetime of the group
    fn size(&self) -> usize;

    /// Collective all-to-all delivery.
    ///
    /// `outgoing[r]` is delivered to worker `r` (including this worker's own
    /// slot). Returns the batches addressed to this worker, indexed by sender
    /// rank. Blocks until every peer's batch has arrived.
    fn exchange(
        &self,
        outgoing: Vec<Vec<NodeMessage>>,
    ) -> Result<Vec<Vec<NodeMessage>>, TransportError>;

    /// Collective logical AND of one flag per worker
    fn all_reduce_and(&self, flag: bool) -> Result<bool, TransportError>;

    /// Tell every peer the build is over. Peers blocked in a collective fail
    /// with [`TransportError::Aborted`].
    fn abort(&self, reason: &str);
}

/// The degenerate group of one worker
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl WorkerGroup for SoloGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(
        &self,
        outgoing: Vec<Vec<NodeMessage>>,
    ) -> Result<Vec<Vec<NodeMessage>>, TransportError> {
        if outgoing.len() != 1 {
            return Err(TransportError::BatchCount { expected: 1, actual: outgoing.len() });
        }
        Ok(outgoing)
    }

    fn all_reduce_and(&self, flag: bool) -> Result<bool, TransportError> {
        Ok(flag)
    }

    fn abort(&self, reason: &str) {
        error!("Build aborted: {}", reason);
    }
}

/// Unit of communication between two local workers
enum Frame {
    Nodes(Vec<NodeMessage>),
    Vote(bool),
    Abort(String),
}

impl Frame {
    fn kind(&self) -> &'static str {
        match self {
            Frame::Nodes(_) => "node batch",
            Frame::Vote(_) => "termination vote",
            Frame::Abort(_) => "abort",
        }
    }
}

/// One worker's endpoint in a group of threads within this process
///
/// Dropping a `LocalGroup` (including by panicking) disconnects its channels,
/// which turns any peer's pending collective into
/// [`TransportError::PeerDisconnected`] instead of a hang.
pub struct LocalGroup {
    rank: usize,
    /// `senders[r]` delivers to worker `r`
    senders: Vec<Sender<Frame>>,
    /// `receivers[r]` carries frames sent by worker `r`
    receivers: Vec<Receiver<Frame>>,
}

impl LocalGroup {
    /// Wire up `size` endpoints, one per worker, indexed by rank
    pub fn fabric(size: usize) -> Vec<LocalGroup> {
        let mut senders: Vec<Vec<Sender<Frame>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Receiver<Frame>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = unbounded();
                senders[from].push(tx);
                receivers[to].push(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalGroup { rank, senders, receivers })
            .collect()
    }

    fn send_to(&self, to: usize, frame: Frame) -> Result<(), TransportError> {
        self.senders[to]
            .send(frame)
            .map_err(|_| TransportError::PeerDisconnected { rank: to })
    }

    fn recv_from(&self, from: usize) -> Result<Frame, TransportError> {
        match self.receivers[from].recv() {
            Ok(Frame::Abort(reason)) => Err(TransportError::Aborted { rank: from, reason }),
            Ok(frame) => Ok(frame),
            Err(_) => Err(TransportError::PeerDisconnected { rank: from }),
        }
    }
}

impl WorkerGroup for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn exchange(
        &self,
        outgoing: Vec<Vec<NodeMessage>>,
    ) -> Result<Vec<Vec<NodeMessage>>, TransportError> {
        let size = self.size();
        if outgoing.len() != size {
            return Err(TransportError::BatchCount { expected: size, actual: outgoing.len() });
        }

        for (to, batch) in outgoing.into_iter().enumerate() {
            self.send_to(to, Frame::Nodes(batch))?;
        }

        let mut incoming = Vec::with_capacity(size);
        for from in 0..size {
            match self.recv_from(from)? {
                Frame::Nodes(batch) => incoming.push(batch),
                other => {
                    return Err(TransportError::ProtocolViolation {
                        rank: from,
                        reason: format!("expected a node batch, got a {}", other.kind()),
                    })
                }
            }
        }
        debug!(
            "worker {}: exchange received {} tuples",
            self.rank,
            incoming.iter().map(Vec::len).sum::<usize>()
        );
        Ok(incoming)
    }

    fn all_reduce_and(&self, flag: bool) -> Result<bool, TransportError> {
        for to in 0..self.size() {
            self.send_to(to, Frame::Vote(flag))?;
        }

        let mut all = true;
        for from in 0..self.size() {
            match self.recv_from(from)? {
                Frame::Vote(vote) => all &= vote,
                other => {
                    return Err(TransportError::ProtocolViolation {
                        rank: from,
                        reason: format!("expected a termination vote, got a {}", other.kind()),
                    })
                }
            }
        }
        Ok(all)
    }

    fn abort(&self, reason: &str) {
        error!("worker {}: aborting build: {}", self.rank, reason);
        for (to, sender) in self.senders.iter().enumerate() {
            if to != self.rank {
                // The peer may already be gone; nothing left to tell it
                let _ = sender.send(Frame::Abort(reason.to_string()));
            }
        }
    }
}

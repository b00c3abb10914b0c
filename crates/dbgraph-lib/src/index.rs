//! Distributed node index: canonical k-mer -> edge-presence record
//!
//! Every worker owns one [`NodeShard`], the slice of the key space that the
//! [`HashPolicy`] assigns to its rank. Construction proceeds in lockstep
//! rounds:
//!
//! 1. Each worker inserts k-mers from its reads. Inserts owned by the local
//!    shard are merged immediately, the rest are buffered per destination.
//! 2. All workers call [`DistributedIndex::exchange_and_merge`]; buffered
//!    tuples travel to their owners and are OR-merged there.
//!
//! Because merging is a bitwise OR, the final record of a k-mer does not
//! depend on read order, batching or the number of workers. Once every
//! worker calls [`DistributedIndex::finish`], the shard is frozen into a
//! read-only [`CompletedIndex`].

use crate::canonical::{CanonicalizationPolicy, LexLess, Orientation};
use crate::constants::DEFAULT_SEED;
use crate::encoding::{Alphabet, Dna};
use crate::error::GraphError;
use crate::extractor::KmerOccurrence;
use crate::hasher::{table_state, DeterministicHasher, HashPolicy};
use crate::kmer::{Kmer, KmerCodec};
use crate::record::EdgeRecord;
use crate::transport::{TransportError, WorkerGroup};
use ahash::RandomState;
use rayon::prelude::*;
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Minimum occurrences per rayon task when routing a batch
const ROUTE_MIN_LEN: usize = 4096;

/// A (canonical k-mer, record) tuple addressed to the k-mer's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMessage {
    /// Canonical k-mer
    pub kmer: Kmer,
    /// Record bits to OR into the owner's node
    pub record: EdgeRecord,
}

impl NodeMessage {
    /// Create a message
    pub fn new(kmer: Kmer, record: EdgeRecord) -> Self {
        Self { kmer, record }
    }
}

/// Sharding and canonicalization strategies shared by all workers.
///
/// All workers of a build must use equivalent policies, otherwise the same
/// k-mer could be keyed or owned differently on two workers.
#[derive(Clone)]
pub struct IndexPolicies {
    /// Maps a canonical k-mer to its owning shard
    pub hash: Arc<dyn HashPolicy>,
    /// Chooses the canonical strand
    pub canonical: Arc<dyn CanonicalizationPolicy>,
}

impl IndexPolicies {
    /// Compose policies
    pub fn new(hash: Arc<dyn HashPolicy>, canonical: Arc<dyn CanonicalizationPolicy>) -> Self {
        Self { hash, canonical }
    }

    /// Seeded ahash ownership with min(k-mer, reverse complement) keys
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Arc::new(DeterministicHasher::new(seed)), Arc::new(LexLess))
    }
}

impl Default for IndexPolicies {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl fmt::Debug for IndexPolicies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexPolicies").finish_non_exhaustive()
    }
}

/// Canonical key and strand-corrected record for one observation.
///
/// When the reverse complement is canonical, the observation is read on the
/// opposite strand: the successor becomes the (complemented) predecessor and
/// vice versa.
#[inline]
pub fn canonical_message<A: Alphabet>(
    codec: &KmerCodec<A>,
    policy: &dyn CanonicalizationPolicy,
    kmer: Kmer,
    predecessor: Option<u8>,
    successor: Option<u8>,
) -> NodeMessage {
    let (canonical, orientation) = policy.canonicalize(kmer, codec.reverse_complement(kmer));
    let record = match orientation {
        Orientation::Forward => EdgeRecord::from_extensions(predecessor, successor),
        Orientation::Reverse => EdgeRecord::from_extensions(
            successor.map(A::complement),
            predecessor.map(A::complement),
        ),
    };
    NodeMessage::new(canonical, record)
}

/// One worker's partition of the node table
pub struct NodeShard {
    table: HashMap<Kmer, EdgeRecord, RandomState>,
}

impl NodeShard {
    /// Create an empty shard; `seed` fixes the iteration order
    pub fn new(seed: u64) -> Self {
        Self {
            table: HashMap::with_hasher(table_state(seed)),
        }
    }

    /// OR `record` into the node for `kmer`, creating it if unseen.
    /// Returns true if the node was created.
    #[inline]
    pub fn merge(&mut self, kmer: Kmer, record: EdgeRecord) -> bool {
        match self.table.entry(kmer) {
            Entry::Occupied(mut node) => {
                node.get_mut().merge(record);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Record of a node, if present
    pub fn get(&self, kmer: Kmer) -> Option<EdgeRecord> {
        self.table.get(&kmer).copied()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if the shard holds no nodes
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Every node once, in table order
    pub fn iter(&self) -> impl Iterator<Item = (Kmer, EdgeRecord)> + '_ {
        self.table.iter().map(|(&kmer, &record)| (kmer, record))
    }

    pub(crate) fn table(&self) -> &HashMap<Kmer, EdgeRecord, RandomState> {
        &self.table
    }
}

/// Counters kept by one worker's index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStatistics {
    /// Observations inserted on this worker
    pub inserts: u64,
    /// Observations merged straight into the local shard
    pub local_merges: u64,
    /// Tuples shipped to other workers
    pub tuples_sent: u64,
    /// Tuples received from other workers
    pub tuples_received: u64,
    /// Completed exchange rounds
    pub exchange_rounds: u64,
}

/// A worker's handle on the index while it is being built
pub struct DistributedIndex<'g, G: WorkerGroup + ?Sized, A: Alphabet = Dna> {
    group: &'g G,
    codec: KmerCodec<A>,
    policies: IndexPolicies,
    shard: NodeShard,
    /// `outgoing[r]` buffers tuples owned by worker `r`; the own slot stays empty
    outgoing: Vec<Vec<NodeMessage>>,
    stats: IndexStatistics,
}

impl<'g, G: WorkerGroup + ?Sized, A: Alphabet> DistributedIndex<'g, G, A> {
    /// Create this worker's (empty) part of the index
    pub fn new(group: &'g G, codec: KmerCodec<A>, policies: IndexPolicies, seed: u64) -> Self {
        let size = group.size();
        Self {
            group,
            codec,
            policies,
            shard: NodeShard::new(seed),
            outgoing: vec![Vec::new(); size],
            stats: IndexStatistics::default(),
        }
    }

    /// Record one observation of `kmer` with its flanking symbol codes
    pub fn insert(&mut self, kmer: Kmer, predecessor: Option<u8>, successor: Option<u8>) {
        let canonical = self.policies.canonical.as_ref();
        let message = canonical_message(&self.codec, canonical, kmer, predecessor, successor);
        let owner = self.policies.hash.owner(message.kmer, self.group.size());
        self.place(owner, message);
    }

    /// Record one extracted occurrence
    #[inline]
    pub fn insert_occurrence(&mut self, occurrence: &KmerOccurrence) {
        self.insert(occurrence.kmer, occurrence.predecessor, occurrence.successor);
    }

    /// Record a batch of occurrences, canonicalizing and routing in parallel
    pub fn insert_batch(&mut self, occurrences: &[KmerOccurrence]) {
        let codec = self.codec;
        let policies = &self.policies;
        let size = self.group.size();

        let routed: Vec<(usize, NodeMessage)> = occurrences
            .par_iter()
            .with_min_len(ROUTE_MIN_LEN)
            .map(|occ| {
                let message = canonical_message(
                    &codec,
                    policies.canonical.as_ref(),
                    occ.kmer,
                    occ.predecessor,
                    occ.successor,
                );
                (policies.hash.owner(message.kmer, size), message)
            })
            .collect();

        for (owner, message) in routed {
            self.place(owner, message);
        }
    }

    #[inline]
    fn place(&mut self, owner: usize, message: NodeMessage) {
        self.stats.inserts += 1;
        if owner == self.group.rank() {
            self.stats.local_merges += 1;
            self.shard.merge(message.kmer, message.record);
        } else {
            self.outgoing[owner].push(message);
        }
    }

    /// Tuples waiting for the next exchange
    pub fn buffered(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Collective: ship buffered tuples to their owners and merge what
    /// arrives for this shard. Returns the number of tuples received.
    ///
    /// # Errors
    /// Transport failures and malformed or misrouted tuples are reported as
    /// [`GraphError::ConstructionFailed`].
    pub fn exchange_and_merge(&mut self) -> Result<usize, GraphError> {
        let size = self.group.size();
        let outgoing = std::mem::replace(&mut self.outgoing, vec![Vec::new(); size]);
        let sent = outgoing.iter().map(Vec::len).sum::<usize>();

        let incoming = self.group.exchange(outgoing)?;

        let rank = self.group.rank();
        let mut received = 0usize;
        for (from, batch) in incoming.into_iter().enumerate() {
            received += batch.len();
            for message in batch {
                self.check_owned(from, &message)?;
                self.shard.merge(message.kmer, message.record);
            }
        }

        self.stats.tuples_sent += sent as u64;
        self.stats.tuples_received += received as u64;
        self.stats.exchange_rounds += 1;
        debug!(
            "worker {}: round {} sent {} tuples, shard holds {} nodes",
            rank,
            self.stats.exchange_rounds,
            sent,
            self.shard.len()
        );
        Ok(received)
    }

    fn check_owned(&self, from: usize, message: &NodeMessage) -> Result<(), TransportError> {
        if !self.codec.is_well_formed(message.kmer) {
            return Err(TransportError::ProtocolViolation {
                rank: from,
                reason: format!(
                    "k-mer word {:?} has bits beyond k={}",
                    message.kmer,
                    self.codec.k()
                ),
            });
        }
        let owner = self.policies.hash.owner(message.kmer, self.group.size());
        if owner != self.group.rank() {
            return Err(TransportError::ProtocolViolation {
                rank: from,
                reason: format!(
                    "{:?} belongs to worker {}, delivered to worker {}",
                    message.kmer,
                    owner,
                    self.group.rank()
                ),
            });
        }
        Ok(())
    }

    /// Collective: drain remaining buffers and freeze the local shard
    pub fn finish(mut self) -> Result<CompletedIndex<A>, GraphError> {
        self.exchange_and_merge()?;
        Ok(CompletedIndex {
            shard: self.shard,
            codec: self.codec,
            policies: self.policies,
            rank: self.group.rank(),
            num_workers: self.group.size(),
            stats: self.stats,
        })
    }

    /// Nodes currently held by the local shard
    pub fn local_len(&self) -> usize {
        self.shard.len()
    }

    /// Counters so far
    pub fn stats(&self) -> IndexStatistics {
        self.stats
    }

    /// The codec k-mers are packed with
    pub fn codec(&self) -> &KmerCodec<A> {
        &self.codec
    }
}

/// A worker's frozen shard after construction has completed
pub struct CompletedIndex<A: Alphabet = Dna> {
    shard: NodeShard,
    codec: KmerCodec<A>,
    policies: IndexPolicies,
    rank: usize,
    num_workers: usize,
    stats: IndexStatistics,
}

impl<A: Alphabet> CompletedIndex<A> {
    /// Every locally owned node exactly once, in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (Kmer, EdgeRecord)> + '_ {
        self.shard.iter()
    }

    /// Number of locally owned nodes
    pub fn len(&self) -> usize {
        self.shard.len()
    }

    /// True if this worker owns no nodes
    pub fn is_empty(&self) -> bool {
        self.shard.is_empty()
    }

    /// True if this worker owns the node of `kmer` (either strand)
    pub fn owns(&self, kmer: Kmer) -> bool {
        let canonical = self.canonical(kmer);
        self.policies.hash.owner(canonical, self.num_workers) == self.rank
    }

    /// Record of the node of `kmer` (either strand), if owned here and seen
    pub fn get(&self, kmer: Kmer) -> Option<EdgeRecord> {
        self.shard.get(self.canonical(kmer))
    }

    /// Canonical form under this index's policy
    #[inline]
    pub fn canonical(&self, kmer: Kmer) -> Kmer {
        self.policies
            .canonical
            .canonicalize(kmer, self.codec.reverse_complement(kmer))
            .0
    }

    /// The codec k-mers are packed with
    pub fn codec(&self) -> &KmerCodec<A> {
        &self.codec
    }

    /// Rank of the owning worker
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers the index is spread over
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Counters collected while building
    pub fn stats(&self) -> IndexStatistics {
        self.stats
    }

    pub(crate) fn shard(&self) -> &NodeShard {
        &self.shard
    }
}

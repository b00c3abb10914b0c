//! Graph builder orchestration
//!
//! Each worker runs the same loop over its share of the reads:
//! 1. Read the next batch of `batch_size` reads
//! 2. Extract k-mer windows in parallel and insert them into the index
//! 3. Exchange buffered tuples with the other workers
//! 4. Vote on whether every worker has run out of reads
//!
//! After the final vote the index is drained and frozen, and the worker
//! materializes the edges of the nodes it owns.

use crate::builder::cluster::run_local_cluster;
use crate::builder::config::BuildConfiguration;
use crate::builder::stats::BuildStatistics;
use crate::edges::{materialize_edges, Edge};
use crate::encoding::{Alphabet, Dna};
use crate::error::GraphError;
use crate::extractor::{KmerExtractor, KmerOccurrence};
use crate::index::{DistributedIndex, IndexPolicies};
use crate::kmer::KmerCodec;
use crate::source::{SequenceRecord, SequenceSource};
use crate::transport::WorkerGroup;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// What one worker produces: the edges of its shard and its counters
#[derive(Debug, Clone, Default)]
pub struct WorkerOutput {
    /// Edges emitted by this worker's nodes
    pub edges: Vec<Edge>,
    /// Counters of this worker's build
    pub stats: BuildStatistics,
}

/// Builder for de Bruijn graph edge lists
pub struct GraphBuilder<A: Alphabet = Dna> {
    config: BuildConfiguration,
    codec: KmerCodec<A>,
    policies: IndexPolicies,
}

impl GraphBuilder {
    /// Create a new DNA graph builder with the given configuration
    pub fn new(config: BuildConfiguration) -> Result<Self, GraphError> {
        Self::for_alphabet(config)
    }
}

impl<A: Alphabet> GraphBuilder<A> {
    /// Create a builder over an arbitrary alphabet
    pub fn for_alphabet(config: BuildConfiguration) -> Result<Self, GraphError> {
        config.validate()?;
        let codec = KmerCodec::new(config.k)?;
        let policies = IndexPolicies::with_seed(config.seed);
        Ok(Self { config, codec, policies })
    }

    /// Replace the sharding and canonicalization policies
    pub fn with_policies(mut self, policies: IndexPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// The configuration in use
    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    /// Build this worker's part of the edge list.
    ///
    /// Collective: every worker of `group` must call this with the same
    /// source and an equivalent builder. The caller concatenates the lists
    /// of all workers to obtain the full graph.
    pub fn build_edge_list<S, G>(&self, source: &S, group: &G) -> Result<Vec<Edge>, GraphError>
    where
        S: SequenceSource + ?Sized,
        G: WorkerGroup + Sync + ?Sized,
    {
        self.build_worker(source, group).map(|output| output.edges)
    }

    /// Like [`build_edge_list`](Self::build_edge_list), also returning the
    /// worker's statistics.
    ///
    /// # Parallelism
    /// Extraction and decoding run on a rayon pool sized by
    /// `config.num_threads`:
    /// - `0`: use all available CPU cores (rayon default)
    /// - `1`: single-threaded
    /// - `N`: use exactly N threads
    ///
    /// # Errors
    /// Any failure on this worker is announced to its peers with
    /// [`WorkerGroup::abort`] before being returned.
    pub fn build_worker<S, G>(&self, source: &S, group: &G) -> Result<WorkerOutput, GraphError>
    where
        S: SequenceSource + ?Sized,
        G: WorkerGroup + Sync + ?Sized,
    {
        let result = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| {
                GraphError::ConstructionFailed(format!("Failed to create thread pool: {e}"))
            })
            .and_then(|pool| pool.install(|| self.build_worker_inner(source, group)));

        if let Err(e) = &result {
            group.abort(&e.to_string());
        }
        result
    }

    /// Run a complete build on `config.num_workers` local threads and
    /// concatenate the per-worker edge lists in rank order
    pub fn build_local<S>(&self, source: &S) -> Result<WorkerOutput, GraphError>
    where
        S: SequenceSource + ?Sized,
    {
        let start = Instant::now();
        let outputs = run_local_cluster(self.config.num_workers, |group| {
            self.build_worker(source, &group)
        })?;

        let mut combined = WorkerOutput::default();
        for output in outputs {
            combined.edges.extend(output.edges);
            combined.stats += output.stats;
        }
        combined.stats.elapsed = start.elapsed();

        if self.config.verbose {
            combined.stats.print_summary();
        }
        Ok(combined)
    }

    /// Inner build logic, runs inside the rayon thread pool
    fn build_worker_inner<S, G>(&self, source: &S, group: &G) -> Result<WorkerOutput, GraphError>
    where
        S: SequenceSource + ?Sized,
        G: WorkerGroup + ?Sized,
    {
        let start = Instant::now();
        let rank = group.rank();
        let size = group.size();
        if self.config.verbose && rank == 0 {
            self.config.print();
        }

        let extractor = KmerExtractor::new(self.codec);
        let mut index =
            DistributedIndex::new(group, self.codec, self.policies.clone(), self.config.seed);
        let mut stats = BuildStatistics::new();

        let mut reads = source.reads(rank, size).map_err(source_failure)?;
        let mut batch: Vec<SequenceRecord> = Vec::new();
        let mut exhausted = false;

        loop {
            batch.clear();
            while !exhausted && batch.len() < self.config.batch_size {
                match reads.next() {
                    Some(record) => batch.push(record.map_err(source_failure)?),
                    None => exhausted = true,
                }
            }

            let occurrences: Vec<KmerOccurrence> = batch
                .par_iter()
                .flat_map_iter(|record| extractor.kmers(&record.sequence))
                .collect();
            let num_bases: usize = batch.iter().map(|r| r.sequence.len()).sum();
            let possible: usize =
                batch.iter().map(|r| extractor.num_windows(r.sequence.len())).sum();
            stats.add_batch(batch.len(), num_bases, possible, occurrences.len());

            index.insert_batch(&occurrences);
            index.exchange_and_merge()?;

            if group.all_reduce_and(exhausted)? {
                break;
            }
            debug!(
                "worker {}: {} reads so far, {} local nodes",
                rank,
                stats.num_reads,
                index.local_len()
            );
        }

        let completed = index.finish()?;
        let edges = materialize_edges(&completed);

        stats.record_index(&completed.stats(), completed.len());
        stats.num_edges = edges.len() as u64;
        stats.elapsed = start.elapsed();
        info!(
            "worker {}: graph generation completed in {:.3}s ({} nodes, {} edges)",
            rank,
            stats.elapsed.as_secs_f64(),
            stats.num_nodes,
            stats.num_edges
        );

        Ok(WorkerOutput { edges, stats })
    }
}

fn source_failure(e: anyhow::Error) -> GraphError {
    GraphError::ConstructionFailed(format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::LexLess;
    use crate::hasher::{DeterministicHasher, HashPolicy};
    use crate::kmer::Kmer;
    use crate::source::MemorySource;
    use crate::transport::SoloGroup;
    use std::sync::Arc;

    /// Owner taken straight from the packed bits, leaving shards unbalanced
    struct ShiftedWord;

    impl HashPolicy for ShiftedWord {
        fn hash_kmer(&self, kmer: Kmer) -> u64 {
            kmer.word() >> 2
        }
    }

    fn config(k: usize, num_workers: usize, batch_size: usize) -> BuildConfiguration {
        BuildConfiguration {
            k,
            num_workers,
            batch_size,
            num_threads: 1,
            verbose: false,
            ..BuildConfiguration::default()
        }
    }

    fn sorted(mut edges: Vec<Edge>) -> Vec<Edge> {
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_solo_build() {
        let source = MemorySource::from_sequences(["ACGTACGGT", "TTGCA"]);
        let builder = GraphBuilder::new(config(3, 1, 10)).unwrap();
        let output = builder.build_worker(&source, &SoloGroup).unwrap();

        assert_eq!(output.stats.num_reads, 2);
        assert_eq!(output.stats.num_windows, 7 + 3);
        assert_eq!(output.stats.num_skipped_windows, 0);
        assert_eq!(output.stats.num_edges, output.edges.len() as u64);
        assert!(!output.edges.is_empty());
    }

    #[test]
    fn test_batch_size_does_not_change_edges() {
        let source = MemorySource::from_sequences([
            "ACGTTGCATGCATTACGGA",
            "TTTTGGGGCCCCAAAA",
            "GATTACAGATTACA",
            "TCCGTAACGTTGCAT",
            "CATCATCATCAT",
        ]);
        let one_batch = GraphBuilder::new(config(5, 1, 100)).unwrap();
        let tiny_batches = GraphBuilder::new(config(5, 1, 1)).unwrap();

        let a = one_batch.build_edge_list(&source, &SoloGroup).unwrap();
        let b = tiny_batches.build_edge_list(&source, &SoloGroup).unwrap();
        assert_eq!(sorted(a), sorted(b));
    }

    #[test]
    fn test_local_build_matches_solo() {
        let source = MemorySource::from_sequences([
            "ACGTTGCATGCATTACGGA",
            "TTTTGGGGCCCCAAAA",
            "GATTACAGATTACA",
            "TCCGTAACGTTGCAT",
            "CATCATCATCAT",
            "GGGCCCAAATTT",
            "A",
        ]);
        let solo = GraphBuilder::new(config(5, 1, 2)).unwrap().build_local(&source).unwrap();
        let sharded = GraphBuilder::new(config(5, 4, 2)).unwrap().build_local(&source).unwrap();

        assert_eq!(sorted(solo.edges), sorted(sharded.edges));
        assert_eq!(solo.stats.num_nodes, sharded.stats.num_nodes);
        assert_eq!(solo.stats.num_reads, 7);
        assert_eq!(sharded.stats.num_reads, 7);
        assert!(sharded.stats.tuples_sent > 0);
        assert_eq!(sharded.stats.tuples_sent, sharded.stats.tuples_received);
    }

    #[test]
    fn test_more_workers_than_reads() {
        let source = MemorySource::from_sequences(["ACGTACGTAC"]);
        let solo = GraphBuilder::new(config(4, 1, 8)).unwrap().build_local(&source).unwrap();
        let sharded = GraphBuilder::new(config(4, 5, 8)).unwrap().build_local(&source).unwrap();
        assert_eq!(sorted(solo.edges), sorted(sharded.edges));
    }

    #[test]
    fn test_sharding_policy_does_not_change_edges() {
        let source = MemorySource::from_sequences([
            "ACGTTGCATGCATTACGGA",
            "TTTTGGGGCCCCAAAA",
            "GATTACAGATTACA",
            "TCCGTAACGTTGCAT",
            "CATCATCATCAT",
            "GGGCCCAAATTT",
        ]);
        let default = GraphBuilder::new(config(5, 3, 2)).unwrap().build_local(&source).unwrap();

        let policies = [
            IndexPolicies::new(Arc::new(ShiftedWord), Arc::new(LexLess)),
            IndexPolicies::new(Arc::new(DeterministicHasher::new(7)), Arc::new(LexLess)),
        ];
        for policies in policies {
            let custom = GraphBuilder::new(config(5, 3, 2))
                .unwrap()
                .with_policies(policies)
                .build_local(&source)
                .unwrap();
            assert_eq!(sorted(custom.edges), sorted(default.edges.clone()));
            assert_eq!(custom.stats.num_nodes, default.stats.num_nodes);
            assert_eq!(custom.stats.tuples_sent, custom.stats.tuples_received);
        }
    }

    #[test]
    fn test_empty_source() {
        let source = MemorySource::default();
        let output = GraphBuilder::new(config(31, 3, 8)).unwrap().build_local(&source).unwrap();
        assert!(output.edges.is_empty());
        assert_eq!(output.stats.num_nodes, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_build() {
        let err = GraphBuilder::new(config(32, 1, 8)).err().unwrap();
        assert!(matches!(err, GraphError::Configuration(_)));
    }
}

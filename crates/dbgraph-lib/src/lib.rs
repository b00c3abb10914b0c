//! dbgraph: distributed de Bruijn graph construction
//!
//! Builds the edge list of a de Bruijn graph from sequencing reads. Nodes
//! are canonical k-mers (k <= 31, packed 2 bits per base into one `u64`)
//! and every node carries an 8-bit record of the one-base extensions seen
//! on either side of it. The node table is sharded across a group of
//! workers that exchange tuples in lockstep rounds; once all reads are
//! consumed, each worker emits the edges of the nodes it owns.
//!
//! ```no_run
//! use dbgraph_lib::{build_edge_list_local, BuildConfiguration, FastxSource};
//!
//! let config = BuildConfiguration { num_workers: 4, ..BuildConfiguration::default() };
//! let (edges, stats) = build_edge_list_local(&FastxSource::new("reads.fq.gz"), config)?;
//! println!("{} edges over {} nodes", edges.len(), stats.num_nodes);
//! # Ok::<(), dbgraph_lib::GraphError>(())
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod canonical;
pub mod constants;
pub mod edges;
pub mod encoding;
pub mod error;
pub mod extractor;
pub mod hasher;
pub mod index;
pub mod kmer;
pub mod record;
pub mod source;
pub mod transport;

// Re-export common types at crate root
pub use builder::{
    build_edge_list, build_edge_list_local, run_local_cluster, BuildConfiguration, BuildStatistics,
    GraphBuilder, WorkerOutput,
};
pub use canonical::{CanonicalizationPolicy, LexLess, Orientation};
pub use edges::{dedup_undirected, materialize_edges, Edge};
pub use encoding::{Alphabet, Dna, EncodingError};
pub use error::GraphError;
pub use extractor::{KmerExtractor, KmerOccurrence};
pub use hasher::{DeterministicHasher, HashPolicy};
pub use index::{CompletedIndex, DistributedIndex, IndexPolicies, NodeMessage};
pub use kmer::{Kmer, KmerCodec};
pub use record::{EdgeRecord, NeighborDecoder};
pub use source::{FastxSource, MemorySource, SequenceRecord, SequenceSource};
pub use transport::{LocalGroup, SoloGroup, TransportError, WorkerGroup};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let (major, minor, patch) = version();
        assert_eq!(major, 0);
        assert_eq!(minor, 1);
        assert_eq!(patch, 0);
    }
}

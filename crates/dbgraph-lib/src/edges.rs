//! Edge list materialization from a completed index
//!
//! Each worker turns its own shard into edges without further
//! communication: a node's record alone determines its neighbors.

use crate::encoding::Alphabet;
use crate::index::CompletedIndex;
use crate::kmer::Kmer;
use crate::record::{EdgeRecord, NeighborDecoder};
use rayon::prelude::*;

/// A directed edge between canonical k-mers, as packed words
pub type Edge = (u64, u64);

/// Emit the edges of every locally owned node.
///
/// For a node `c` and each neighbor `n` decoded from its record, the edge
/// `(c, canonical(n))` is emitted. Incoming and outgoing neighbors give
/// separate entries, and no attempt is made to suppress the copy of an edge
/// that the neighbor's owner emits. Order follows the shard's iteration
/// order, so it is stable for a given build.
pub fn materialize_edges<A: Alphabet>(index: &CompletedIndex<A>) -> Vec<Edge> {
    let decoder = NeighborDecoder::new(*index.codec());

    index
        .shard()
        .table()
        .par_iter()
        .flat_map_iter(|(&node, &record)| node_edges(index, &decoder, node, record))
        .collect()
}

fn node_edges<'a, A: Alphabet>(
    index: &'a CompletedIndex<A>,
    decoder: &NeighborDecoder<A>,
    node: Kmer,
    record: EdgeRecord,
) -> impl Iterator<Item = Edge> + 'a {
    let source = node.word();
    decoder
        .in_neighbors(node, record)
        .chain(decoder.out_neighbors(node, record))
        .map(move |neighbor| (source, index.canonical(neighbor).word()))
}

/// Collapse an edge list into a set of undirected edges.
///
/// Each pair is normalized to `(min, max)`; the result is sorted with
/// duplicates removed. Self-loops are kept once.
pub fn dedup_undirected(mut edges: Vec<Edge>) -> Vec<Edge> {
    for edge in edges.iter_mut() {
        if edge.0 > edge.1 {
            *edge = (edge.1, edge.0);
        }
    }
    edges.par_sort_unstable();
    edges.dedup();
    edges
}

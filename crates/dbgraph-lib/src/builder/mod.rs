//! Builder module for constructing de Bruijn graph edge lists
//!
//! This module wires the pieces into a build:
//! 1. Partition reads across workers
//! 2. Extract k-mer windows and insert them into the distributed index
//! 3. Exchange and merge tuples until every worker is out of reads
//! 4. Materialize the edges of each worker's shard

pub mod cluster;
pub mod config;
pub mod graph_builder;
pub mod stats;

pub use cluster::run_local_cluster;
pub use config::BuildConfiguration;
pub use graph_builder::{GraphBuilder, WorkerOutput};
pub use stats::BuildStatistics;

use crate::edges::Edge;
use crate::error::GraphError;
use crate::source::SequenceSource;
use crate::transport::WorkerGroup;

/// Build this worker's part of the edge list with the default configuration.
///
/// Collective over `group`; the full graph is the concatenation of every
/// worker's result.
pub fn build_edge_list<S, G>(source: &S, group: &G) -> Result<Vec<Edge>, GraphError>
where
    S: SequenceSource + ?Sized,
    G: WorkerGroup + Sync + ?Sized,
{
    let config = BuildConfiguration { verbose: false, ..BuildConfiguration::default() };
    GraphBuilder::new(config)?.build_edge_list(source, group)
}

/// Build the whole edge list on `config.num_workers` local threads
pub fn build_edge_list_local<S>(
    source: &S,
    config: BuildConfiguration,
) -> Result<(Vec<Edge>, BuildStatistics), GraphError>
where
    S: SequenceSource + ?Sized,
{
    let output = GraphBuilder::new(config)?.build_local(source)?;
    Ok((output.edges, output.stats))
}

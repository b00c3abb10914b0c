use anyhow::Context;
use clap::{Parser, Subcommand};
use dbgraph_lib::{
    build_edge_list_local, dedup_undirected, BuildConfiguration, Edge, FastxSource, Kmer, KmerCodec,
};
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dbgraph")]
#[command(version = "0.1.0")]
#[command(about = "Distributed de Bruijn graph edge-list construction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the edge list of a FASTA/FASTQ file and report its size
    Build {
        /// Input FASTA/FASTQ file (may be gzipped)
        #[arg(short, long)]
        input: String,

        /// K-mer length (1-31)
        #[arg(short, long, default_value = "31")]
        k: usize,

        /// Number of workers (shards)
        #[arg(short = 'w', long, default_value = "1")]
        workers: usize,

        /// Number of threads per worker (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Reads per worker between exchange rounds
        #[arg(short, long, default_value = "100000")]
        batch_size: usize,

        /// Also report the number of distinct undirected edges
        #[arg(long, default_value = "false")]
        dedup: bool,

        /// Print the first N edges as k-mer pairs
        #[arg(long, default_value = "0")]
        show: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check that a sharded build yields the same edges as a single worker
    Verify {
        /// Input FASTA/FASTQ file (may be gzipped)
        #[arg(short, long)]
        input: String,

        /// K-mer length (1-31)
        #[arg(short, long, default_value = "31")]
        k: usize,

        /// Number of workers for the sharded build
        #[arg(short = 'w', long, default_value = "4")]
        workers: usize,

        /// Number of threads per worker (0 = all available cores)
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, k, workers, threads, batch_size, dedup, show, verbose } => {
            let config = BuildConfiguration {
                k,
                num_workers: workers,
                num_threads: threads,
                batch_size,
                verbose,
                ..BuildConfiguration::default()
            };
            build_command(&input, config, dedup, show)?;
        }
        Commands::Verify { input, k, workers, threads } => {
            verify_command(&input, k, workers, threads)?;
        }
    }

    Ok(())
}

/// Build an edge list from FASTA/FASTQ input and summarize it
fn build_command(
    input: &str,
    config: BuildConfiguration,
    dedup: bool,
    show: usize,
) -> anyhow::Result<()> {
    info!("Building de Bruijn edge list...");
    info!("  Input: {}", input);
    check_input(input)?;

    let k = config.k;
    let verbose = config.verbose;
    let source = FastxSource::new(input);
    let (edges, stats) =
        build_edge_list_local(&source, config).context("Edge list construction failed")?;
    if !verbose {
        stats.print_summary();
    }

    println!("\n=== Build Results ===");
    println!("  Nodes: {}", stats.num_nodes);
    println!("  Edges (per endpoint): {}", edges.len());

    if show > 0 {
        let codec: KmerCodec = KmerCodec::new(k)?;
        println!("\nFirst {} edges:", show.min(edges.len()));
        for &(src, dst) in edges.iter().take(show) {
            println!(
                "  {} -> {}",
                codec.decode(Kmer::from_word(src)),
                codec.decode(Kmer::from_word(dst))
            );
        }
    }

    if dedup {
        let undirected = dedup_undirected(edges);
        println!("  Distinct undirected edges: {}", undirected.len());
    }

    Ok(())
}

/// Compare a single-worker build against a sharded one
fn verify_command(input: &str, k: usize, workers: usize, threads: usize) -> anyhow::Result<()> {
    info!("Verifying sharded construction...");
    info!("  Input: {}", input);
    info!("  Workers: 1 vs {}", workers);
    check_input(input)?;

    let source = FastxSource::new(input);
    let base = BuildConfiguration {
        k,
        num_threads: threads,
        verbose: false,
        ..BuildConfiguration::default()
    };

    let single = BuildConfiguration { num_workers: 1, ..base.clone() };
    let (reference, _) =
        build_edge_list_local(&source, single).context("Single-worker build failed")?;
    let sharded = BuildConfiguration { num_workers: workers, ..base };
    let (sharded, stats) =
        build_edge_list_local(&source, sharded).context("Sharded build failed")?;

    let reference = sorted(reference);
    let sharded = sorted(sharded);
    let mismatches = count_mismatches(&reference, &sharded);

    println!("\n=== Verify Results ===");
    println!("  Reference edges: {}", reference.len());
    println!("  Sharded edges: {}", sharded.len());
    println!("  Tuples exchanged: {}", stats.tuples_sent);

    if mismatches > 0 {
        warn!("VERIFICATION FAILED! {} edges differ", mismatches);
        println!("\n✗ VERIFICATION FAILED!");
        println!("  {} edges differ between 1 and {} workers", mismatches, workers);
        std::process::exit(1);
    } else {
        println!("\n✓ VERIFICATION PASSED!");
        println!("  1 and {} workers produced the same edge multiset", workers);
    }

    Ok(())
}

fn check_input(input: &str) -> anyhow::Result<()> {
    if !Path::new(input).exists() {
        anyhow::bail!("Input file not found: {}", input);
    }
    Ok(())
}

fn sorted(mut edges: Vec<Edge>) -> Vec<Edge> {
    edges.sort_unstable();
    edges
}

/// Size of the symmetric difference of two sorted multisets
fn count_mismatches(a: &[Edge], b: &[Edge]) -> usize {
    let (mut i, mut j, mut diff) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                diff += 1;
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                diff += 1;
                j += 1;
            }
        }
    }
    diff + (a.len() - i) + (b.len() - j)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_mismatches() {
        assert_eq!(count_mismatches(&[(1, 2), (1, 2), (3, 4)], &[(1, 2), (1, 2), (3, 4)]), 0);
        assert_eq!(count_mismatches(&[(1, 2), (1, 2)], &[(1, 2)]), 1);
        assert_eq!(count_mismatches(&[(1, 2)], &[(5, 6)]), 2);
        assert_eq!(count_mismatches(&[], &[(5, 6)]), 1);
    }
}

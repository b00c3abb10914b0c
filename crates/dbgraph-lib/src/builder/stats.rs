//! Per-build counters

use crate::index::IndexStatistics;
use std::ops::AddAssign;
use std::time::Duration;
use tracing::info;

/// Statistics for one worker, or summed over a cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStatistics {
    /// Reads consumed
    pub num_reads: u64,

    /// Total bases in consumed reads
    pub num_bases: u64,

    /// K-mer windows extracted
    pub num_windows: u64,

    /// Windows dropped because they covered a symbol outside the alphabet
    pub num_skipped_windows: u64,

    /// Distinct canonical k-mers owned
    pub num_nodes: u64,

    /// Edges emitted by the materializer
    pub num_edges: u64,

    /// Exchange rounds performed (the maximum across workers when summed)
    pub num_rounds: u64,

    /// Tuples shipped to other workers
    pub tuples_sent: u64,

    /// Tuples received from other workers
    pub tuples_received: u64,

    /// Wall-clock time of the build (the maximum across workers when summed)
    pub elapsed: Duration,
}

impl BuildStatistics {
    /// Create a new statistics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a batch of reads.
    ///
    /// `possible_windows` is what the reads would yield if every symbol were
    /// valid; the shortfall against `windows` counts as skipped.
    pub fn add_batch(
        &mut self,
        num_reads: usize,
        num_bases: usize,
        possible_windows: usize,
        windows: usize,
    ) {
        self.num_reads += num_reads as u64;
        self.num_bases += num_bases as u64;
        self.num_windows += windows as u64;
        self.num_skipped_windows += possible_windows.saturating_sub(windows) as u64;
    }

    /// Copy the exchange counters of a finished index
    pub fn record_index(&mut self, index: &IndexStatistics, num_nodes: usize) {
        self.num_nodes = num_nodes as u64;
        self.num_rounds = index.exchange_rounds;
        self.tuples_sent = index.tuples_sent;
        self.tuples_received = index.tuples_received;
    }

    /// Log statistics summary via tracing
    pub fn print_summary(&self) {
        info!("Build Statistics:");
        info!("  Reads: {}", self.num_reads);
        info!("  Bases: {}", self.num_bases);
        info!("  K-mer windows: {}", self.num_windows);
        let possible = self.num_windows + self.num_skipped_windows;
        if possible > 0 {
            info!(
                "  Skipped windows: {} ({:.2}%)",
                self.num_skipped_windows,
                (self.num_skipped_windows as f64 * 100.0) / possible as f64
            );
        }
        info!("  Nodes: {}", self.num_nodes);
        info!("  Edges: {}", self.num_edges);
        info!("  Exchange rounds: {}", self.num_rounds);
        info!("  Tuples sent: {}", self.tuples_sent);
        info!("  Tuples received: {}", self.tuples_received);
        info!("  Elapsed: {:.3}s", self.elapsed.as_secs_f64());
    }
}

impl AddAssign for BuildStatistics {
    fn add_assign(&mut self, other: Self) {
        self.num_reads += other.num_reads;
        self.num_bases += other.num_bases;
        self.num_windows += other.num_windows;
        self.num_skipped_windows += other.num_skipped_windows;
        self.num_nodes += other.num_nodes;
        self.num_edges += other.num_edges;
        self.num_rounds = self.num_rounds.max(other.num_rounds);
        self.tuples_sent += other.tuples_sent;
        self.tuples_received += other.tuples_received;
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_batch() {
        let mut stats = BuildStatistics::new();
        stats.add_batch(1, 10, 8, 5);
        stats.add_batch(1, 2, 0, 0);
        assert_eq!(stats.num_reads, 2);
        assert_eq!(stats.num_bases, 12);
        assert_eq!(stats.num_windows, 5);
        assert_eq!(stats.num_skipped_windows, 3);
    }

    #[test]
    fn test_sum_over_workers() {
        let a = BuildStatistics {
            num_reads: 3,
            num_nodes: 10,
            num_rounds: 2,
            tuples_sent: 7,
            elapsed: Duration::from_millis(5),
            ..BuildStatistics::default()
        };
        let b = BuildStatistics {
            num_reads: 4,
            num_nodes: 11,
            num_rounds: 3,
            tuples_sent: 1,
            elapsed: Duration::from_millis(2),
            ..BuildStatistics::default()
        };
        let mut total = a;
        total += b;
        assert_eq!(total.num_reads, 7);
        assert_eq!(total.num_nodes, 21);
        assert_eq!(total.num_rounds, 3);
        assert_eq!(total.tuples_sent, 8);
        assert_eq!(total.elapsed, Duration::from_millis(5));
    }
}

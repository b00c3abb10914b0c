//! Build configuration for edge-list construction
//!
//! Parameters are checked by [`BuildConfiguration::validate`] before any
//! input is opened or any worker is started.

use crate::constants::{is_valid_k, DEFAULT_BATCH_SIZE, DEFAULT_K, DEFAULT_SEED, MAX_K, MIN_K};
use crate::error::GraphError;

/// Configuration parameters for building a de Bruijn edge list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// K-mer length, in [1, 31]
    pub k: usize,

    /// Number of workers (shards) for in-process builds
    pub num_workers: usize,

    /// Reads each worker consumes between two exchange rounds
    pub batch_size: usize,

    /// Seed for shard ownership and table hashing; all workers must agree
    pub seed: u64,

    /// Threads per worker for parallel extraction and decoding
    /// (0 = all available cores)
    pub num_threads: usize,

    /// Verbose output during construction
    pub verbose: bool,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            num_workers: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: DEFAULT_SEED,
            num_threads: 0, // 0 = use all available cores
            verbose: true,
        }
    }
}

impl BuildConfiguration {
    /// Create a new build configuration with the specified k-mer length
    pub fn new(k: usize) -> Result<Self, GraphError> {
        let config = Self { k, ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), GraphError> {
        if !is_valid_k(self.k) {
            return Err(GraphError::Configuration(format!(
                "k must be in range [{}, {}], got k={}",
                MIN_K, MAX_K, self.k
            )));
        }
        if self.num_workers == 0 {
            return Err(GraphError::Configuration(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(GraphError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Build Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  num_workers = {}", self.num_workers);
        tracing::info!("  batch_size = {}", self.batch_size);
        tracing::debug!("  seed = {}", self.seed);
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  verbose = {}", self.verbose);
    }
}

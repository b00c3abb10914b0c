//! In-process clusters: one thread per worker
//!
//! Workers are wired with [`LocalGroup::fabric`] and run on scoped threads.
//! The run either succeeds on every worker or fails as a whole: errors and
//! panics from all workers are folded into a single
//! [`GraphError::ConstructionFailed`].

use crate::error::GraphError;
use crate::transport::LocalGroup;
use std::any::Any;
use std::thread;
use tracing::{debug, error};

/// Run `worker` once per rank on `num_workers` threads and collect the
/// results in rank order.
///
/// A worker that fails or panics drops its endpoint, so peers blocked in a
/// collective fail as well instead of waiting forever.
pub fn run_local_cluster<T, F>(num_workers: usize, worker: F) -> Result<Vec<T>, GraphError>
where
    T: Send,
    F: Fn(LocalGroup) -> Result<T, GraphError> + Sync,
{
    if num_workers == 0 {
        return Err(GraphError::Configuration(
            "num_workers must be at least 1".to_string(),
        ));
    }

    debug!("Starting local cluster of {} workers", num_workers);
    let groups = LocalGroup::fabric(num_workers);

    let outcomes: Vec<thread::Result<Result<T, GraphError>>> = thread::scope(|s| {
        let worker = &worker;
        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| s.spawn(move || worker(group)))
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut results = Vec::with_capacity(num_workers);
    let mut failures = Vec::new();
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(e)) => failures.push(format!("worker {}: {}", rank, e)),
            Err(payload) => {
                failures.push(format!("worker {} panicked: {}", rank, panic_message(&*payload)))
            }
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        error!("{} of {} workers failed", failures.len(), num_workers);
        Err(GraphError::ConstructionFailed(failures.join("; ")))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}

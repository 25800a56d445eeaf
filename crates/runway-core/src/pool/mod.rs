//! Bounded fan-out for provisioning batches.
//!
//! Each job runs on its own task; at most `max_workers` are in flight at once.
//! A panicking job is reported as a failure of that job only.
use std::future::Future;

use futures::{StreamExt, stream};
use tokio::task::JoinError;

/// Default number of jobs in flight per batch.
pub const DEFAULT_MAX_WORKERS: usize = 4;

#[derive(Clone, Copy, Debug)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    /// Create a pool; `max_workers` is clamped to at least 1.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run every job to completion and collect the results in completion order.
    ///
    /// Jobs are spawned lazily, so a job not yet started holds no task.
    pub async fn join_all<I, Fut, T, E>(&self, jobs: I) -> BatchReport<T, E>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<JoinError> + Send + 'static,
    {
        let results = stream::iter(jobs)
            .map(|job| tokio::spawn(job))
            .buffer_unordered(self.max_workers)
            .map(|joined| joined.unwrap_or_else(|e| Err(E::from(e))))
            .collect()
            .await;

        BatchReport { results }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

/// Outcome of a batch; one entry per job.
#[derive(Debug)]
pub struct BatchReport<T, E> {
    results: Vec<Result<T, E>>,
}

impl<T, E> BatchReport<T, E> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn errors(&self) -> impl Iterator<Item = &E> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn into_results(self) -> Vec<Result<T, E>> {
        self.results
    }
}

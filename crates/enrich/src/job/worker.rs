//! Batch worker pool.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::error::Result;
use crate::store::Store;

use super::runner::{JobOutcome, JobRunner};

/// Counts from one or more batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs pulled from the queue.
    pub fetched: usize,
    pub awaiting_review: usize,
    pub failed: usize,
    /// Jobs another worker claimed first.
    pub skipped: usize,
    /// Jobs that hit a store error.
    pub errors: usize,
}

impl BatchReport {
    /// Add another report's counts.
    pub fn absorb(&mut self, other: BatchReport) {
        self.fetched += other.fetched;
        self.awaiting_review += other.awaiting_review;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }

    fn record(&mut self, outcome: &Result<JobOutcome>) {
        match outcome {
            Ok(JobOutcome::AwaitingReview) => self.awaiting_review += 1,
            Ok(JobOutcome::Failed(_)) => self.failed += 1,
            Ok(JobOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.errors += 1,
        }
    }
}

/// Pulls batches of pending jobs and runs them with bounded concurrency.
///
/// Claiming goes through the store's conditional `start`, so several pools
/// may drain the same queue without coordinating.
pub struct WorkerPool {
    store: Arc<dyn Store>,
    runner: Arc<JobRunner>,
    batch_limit: usize,
    concurrency: usize,
}

impl WorkerPool {
    /// Create a pool.
    pub fn new(store: Arc<dyn Store>, runner: Arc<JobRunner>) -> Self {
        Self {
            store,
            runner,
            batch_limit: 5,
            concurrency: 4,
        }
    }

    /// Set the number of jobs pulled per batch.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    /// Set the number of jobs in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run one batch of the oldest pending jobs.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let jobs = self.store.pending_jobs(self.batch_limit).await?;
        let mut report = BatchReport {
            fetched: jobs.len(),
            ..Default::default()
        };
        if jobs.is_empty() {
            return Ok(report);
        }

        let outcomes: Vec<_> = stream::iter(jobs)
            .map(|job| {
                let runner = Arc::clone(&self.runner);
                async move {
                    let outcome = runner.process(&job).await;
                    if let Err(e) = &outcome {
                        error!(job_id = %job.id, error = %e, "Store error while processing job");
                    }
                    outcome
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in &outcomes {
            report.record(outcome);
        }

        info!(
            fetched = report.fetched,
            awaiting_review = report.awaiting_review,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            "Batch finished"
        );
        Ok(report)
    }

    /// Run batches until the queue is empty.
    ///
    /// Stops early if a batch makes no progress, so a store that keeps
    /// erroring cannot spin forever.
    pub async fn run_until_idle(&self) -> Result<BatchReport> {
        let mut total = BatchReport::default();
        loop {
            let batch = self.run_batch().await?;
            let progressed = batch.awaiting_review + batch.failed + batch.skipped > 0;
            total.absorb(batch);
            if batch.fetched == 0 || !progressed {
                return Ok(total);
            }
        }
    }
}

//! Bounded fan-out/fan-in over a batch of independent items.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use super::models::{FailureReason, SyncError};

/// Result of processing a single batch item.
#[derive(Debug)]
pub enum ItemOutcome<P> {
    Success(P),
    Skipped(P),
    Failed(SyncError),
}

impl<P> ItemOutcome<P> {
    pub fn tag(&self) -> &'static str {
        match self {
            ItemOutcome::Success(_) => "success",
            ItemOutcome::Skipped(_) => "skipped",
            ItemOutcome::Failed(_) => "failed",
        }
    }
}

/// Per-outcome counters of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchCounts {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Aggregated outcome of a batch.
#[derive(Debug)]
pub struct BatchReport<P> {
    pub succeeded: Vec<P>,
    pub skipped: Vec<P>,
    pub failures: Vec<SyncError>,
}

impl<P> Default for BatchReport<P> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<P> BatchReport<P> {
    pub fn record(&mut self, outcome: ItemOutcome<P>) {
        match outcome {
            ItemOutcome::Success(payload) => self.succeeded.push(payload),
            ItemOutcome::Skipped(payload) => self.skipped.push(payload),
            ItemOutcome::Failed(error) => self.failures.push(error),
        }
    }

    pub fn counts(&self) -> BatchCounts {
        BatchCounts {
            success: self.succeeded.len(),
            failed: self.failures.len(),
            skipped: self.skipped.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len() + self.skipped.len()
    }

    /// Number of failures per reason.
    pub fn failure_breakdown(&self) -> BTreeMap<FailureReason, usize> {
        let mut breakdown = BTreeMap::new();
        for failure in &self.failures {
            *breakdown.entry(failure.reason()).or_insert(0) += 1;
        }
        breakdown
    }

    /// Log the batch summary and, if anything failed, the reason breakdown.
    pub fn log_summary(&self, label: &str) {
        let counts = self.counts();
        info!(
            "{} complete: {} succeeded | {} failed | {} skipped",
            label, counts.success, counts.failed, counts.skipped
        );
        if !self.failures.is_empty() {
            let breakdown = self
                .failure_breakdown()
                .iter()
                .map(|(reason, count)| format!("{}={}", reason, count))
                .collect::<Vec<_>>()
                .join(", ");
            warn!("{} failure breakdown: {}", label, breakdown);
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: BatchReport<P>) {
        self.succeeded.extend(other.succeeded);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }
}

/// Fixed-size worker pool shared by the pipeline stages.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    workers: usize,
}

impl BatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` over every item with at most `workers` items in flight.
    pub async fn run<I, P, F, Fut>(&self, items: Vec<I>, task: F) -> BatchReport<P>
    where
        I: Send + 'static,
        P: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ItemOutcome<P>> + Send + 'static,
    {
        self.run_observed(items, task, |_| {}).await
    }

    /// Like [`BatchExecutor::run`], calling `observer` as each outcome arrives.
    pub async fn run_observed<I, P, F, Fut, O>(
        &self,
        items: Vec<I>,
        task: F,
        mut observer: O,
    ) -> BatchReport<P>
    where
        I: Send + 'static,
        P: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ItemOutcome<P>> + Send + 'static,
        O: FnMut(&ItemOutcome<P>),
    {
        let task = Arc::new(task);
        let mut report = BatchReport::default();

        // Each item runs as its own tokio task so a panic stays inside that
        // item. buffer_unordered only spawns the next item when one resolves.
        let mut outcomes = stream::iter(items)
            .map(move |item| {
                let task = Arc::clone(&task);
                tokio::spawn(async move { task(item).await })
            })
            .buffer_unordered(self.workers);

        while let Some(joined) = outcomes.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    error!("Batch item task panicked: {}", join_err);
                    ItemOutcome::Failed(SyncError::Panicked(join_err.to_string()))
                }
            };
            observer(&outcome);
            report.record(outcome);
        }

        report
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use log::{debug, info, warn};

use super::result::{AttemptOutcome, BatchResult, ErrorDescriptor};
use super::retry::RetryPolicy;

/// Settings for one `TaskRunner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of work calls in flight at once. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_retries: 2,
            base_retry_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

/// Bounded-concurrency batch executor with per-item retry.
///
/// Workers claim items from a shared atomic cursor in input order. Results are
/// placed by input index, so `results[i]` always belongs to `items[i]` no matter
/// which worker ran it or when it finished.
pub struct TaskRunner {
    config: RunnerConfig,
    retry: RetryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl TaskRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let retry = RetryPolicy::new(
            config.base_retry_delay,
            config.max_retry_delay,
            config.max_retries,
        );
        Self::with_retry_policy(config, retry)
    }

    /// Uses `retry` instead of the policy derived from `config`.
    pub fn with_retry_policy(config: RunnerConfig, retry: RetryPolicy) -> Self {
        Self {
            config,
            retry,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Stops workers from claiming new items or scheduling retries.
    ///
    /// Calls already in flight run to completion. Items that were never claimed
    /// get a cancelled `BatchResult`.
    pub fn shutdown(&self) {
        info!("Shutting down task runner...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Shared flag that other tasks can set to trigger `shutdown`.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Observes `flag` instead of a private one, so several runners stop together.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub async fn process_items<'a, T, R, E, F, Fut>(
        &self,
        items: &'a [T],
        work: F,
    ) -> Vec<BatchResult<R>>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
    {
        self.process_items_with_progress(items, work, |_, _| {})
            .await
    }

    /// Like `process_items`, calling `on_progress(completed, total)` each time
    /// an item reaches its terminal state (in completion order).
    pub async fn process_items_with_progress<'a, T, R, E, F, Fut, P>(
        &self,
        items: &'a [T],
        work: F,
        on_progress: P,
    ) -> Vec<BatchResult<R>>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
        P: Fn(usize, usize),
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let worker_count = self.config.concurrency.clamp(1, total);
        let cursor = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        debug!(
            "Processing {} items with {} workers (max retries: {})",
            total,
            worker_count,
            self.retry.max_retries()
        );

        let workers = (0..worker_count).map(|worker_id| {
            self.run_worker(
                worker_id,
                items,
                &work,
                &cursor,
                &completed,
                &on_progress,
            )
        });
        let finished = join_all(workers).await;

        let mut slots: Vec<Option<BatchResult<R>>> = (0..total).map(|_| None).collect();
        for (index, result) in finished.into_iter().flatten() {
            slots[index] = Some(result);
        }

        let results: Vec<BatchResult<R>> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(BatchResult::cancelled))
            .collect();

        let failed = results.iter().filter(|r| !r.succeeded).count();
        info!(
            "Processed {} items: {} succeeded, {} failed",
            total,
            total - failed,
            failed
        );

        results
    }

    async fn run_worker<'a, T, R, E, F, Fut, P>(
        &self,
        worker_id: usize,
        items: &'a [T],
        work: &F,
        cursor: &AtomicUsize,
        completed: &AtomicUsize,
        on_progress: &P,
    ) -> Vec<(usize, BatchResult<R>)>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
        P: Fn(usize, usize),
    {
        let mut results = Vec::new();

        loop {
            if self.is_shutdown() {
                debug!("Worker {} received shutdown signal", worker_id);
                break;
            }

            let index = cursor.fetch_add(1, Ordering::SeqCst);
            if index >= items.len() {
                break;
            }

            let result = self.run_item(worker_id, index, &items[index], work).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(done, items.len());
            results.push((index, result));
        }

        debug!("Worker {} stopped", worker_id);
        results
    }

    async fn run_item<'a, T, R, E, F, Fut>(
        &self,
        worker_id: usize,
        index: usize,
        item: &'a T,
        work: &F,
    ) -> BatchResult<R>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
    {
        let started = Instant::now();
        let mut retries: u32 = 0;

        loop {
            match attempt(item, work, retries + 1).await {
                AttemptOutcome {
                    value: Some(value),
                    ..
                } => {
                    return BatchResult::success(value, started.elapsed(), retries);
                }
                AttemptOutcome {
                    failure,
                    attempt: attempt_no,
                    ..
                } => {
                    let failure =
                        failure.unwrap_or_else(|| ErrorDescriptor::failed("Unknown failure"));

                    if !self.retry.should_retry(retries) || self.is_shutdown() {
                        warn!(
                            "Worker {} giving up on item {} after {} attempt(s): {}",
                            worker_id, index, attempt_no, failure
                        );
                        return BatchResult::failure(failure, started.elapsed(), retries);
                    }

                    let delay = self.retry.delay(retries + 1);
                    debug!(
                        "Worker {} retrying item {} ({}/{}) in {:?}: {}",
                        worker_id,
                        index,
                        retries + 1,
                        self.retry.max_retries(),
                        delay,
                        failure
                    );
                    tokio::time::sleep(delay).await;

                    if self.is_shutdown() {
                        debug!(
                            "Worker {} dropping retry of item {} after shutdown",
                            worker_id, index
                        );
                        return BatchResult::failure(failure, started.elapsed(), retries);
                    }
                    retries += 1;
                }
            }
        }
    }
}

async fn attempt<'a, T, R, E, F, Fut>(item: &'a T, work: &F, attempt: u32) -> AttemptOutcome<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    let started = Instant::now();
    match work(item).await {
        Ok(value) => AttemptOutcome {
            value: Some(value),
            failure: None,
            elapsed: started.elapsed(),
            attempt,
        },
        Err(e) => AttemptOutcome {
            value: None,
            failure: Some(ErrorDescriptor::failed(e.to_string())),
            elapsed: started.elapsed(),
            attempt,
        },
    }
}

//! Aggregate statistics over a batch of pipeline results.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::pipeline::{DocumentState, PipelineResult, Stage};

/// Totals for one run over many documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub documents: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Completed documents as a percentage of all documents.
    pub completion_percentage: f64,

    pub pages: usize,
    pub target_pages: usize,
    pub degraded_pages: usize,
    pub rows: usize,

    pub stage_failures: BTreeMap<Stage, usize>,

    /// Classification and extraction items that needed exactly `k` retries, keyed by `k`.
    pub retry_histogram: BTreeMap<u32, usize>,
    /// Share of successful items that needed at least one retry.
    pub retry_percentage: f64,

    pub total_elapsed_ms: u64,
    pub average_elapsed_ms: u64,
}

impl RunSummary {
    pub fn from_results(results: &[PipelineResult]) -> Self {
        let mut summary = Self {
            documents: results.len(),
            completed: 0,
            failed: 0,
            cancelled: 0,
            completion_percentage: 0.0,
            pages: 0,
            target_pages: 0,
            degraded_pages: 0,
            rows: 0,
            stage_failures: Stage::ALL.iter().map(|s| (*s, 0)).collect(),
            retry_histogram: BTreeMap::new(),
            retry_percentage: 0.0,
            total_elapsed_ms: 0,
            average_elapsed_ms: 0,
        };

        let mut total_elapsed = Duration::ZERO;
        let mut successful_items = 0usize;
        let mut retried_successes = 0usize;

        for result in results {
            match result.state {
                DocumentState::Completed => summary.completed += 1,
                DocumentState::Failed(_) => summary.failed += 1,
                DocumentState::Cancelled => summary.cancelled += 1,
                _ => {}
            }

            summary.pages += result.pages.len();
            summary.target_pages += result.pages.iter().filter(|p| p.is_target()).count();
            summary.degraded_pages += result.pages.iter().filter(|p| p.is_degraded()).count();
            summary.rows += result.rows.len();
            total_elapsed += result.total_elapsed;

            for stage in &result.stages {
                *summary.stage_failures.entry(stage.stage).or_insert(0) +=
                    stage.failure_count - stage.cancelled_count;

                // recognition is one call per document and never retried
                if stage.stage == Stage::Recognition {
                    continue;
                }
                for (retries, count) in &stage.retry_histogram {
                    *summary.retry_histogram.entry(*retries).or_insert(0) += count;
                }
                successful_items += stage.success_count;
                retried_successes += stage.retried_success_count;
            }
        }

        summary.completion_percentage = percentage(summary.completed, summary.documents);
        summary.retry_percentage = percentage(retried_successes, successful_items);
        summary.total_elapsed_ms = total_elapsed.as_millis() as u64;
        if !results.is_empty() {
            summary.average_elapsed_ms = summary.total_elapsed_ms / results.len() as u64;
        }

        summary
    }

    pub fn retried_items(&self) -> usize {
        self.retry_histogram
            .iter()
            .filter(|(retries, _)| **retries > 0)
            .map(|(_, count)| count)
            .sum()
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The work function returned an error on the final attempt.
    Failed,
    /// The runner was shut down before the item finished.
    Cancelled,
}

/// Data form of a failure, stored instead of propagating the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: "Cancelled before completion".to_string(),
        }
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of a single attempt at one item.
#[derive(Debug)]
pub struct AttemptOutcome<R> {
    pub value: Option<R>,
    pub failure: Option<ErrorDescriptor>,
    pub elapsed: Duration,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl<R> AttemptOutcome<R> {
    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }
}

/// Terminal, index-aligned outcome for one input item.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult<R> {
    pub succeeded: bool,
    pub value: Option<R>,
    pub failure: Option<ErrorDescriptor>,
    pub total_elapsed: Duration,
    pub retry_count: u32,
}

impl<R> BatchResult<R> {
    pub fn success(value: R, total_elapsed: Duration, retry_count: u32) -> Self {
        Self {
            succeeded: true,
            value: Some(value),
            failure: None,
            total_elapsed,
            retry_count,
        }
    }

    pub fn failure(failure: ErrorDescriptor, total_elapsed: Duration, retry_count: u32) -> Self {
        Self {
            succeeded: false,
            value: None,
            failure: Some(failure),
            total_elapsed,
            retry_count,
        }
    }

    /// Terminal result for an item that was never started.
    pub fn cancelled() -> Self {
        Self::failure(ErrorDescriptor::cancelled(), Duration::ZERO, 0)
    }

    /// The item never got a terminal result of its own because of shutdown.
    pub fn is_cancelled(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| f.kind == ErrorKind::Cancelled)
    }

    pub fn into_value(self) -> Option<R> {
        self.value
    }
}

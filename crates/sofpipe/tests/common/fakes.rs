//! Scripted collaborators with call accounting.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use sofpipe::ai::{Classification, Classifier, ExtractedRow, Extractor};
use sofpipe::error::{ClassificationError, ExtractionError, RecognitionError};
use sofpipe::processor::{DocumentFormat, RecognizedDocument, Recognizer};
use sofpipe::DocumentHandle;

/// Page text marker that the classifier treats as a statement of facts.
pub const SOF_MARKER: &str = "STATEMENT OF FACTS";

/// Builds a target page text.
pub fn sof_page(label: &str) -> String {
    format!("{} {}", SOF_MARKER, label)
}

/// Builds a non-target page text.
pub fn other_page(label: &str) -> String {
    format!("Cargo manifest {}", label)
}

/// Returns the same pages for every document, or fails every call.
pub struct ScriptedRecognizer {
    pages: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn pages(pages: Vec<String>) -> Self {
        Self {
            pages: Some(pages),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            pages: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        _document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.pages {
            Some(pages) => Ok(RecognizedDocument::from_texts(pages.iter().cloned())),
            None => Err(RecognitionError::unreadable("scan is corrupt")),
        }
    }

    fn supports(&self, _format: DocumentFormat) -> bool {
        true
    }
}

/// Classifies by `SOF_MARKER` and records the peak number of concurrent calls.
pub struct MarkerClassifier {
    delay: Duration,
    failing: Vec<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MarkerClassifier {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each call sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Every call for a page equal to `text` fails.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failing.push(text.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MarkerClassifier {
    async fn classify(&self, page_text: &str) -> Result<Classification, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|t| t == page_text) {
            return Err(ClassificationError::Status {
                status: 503,
                body: "overloaded".to_string(),
            });
        }

        Ok(Classification {
            is_target_type: page_text.contains(SOF_MARKER),
            confidence: 0.95,
        })
    }
}

/// Behaviour of one extraction batch, keyed by the batch's first page text.
#[derive(Debug, Clone, Copy)]
struct BatchScript {
    failures: u32,
    rows: usize,
}

/// Extractor whose answer per batch is scripted. Unscripted batches return one
/// row per page, echoing the page text.
pub struct ScriptedExtractor {
    scripts: HashMap<String, BatchScript>,
    calls: Mutex<HashMap<String, u32>>,
    delay: Duration,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        }
    }

    /// Each call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The batch starting with `first_page` returns `rows` rows.
    pub fn rows_for(mut self, first_page: &str, rows: usize) -> Self {
        self.scripts
            .insert(first_page.to_string(), BatchScript { failures: 0, rows });
        self
    }

    /// The batch starting with `first_page` fails `failures` times before succeeding.
    pub fn fail_times(mut self, first_page: &str, failures: u32) -> Self {
        self.scripts.insert(
            first_page.to_string(),
            BatchScript { failures, rows: 1 },
        );
        self
    }

    pub fn always_fail(self, first_page: &str) -> Self {
        self.fail_times(first_page, u32::MAX)
    }

    pub fn calls_for(&self, first_page: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(first_page)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, page_texts: &[String]) -> Result<Vec<ExtractedRow>, ExtractionError> {
        let key = page_texts.first().cloned().unwrap_or_default();
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.scripts.get(&key) {
            Some(script) if attempt <= script.failures => {
                Err(ExtractionError::Timeout(120))
            }
            Some(script) => Ok((0..script.rows)
                .map(|i| {
                    let mut row = ExtractedRow::new(format!("{} event {}", key, i));
                    row.date = Some("2024-03-08".to_string());
                    row.time = Some(format!("{:02}00", 8 + i % 10));
                    row
                })
                .collect()),
            None => Ok(page_texts.iter().map(ExtractedRow::new).collect()),
        }
    }
}

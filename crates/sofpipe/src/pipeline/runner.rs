use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::ai::{Classification, Classifier, ExtractedRow, Extractor, GeminiClient};
use crate::document::DocumentHandle;
use crate::error::ExtractionError;
use crate::processor::{RecognizedPage, Recognizer, RecognizerRegistry};
use crate::storage::ResultStore;
use crate::worker::{BatchResult, RetryPolicy, RunnerConfig, TaskRunner};

use super::batcher::PageBatcher;
use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{Cancelled, PipelineError, PipelineWarning};
use super::progress::{NoopProgress, ProgressEvent, ProgressReporter};
use super::types::{
    ClassificationStatus, ClassifiedPage, DocumentState, ExtractedEvent, PageType,
    PipelineResult, Stage, StageOutcome,
};

/// Runs documents through Recognition, Classification and Extraction.
///
/// Only a recognition failure ends a document early. Page and batch failures
/// are retried by the task runner and then recorded in the stage outcome; the
/// document still completes with whatever succeeded. A shutdown during a stage
/// ends the document as `Cancelled` and nothing is written.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    recognizer: Arc<dyn Recognizer>,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn Extractor>,
    store: Option<ResultStore>,
    runner: TaskRunner,
}

impl Pipeline {
    /// Production constructor: builds the recognizer registry and the Gemini client from config.
    pub fn from_config(config: Arc<PipelineConfig>) -> crate::error::Result<Self> {
        let recognizer = Arc::new(RecognizerRegistry::from_config(&config.recognition)?);
        let llm = Arc::new(GeminiClient::from_config(&config.llm)?);
        Ok(Self::new(config, recognizer, llm.clone(), llm))
    }

    pub fn new(
        config: Arc<PipelineConfig>,
        recognizer: Arc<dyn Recognizer>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let store = config.output_directory.as_ref().map(ResultStore::new);
        let runner = TaskRunner::new(config.runner.clone());
        Self {
            config,
            recognizer,
            classifier,
            extractor,
            store,
            runner,
        }
    }

    /// Replaces the retry policy used for page and batch calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        let flag = self.runner.shutdown_flag();
        self.runner = TaskRunner::with_retry_policy(self.config.runner.clone(), retry)
            .with_shutdown_flag(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stops claiming new pages, batches and documents. Calls in flight finish.
    pub fn shutdown(&self) {
        self.runner.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.runner.is_shutdown()
    }

    pub async fn run(&self, document: &DocumentHandle) -> PipelineResult {
        self.run_with_progress(document, &NoopProgress).await
    }

    pub async fn run_with_progress(
        &self,
        document: &DocumentHandle,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult {
        let span = info_span!("pipeline",
            document_id = %document.id,
            filename = %document.file_name(),
        );
        self.execute(document, progress).instrument(span).await
    }

    /// Runs independent pipelines over `documents`, at most `concurrency` at a
    /// time. Documents are not retried. Results are in input order.
    pub async fn run_all(
        &self,
        documents: &[DocumentHandle],
        concurrency: usize,
    ) -> Vec<PipelineResult> {
        let runner = TaskRunner::new(RunnerConfig {
            concurrency,
            max_retries: 0,
            ..self.config.runner.clone()
        })
        .with_shutdown_flag(self.runner.shutdown_flag());

        let results = runner
            .process_items(documents, |document| async move {
                Ok::<_, Infallible>(self.run(document).await)
            })
            .await;

        results
            .into_iter()
            .zip(documents)
            .map(|(result, document)| {
                result
                    .into_value()
                    .unwrap_or_else(|| cancelled_result(document))
            })
            .collect()
    }

    async fn execute(
        &self,
        document: &DocumentHandle,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult {
        let mut ctx = PipelineContext::new(document.clone());

        // Stage 1: Recognition
        ctx.state = DocumentState::RecognitionRunning;
        progress.report(ProgressEvent::StageStarted {
            stage: Stage::Recognition,
            message: "Recognizing document text...".to_string(),
        });
        if let Err(e) = self
            .step_recognize(&mut ctx)
            .instrument(info_span!("recognition"))
            .await
        {
            ctx.fail(&e);
            progress.report(ProgressEvent::Failed {
                error: e.to_string(),
            });
            return ctx.into_result();
        }

        // Stage 2: Classification
        ctx.state = DocumentState::ClassificationRunning;
        if let Err(cancelled) = self
            .step_classify(&mut ctx, progress)
            .instrument(info_span!("classification"))
            .await
        {
            return cancel(ctx, &cancelled, progress);
        }

        // Stage 3: Extraction
        ctx.state = DocumentState::ExtractionRunning;
        if let Err(cancelled) = self
            .step_extract(&mut ctx, progress)
            .instrument(info_span!("extraction"))
            .await
        {
            return cancel(ctx, &cancelled, progress);
        }

        ctx.state = DocumentState::Completed;
        let output_path = ctx
            .stages
            .last()
            .and_then(|s| s.output_path.as_ref())
            .map(|p| p.display().to_string());
        info!(
            pages = ctx.pages.len(),
            rows = ctx.rows.len(),
            "Document completed"
        );
        progress.report(ProgressEvent::Completed {
            row_count: ctx.rows.len(),
            output_path,
        });

        ctx.into_result()
    }

    async fn step_recognize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let started = Instant::now();
        match self.recognizer.recognize(&ctx.document).await {
            Ok(recognized) => {
                ctx.record_stage(StageOutcome::recognition(true, started.elapsed()));
                debug!(pages = recognized.page_count(), "Recognition finished");
                if recognized.pages.is_empty() {
                    ctx.warnings.push(PipelineWarning::NoPages);
                }
                ctx.recognized = Some(recognized);
                Ok(())
            }
            Err(e) => {
                ctx.record_stage(StageOutcome::recognition(false, started.elapsed()));
                Err(e.into())
            }
        }
    }

    async fn step_classify(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), Cancelled> {
        let pages = ctx.recognized.take().map(|r| r.pages).unwrap_or_default();
        progress.report(ProgressEvent::StageStarted {
            stage: Stage::Classification,
            message: format!("Classifying {} pages...", pages.len()),
        });

        let started = Instant::now();
        let classifier = self.classifier.as_ref();
        let results = self
            .runner
            .process_items_with_progress(
                &pages,
                |page| async move { classifier.classify(&page.text).await },
                |completed, total| {
                    progress.report(ProgressEvent::ItemFinished {
                        stage: Stage::Classification,
                        completed,
                        total,
                    })
                },
            )
            .await;

        let cancelled = self.is_shutdown() || results.iter().any(BatchResult::is_cancelled);
        let outcome = StageOutcome::from_results(Stage::Classification, &results, started.elapsed());
        let degraded = outcome.failure_count - outcome.cancelled_count;
        if degraded > 0 {
            warn!(
                failed = degraded,
                "Pages degraded to OTHER after classification failures"
            );
        }

        // unclassified pages are dropped rather than guessed as OTHER
        ctx.pages = pages
            .into_iter()
            .zip(results)
            .filter(|(_, result)| !result.is_cancelled())
            .map(|(page, result)| to_classified_page(page, result))
            .collect();
        ctx.record_stage(outcome);

        if cancelled {
            return Err(Cancelled {
                stage: Stage::Classification,
            });
        }
        Ok(())
    }

    async fn step_extract(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), Cancelled> {
        let targets: Vec<ClassifiedPage> =
            ctx.pages.iter().filter(|p| p.is_target()).cloned().collect();
        let batches = PageBatcher::split(&targets, self.config.batch_size);
        progress.report(ProgressEvent::StageStarted {
            stage: Stage::Extraction,
            message: format!(
                "Extracting events from {} pages in {} batches...",
                targets.len(),
                batches.len()
            ),
        });

        let started = Instant::now();
        let extractor = self.extractor.as_ref();
        let results = self
            .runner
            .process_items_with_progress(
                &batches,
                |batch| async move {
                    let rows = extractor.extract(&batch.texts()).await?;
                    validate_rows(&rows)?;
                    Ok::<_, ExtractionError>(rows)
                },
                |completed, total| {
                    progress.report(ProgressEvent::ItemFinished {
                        stage: Stage::Extraction,
                        completed,
                        total,
                    })
                },
            )
            .await;

        let cancelled = self.is_shutdown() || results.iter().any(BatchResult::is_cancelled);
        let mut outcome = StageOutcome::from_results(Stage::Extraction, &results, started.elapsed());
        let failed = outcome.failure_count - outcome.cancelled_count;
        if failed > 0 {
            warn!(failed, "Extraction batches failed after retries");
        }

        ctx.rows = batches
            .iter()
            .zip(results)
            .filter_map(|(batch, result)| {
                result
                    .into_value()
                    .map(|rows| (batch.page_indices(), rows))
            })
            .flat_map(|(source_pages, rows)| {
                rows.into_iter().map(move |row| ExtractedEvent {
                    source_pages: source_pages.clone(),
                    row,
                })
            })
            .collect();

        if cancelled {
            ctx.record_stage(outcome);
            return Err(Cancelled {
                stage: Stage::Extraction,
            });
        }

        if let Some(store) = &self.store {
            match store.write_rows(&ctx.document.id, &ctx.document.file_name(), &ctx.rows) {
                Ok(path) => outcome.output_path = Some(path),
                Err(e) => {
                    warn!(error = %e, "Failed to write extraction output");
                    ctx.warnings.push(PipelineWarning::OutputWriteFailed {
                        error: e.to_string(),
                    });
                }
            }
        }

        ctx.record_stage(outcome);
        Ok(())
    }
}

fn cancel(
    mut ctx: PipelineContext,
    cancelled: &Cancelled,
    progress: &dyn ProgressReporter,
) -> PipelineResult {
    ctx.cancel(cancelled);
    info!(
        pages = ctx.pages.len(),
        rows = ctx.rows.len(),
        "Document cancelled during {}",
        cancelled.stage
    );
    progress.report(ProgressEvent::Failed {
        error: cancelled.to_string(),
    });
    ctx.into_result()
}

fn to_classified_page(page: RecognizedPage, result: BatchResult<Classification>) -> ClassifiedPage {
    let failure = result.failure.clone();
    let (page_type, status) = match result.into_value() {
        Some(classification) => (
            if classification.is_target_type {
                PageType::Sof
            } else {
                PageType::Other
            },
            ClassificationStatus::Classified {
                confidence: classification.confidence,
            },
        ),
        None => (
            PageType::Other,
            ClassificationStatus::Degraded {
                reason: failure
                    .map(|f| f.message)
                    .unwrap_or_else(|| "classification failed".to_string()),
            },
        ),
    };

    ClassifiedPage {
        page_index: page.index,
        page_type,
        content: page.text,
        status,
    }
}

fn validate_rows(rows: &[ExtractedRow]) -> Result<(), ExtractionError> {
    for (i, row) in rows.iter().enumerate() {
        row.validate()
            .map_err(|reason| ExtractionError::MalformedResponse(format!("row {}: {}", i, reason)))?;
    }
    Ok(())
}

fn cancelled_result(document: &DocumentHandle) -> PipelineResult {
    let mut ctx = PipelineContext::new(document.clone());
    ctx.state = DocumentState::Cancelled;
    ctx.failure = Some("Cancelled before processing started".to_string());
    ctx.into_result()
}

//! Text recognition: turns a source document into an ordered list of page texts.

pub mod mistral;
pub mod pdf;
pub mod text;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{RecognitionConfig, RecognitionEngine};
use crate::document::DocumentHandle;
use crate::error::RecognitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Image,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" | "md" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp" | "gif" | "webp" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedPage {
    /// Zero-based position in the source document.
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedDocument {
    pub pages: Vec<RecognizedPage>,
}

impl RecognizedDocument {
    /// Numbers page texts 0..n in the given order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| RecognizedPage {
                index,
                text: text.into(),
            })
            .collect();
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(
        &self,
        document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError>;

    fn supports(&self, format: DocumentFormat) -> bool;
}

/// Routes documents to a recognizer by configured engine or file extension.
pub struct RecognizerRegistry {
    recognizers: Vec<Arc<dyn Recognizer>>,
    engine: RecognitionEngine,
    max_pages: Option<usize>,
}

impl RecognizerRegistry {
    /// Registry with the local text and PDF recognizers. Remote OCR is added
    /// only when the engine asks for it, since it needs an API key.
    pub fn from_config(config: &RecognitionConfig) -> crate::error::Result<Self> {
        let mut recognizers: Vec<Arc<dyn Recognizer>> = vec![
            Arc::new(text::PlainTextRecognizer::new()),
            Arc::new(pdf::PdfTextRecognizer::new()),
        ];

        if config.engine == RecognitionEngine::Mistral {
            recognizers.push(Arc::new(mistral::MistralOcrRecognizer::from_config(
                &config.mistral,
            )?));
        }

        Ok(Self {
            recognizers,
            engine: config.engine,
            max_pages: config.max_pages,
        })
    }

    pub fn new(recognizers: Vec<Arc<dyn Recognizer>>) -> Self {
        Self {
            recognizers,
            engine: RecognitionEngine::Auto,
            max_pages: None,
        }
    }

    pub fn with_engine(mut self, engine: RecognitionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn select(&self, format: DocumentFormat) -> Option<&Arc<dyn Recognizer>> {
        match self.engine {
            RecognitionEngine::Auto => self.recognizers.iter().find(|r| r.supports(format)),
            // remote OCR reads every format it supports, so prefer it when asked for
            RecognitionEngine::Mistral => self
                .recognizers
                .iter()
                .rev()
                .find(|r| r.supports(format)),
            RecognitionEngine::Text if format == DocumentFormat::Text => {
                self.recognizers.iter().find(|r| r.supports(format))
            }
            RecognitionEngine::Pdf if format == DocumentFormat::Pdf => {
                self.recognizers.iter().find(|r| r.supports(format))
            }
            RecognitionEngine::Text | RecognitionEngine::Pdf => None,
        }
    }
}

#[async_trait]
impl Recognizer for RecognizerRegistry {
    async fn recognize(
        &self,
        document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError> {
        let extension = document.extension();
        let format = DocumentFormat::from_extension(&extension)
            .ok_or_else(|| RecognitionError::unsupported(&extension))?;

        let recognizer = self
            .select(format)
            .ok_or_else(|| RecognitionError::unsupported(&extension))?;

        let mut recognized = recognizer.recognize(document).await?;
        if let Some(max) = self.max_pages {
            if recognized.pages.len() > max {
                tracing::debug!(
                    kept = max,
                    total = recognized.pages.len(),
                    "Truncating recognized pages"
                );
                recognized.pages.truncate(max);
            }
        }
        Ok(recognized)
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        self.recognizers.iter().any(|r| r.supports(format))
    }
}

use async_trait::async_trait;
use tracing::Instrument;

use crate::document::DocumentHandle;
use crate::error::RecognitionError;
use crate::processor::{DocumentFormat, RecognizedDocument, Recognizer};

/// Page separator in plain-text exports of scanned documents.
const FORM_FEED: char = '\x0c';

/// Reads `.txt`/`.md` files; form feeds separate pages.
pub struct PlainTextRecognizer;

impl PlainTextRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits on form feeds. A trailing form feed does not produce an extra page.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

async fn read_pages(document: &DocumentHandle) -> Result<RecognizedDocument, RecognitionError> {
    let text = tokio::fs::read_to_string(&document.path)
        .await
        .map_err(|e| {
            RecognitionError::unreadable(format!(
                "Failed to read {}: {}",
                document.file_name(),
                e
            ))
        })?;

    if text.trim().is_empty() {
        return Err(RecognitionError::unreadable(format!(
            "{} contains no text",
            document.file_name()
        )));
    }

    Ok(RecognizedDocument::from_texts(split_pages(&text)))
}

#[async_trait]
impl Recognizer for PlainTextRecognizer {
    async fn recognize(
        &self,
        document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError> {
        read_pages(document)
            .instrument(tracing::info_span!("processor.text"))
            .await
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionFailure;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_split_pages() {
        assert_eq!(split_pages("one"), vec!["one"]);
        assert_eq!(split_pages("one\x0ctwo\x0cthree"), vec!["one", "two", "three"]);
        assert_eq!(split_pages("one\x0ctwo\x0c\n"), vec!["one", "two"]);
    }

    #[test]
    fn test_split_pages_keeps_blank_middle_page() {
        assert_eq!(split_pages("one\x0c\x0cthree"), vec!["one", "", "three"]);
    }

    #[tokio::test]
    async fn test_recognize_text_file() {
        let mut temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(temp_file, "STATEMENT OF FACTS\nArrived 0600\x0cSailed 1800").unwrap();

        let recognizer = PlainTextRecognizer::new();
        let doc = recognizer
            .recognize(&DocumentHandle::new(temp_file.path()))
            .await
            .unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.pages[0].text.contains("Arrived 0600"));
        assert_eq!(doc.pages[1].index, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let recognizer = PlainTextRecognizer::new();
        let err = recognizer
            .recognize(&DocumentHandle::new("/nonexistent/sof.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, RecognitionFailure::Unreadable);
        assert!(err.message.contains("sof.txt"));
        assert!(!err.message.contains("/nonexistent"));
    }

    #[tokio::test]
    async fn test_empty_file_is_unreadable() {
        let temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        let err = PlainTextRecognizer::new()
            .recognize(&DocumentHandle::new(temp_file.path()))
            .await
            .unwrap_err();
        assert_eq!(err.reason, RecognitionFailure::Unreadable);
    }

    #[test]
    fn test_supports_only_text() {
        let recognizer = PlainTextRecognizer::new();
        assert!(recognizer.supports(DocumentFormat::Text));
        assert!(!recognizer.supports(DocumentFormat::Pdf));
    }
}

use async_trait::async_trait;
use tracing::Instrument;

use crate::document::DocumentHandle;
use crate::error::{RecognitionError, RecognitionFailure};
use crate::processor::{DocumentFormat, RecognizedDocument, Recognizer};

/// Reads the embedded text layer of a PDF, one page at a time.
///
/// Scanned PDFs without a text layer are reported as unreadable; those need
/// the remote OCR engine.
pub struct PdfTextRecognizer;

impl PdfTextRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfTextRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_page_texts(pdf_bytes: &[u8]) -> Result<Vec<String>, String> {
    let doc = lopdf::Document::load_mem(pdf_bytes).map_err(|e| format!("Failed to load PDF: {}", e))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                // keep the slot so page indices still match the source
                tracing::warn!(page = page_num, error = %e, "Failed to extract page text");
                pages.push(String::new());
            }
        }
    }
    Ok(pages)
}

async fn read_pdf(document: &DocumentHandle) -> Result<RecognizedDocument, RecognitionError> {
    let name = document.file_name();
    let pdf_bytes = tokio::fs::read(&document.path)
        .await
        .map_err(|e| RecognitionError::unreadable(format!("Failed to read {}: {}", name, e)))?;

    // lopdf parsing is CPU-bound
    let pages = tokio::task::spawn_blocking(move || extract_page_texts(&pdf_bytes))
        .await
        .map_err(|e| {
            RecognitionError::new(
                RecognitionFailure::ServiceError,
                format!("PDF text extraction task failed: {}", e),
            )
        })?
        .map_err(|msg| RecognitionError::unreadable(format!("{}: {}", name, msg)))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(RecognitionError::unreadable(format!(
            "{} has no embedded text layer",
            name
        )));
    }

    Ok(RecognizedDocument::from_texts(pages))
}

#[async_trait]
impl Recognizer for PdfTextRecognizer {
    async fn recognize(
        &self,
        document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError> {
        read_pdf(document)
            .instrument(tracing::info_span!("processor.pdf"))
            .await
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

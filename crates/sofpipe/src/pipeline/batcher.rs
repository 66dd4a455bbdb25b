use super::types::{ClassifiedPage, PageBatch};

/// Splits classified pages into fixed-size windows for extraction.
pub struct PageBatcher;

impl PageBatcher {
    /// Batch `k` holds pages `[k * batch_size, (k + 1) * batch_size)` in their
    /// original order; the last batch may be shorter. A `batch_size` of 0 is
    /// treated as 1. No pages means no batches.
    pub fn split(pages: &[ClassifiedPage], batch_size: usize) -> Vec<PageBatch> {
        pages
            .chunks(batch_size.max(1))
            .filter_map(|chunk| PageBatch::new(chunk.to_vec()))
            .collect()
    }
}

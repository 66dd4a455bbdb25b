use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A source document submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub id: String,
    pub path: PathBuf,
    /// MIME type of the source file (e.g., "application/pdf").
    pub mime_type: Option<String>,
}

impl DocumentHandle {
    /// Creates a handle with a fresh random id.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), path)
    }

    pub fn with_id<P: Into<PathBuf>>(id: impl Into<String>, path: P) -> Self {
        let path = path.into();
        let mime_type = detect_mime_type(&path);
        Self {
            id: id.into(),
            path,
            mime_type,
        }
    }

    /// File name without directories, for logs and output naming.
    pub fn file_name(&self) -> String {
        crate::sanitize::redact_path(&self.path)
    }

    /// Lowercase file extension, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
    }
}

fn detect_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_unique_ids() {
        let a = DocumentHandle::new("/docs/sof.pdf");
        let b = DocumentHandle::new("/docs/sof.pdf");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_mime_type_detected_from_extension() {
        let doc = DocumentHandle::with_id("doc-1", "/docs/Vessel SOF.PDF");
        assert_eq!(doc.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(doc.extension(), "pdf");
        assert_eq!(doc.file_name(), "Vessel SOF.PDF");
    }

    #[test]
    fn test_unknown_extension_has_no_mime_type() {
        let doc = DocumentHandle::with_id("doc-2", "/docs/scan");
        assert_eq!(doc.mime_type, None);
        assert_eq!(doc.extension(), "");
    }
}

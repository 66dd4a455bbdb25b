use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StorageError;
use crate::pipeline::types::ExtractedEvent;

/// Upper bound on numbered variants tried for one file name.
const MAX_CONFLICT_SUFFIX: u32 = 1000;

#[derive(Serialize)]
struct StoredExtraction<'a> {
    document_id: &'a str,
    source: &'a str,
    rows: &'a [ExtractedEvent],
}

/// Writes extraction output as pretty JSON, one file per document.
pub struct ResultStore {
    output_directory: PathBuf,
}

impl ResultStore {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Stores rows as `<source stem>.json`, never overwriting an existing file.
    pub fn write_rows(
        &self,
        document_id: &str,
        source: &str,
        rows: &[ExtractedEvent],
    ) -> Result<PathBuf, StorageError> {
        let content = serde_json::to_vec_pretty(&StoredExtraction {
            document_id,
            source,
            rows,
        })?;

        self.ensure_directory(&self.output_directory)?;

        let stem = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(document_id);

        self.store_with_atomic_creation(&format!("{}.json", stem), &content)
    }

    /// Creates the file with `create_new`, trying `name_2.json`, `name_3.json`, ...
    /// when the name is taken.
    fn store_with_atomic_creation(
        &self,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        use std::io::Write;

        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            None => (filename, None),
        };

        for counter in 1..=MAX_CONFLICT_SUFFIX {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = self.output_directory.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(self.output_directory.join(filename)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

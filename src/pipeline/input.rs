//! Input resolution: validate a user-supplied path before reading it.
//!
//! Failing here, before the document is buffered and long before the model
//! call, gives callers a precise message ("not found", "permission denied",
//! "unsupported format") instead of an opaque model refusal minutes later.

use crate::error::Doc2TtsError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions accepted as document input (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["pdf", "docx", "txt", "rtf", "md", "html", "htm"];

/// A validated local document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    path: PathBuf,
    extension: String,
}

impl ResolvedInput {
    /// Path to the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name for logs and stats.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Whether `ext` (any case, no dot) is a supported document format.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Resolve a local document path, validating existence, readability and
/// format.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<ResolvedInput, Doc2TtsError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Doc2TtsError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(Doc2TtsError::ReadFailed {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is a directory"),
            path,
        });
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !is_supported_extension(&extension) {
        return Err(Doc2TtsError::UnsupportedFormat { path, extension });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Doc2TtsError::PermissionDenied { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Doc2TtsError::FileNotFound { path });
        }
        Err(source) => return Err(Doc2TtsError::ReadFailed { path, source }),
    }

    debug!("Resolved local document: {}", path.display());
    Ok(ResolvedInput { path, extension })
}

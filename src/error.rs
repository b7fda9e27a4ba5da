//! Error types for the edgequake-doc2tts library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2TtsError`]: **Fatal**: the cleaning call cannot produce a
//!   chapter list (unreadable input, missing credential, model failure,
//!   contract violation). Returned as `Err(Doc2TtsError)` from the top-level
//!   `clean*` functions. Mapping is all-or-nothing: no partial chapter list
//!   ever accompanies an error.
//!
//! * [`ChapterWarning`]: **Non-fatal**: the response satisfied the contract
//!   but one chapter looks suspicious (e.g. an empty body). Stored inside
//!   [`crate::output::CleanedDocument`] so callers can decide whether to
//!   show, drop, or ignore it.
//!
//! Every fatal variant belongs to exactly one bucket of [`ErrorKind`], which
//! is what callers should match on when deciding how to present a failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2tts library.
#[derive(Debug, Error)]
pub enum Doc2TtsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one of the supported document formats.
    #[error("Unsupported document format '{extension}' for '{path}'\nSupported: PDF, DOCX, TXT, RTF, MD, HTML")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The document contains no bytes at all.
    #[error("Document '{name}' is empty")]
    EmptyDocument { name: String },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No usable API credential, or the service rejected it (401/403).
    #[error("Authentication error: {detail}")]
    AuthError { detail: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The model service could not be reached.
    #[error("Could not reach the model service: {detail}\nCheck your internet connection.")]
    Transport { detail: String },

    /// The request did not complete within the configured timeout.
    #[error("Model request timed out after {secs}s\nIncrease --api-timeout or process a smaller page range.")]
    Timeout { secs: u64 },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The service answered with a failure status, refused the document,
    /// or is overloaded.
    #[error("Model error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Model { status: Option<u16>, message: String },

    // ── Contract errors ───────────────────────────────────────────────────
    /// The model output did not conform to the response contract.
    #[error("Model response violates the chapter contract: {detail}")]
    SchemaViolation { detail: String },

    /// The contract was satisfied but the mapped chapter list is empty.
    #[error("The model returned no chapters.\nTry again or with a different document or page range.")]
    EmptyResult,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an exported chapter file or archive.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure buckets callers present to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Io,
    Auth,
    Transport,
    Model,
    SchemaViolation,
    EmptyResult,
    Configuration,
    Output,
    Internal,
}

impl Doc2TtsError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Doc2TtsError::FileNotFound { .. }
            | Doc2TtsError::PermissionDenied { .. }
            | Doc2TtsError::ReadFailed { .. }
            | Doc2TtsError::UnsupportedFormat { .. }
            | Doc2TtsError::EmptyDocument { .. } => ErrorKind::Io,
            Doc2TtsError::AuthError { .. } => ErrorKind::Auth,
            Doc2TtsError::Transport { .. } | Doc2TtsError::Timeout { .. } => ErrorKind::Transport,
            Doc2TtsError::Model { .. } => ErrorKind::Model,
            Doc2TtsError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Doc2TtsError::EmptyResult => ErrorKind::EmptyResult,
            Doc2TtsError::InvalidConfig(_) => ErrorKind::Configuration,
            Doc2TtsError::OutputWriteFailed { .. } => ErrorKind::Output,
            Doc2TtsError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn schema(detail: impl Into<String>) -> Self {
        Doc2TtsError::SchemaViolation {
            detail: detail.into(),
        }
    }
}

/// A non-fatal finding about a single chapter.
///
/// Stored alongside the chapters in [`crate::output::CleanedDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ChapterWarning {
    /// The model returned a chapter with no body text.
    #[error("Chapter {index} ('{title}') has no content")]
    EmptyContent { index: usize, title: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display_with_status() {
        let e = Doc2TtsError::Model {
            status: Some(503),
            message: "The model is overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 503"), "got: {msg}");
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn model_error_display_without_status() {
        let e = Doc2TtsError::Model {
            status: None,
            message: "prompt blocked: SAFETY".into(),
        };
        let msg = e.to_string();
        assert!(!msg.contains("HTTP"), "got: {msg}");
        assert!(msg.contains("SAFETY"));
    }

    #[test]
    fn timeout_display() {
        let e = Doc2TtsError::Timeout { secs: 600 };
        assert!(e.to_string().contains("600s"));
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            Doc2TtsError::FileNotFound { path: "a.pdf".into() }.kind(),
            ErrorKind::Io
        );
        assert_eq!(
            Doc2TtsError::AuthError { detail: "missing".into() }.kind(),
            ErrorKind::Auth
        );
        assert_eq!(Doc2TtsError::Timeout { secs: 1 }.kind(), ErrorKind::Transport);
        assert_eq!(Doc2TtsError::schema("bad").kind(), ErrorKind::SchemaViolation);
        assert_eq!(Doc2TtsError::EmptyResult.kind(), ErrorKind::EmptyResult);
    }

    #[test]
    fn empty_content_warning_display() {
        let w = ChapterWarning::EmptyContent {
            index: 2,
            title: "Appendix".into(),
        };
        assert!(w.to_string().contains("Appendix"));
        assert!(w.to_string().contains('2'));
    }
}

//! Document encoding: raw bytes → [`EncodedDocument`] with a declared media type.
//!
//! Gemini accepts documents as `inlineData` parts inside the JSON request
//! body, so the bytes travel base64-encoded. The whole file is buffered:
//! page-range filtering is an instruction to the model, never a truncation of
//! the input, because the model needs the surrounding pages to know where
//! page N starts.

use crate::error::Doc2TtsError;
use crate::pipeline::input::ResolvedInput;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";
pub const RTF_MIME: &str = "application/rtf";
pub const MARKDOWN_MIME: &str = "text/markdown";
pub const HTML_MIME: &str = "text/html";
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A document ready for inline transmission.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    /// Raw document bytes.
    pub bytes: Vec<u8>,
    /// Declared MIME type.
    pub media_type: String,
    /// Original file name, when the document came from disk.
    pub file_name: Option<String>,
}

impl EncodedDocument {
    /// Base64 form for the JSON request body.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Size of the raw payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn display_name(&self) -> String {
        self.file_name.clone().unwrap_or_else(|| "<bytes>".to_string())
    }
}

// Payloads are megabytes; Debug shows only the size.
impl std::fmt::Debug for EncodedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedDocument")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// MIME type for a document path, from its extension.
///
/// The supported formats are mapped explicitly (`mime_guess` reports
/// `text/x-markdown` for `.md` and `application/msword`-style types for some
/// office files, which Gemini rejects); anything else falls back to
/// `mime_guess`, then to `application/octet-stream`.
pub fn media_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let known = match ext.as_str() {
        "pdf" => Some(PDF_MIME),
        "docx" => Some(DOCX_MIME),
        "txt" => Some(TEXT_MIME),
        "rtf" => Some(RTF_MIME),
        "md" | "markdown" => Some(MARKDOWN_MIME),
        "html" | "htm" => Some(HTML_MIME),
        _ => None,
    };

    match known {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_MIME)
            .to_string(),
    }
}

/// Wrap in-memory bytes with a caller-declared media type.
pub fn encode_bytes(
    bytes: Vec<u8>,
    media_type: impl Into<String>,
) -> Result<EncodedDocument, Doc2TtsError> {
    let doc = EncodedDocument {
        bytes,
        media_type: media_type.into(),
        file_name: None,
    };
    ensure_not_empty(&doc)?;
    Ok(doc)
}

/// Read a resolved document fully into memory.
pub async fn encode_file(input: &ResolvedInput) -> Result<EncodedDocument, Doc2TtsError> {
    let path = input.path();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Doc2TtsError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Doc2TtsError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Doc2TtsError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let doc = EncodedDocument {
        bytes,
        media_type: media_type_for(path),
        file_name: Some(input.file_name()),
    };
    ensure_not_empty(&doc)?;

    debug!(
        "Encoded {} → {} bytes ({})",
        doc.display_name(),
        doc.len(),
        doc.media_type
    );
    Ok(doc)
}

fn ensure_not_empty(doc: &EncodedDocument) -> Result<(), Doc2TtsError> {
    if doc.is_empty() {
        return Err(Doc2TtsError::EmptyDocument {
            name: doc.display_name(),
        });
    }
    Ok(())
}

//! Output types returned by the cleaning entry points.

use crate::error::ChapterWarning;
use serde::{Deserialize, Serialize};

/// A titled, ordered unit of cleaned narration text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Result of one successful cleaning call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedDocument {
    /// Chapters in document order. Never empty.
    pub chapters: Vec<Chapter>,
    /// Non-fatal findings about individual chapters.
    pub warnings: Vec<ChapterWarning>,
    pub stats: CleaningStats,
}

impl CleanedDocument {
    /// Total characters of narration text across all chapters.
    pub fn total_chars(&self) -> usize {
        self.chapters.iter().map(|c| c.content.chars().count()).sum()
    }
}

/// Per-call statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningStats {
    /// Source file name, when cleaning a file.
    pub source: Option<String>,
    pub media_type: String,
    pub input_bytes: usize,
    pub model: String,
    pub chapter_count: usize,
    /// Prompt tokens as reported by the service.
    pub prompt_tokens: Option<u32>,
    /// Output tokens as reported by the service.
    pub output_tokens: Option<u32>,
    /// Wall-clock time of the model request.
    pub request_duration_ms: u64,
    pub total_duration_ms: u64,
}

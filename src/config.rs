//! Configuration types for document cleaning.
//!
//! Two structs split the knobs by who owns them:
//!
//! * [`CleaningOptions`] + [`SplitStrategy`]: *what* the model is asked to do
//!   with one document. They flow into [`crate::prompts::compose_instructions`]
//!   and nowhere else, so the composed instruction is a pure function of them.
//!
//! * [`CleaningConfig`]: *how* the call is made: model id, endpoint,
//!   credential, timeout, progress reporting. Built via its
//!   [`CleaningConfigBuilder`] like every other long-lived setting.

use crate::error::Doc2TtsError;
use crate::pipeline::gateway::{Credential, ModelGateway};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Gemini model. Long documents need the larger context window.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ── Cleaning directives ──────────────────────────────────────────────────

/// Cleaning directives for one invocation.
///
/// Each boolean toggles exactly one clause of the composed instruction; there
/// are no interactions between them. The defaults match a first-time user
/// who wants everything cleaned and the whole document processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningOptions {
    /// Remove repeating headers and footers.
    pub remove_headers_footers: bool,
    /// Remove page numbering.
    pub remove_page_numbers: bool,
    /// Collapse whitespace into a continuous text flow.
    pub normalize_whitespace: bool,
    /// Rewrite tables as readable sentences.
    pub linearize_tables: bool,
    /// First page to process (1-indexed, inclusive).
    pub start_page: Option<u32>,
    /// Last page to process (1-indexed, inclusive).
    pub end_page: Option<u32>,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_headers_footers: true,
            remove_page_numbers: true,
            normalize_whitespace: true,
            linearize_tables: true,
            start_page: None,
            end_page: None,
        }
    }
}

impl CleaningOptions {
    /// Restrict processing to the given page bounds.
    pub fn with_pages(mut self, start: Option<u32>, end: Option<u32>) -> Self {
        self.start_page = start;
        self.end_page = end;
        self
    }

    /// Strict validation for callers that collect pages from user input.
    ///
    /// The pipeline itself never calls this: an invalid range reaching
    /// [`Self::page_range`] degrades to a single-bound form instead.
    pub fn validate(&self) -> Result<(), Doc2TtsError> {
        if self.start_page == Some(0) || self.end_page == Some(0) {
            return Err(Doc2TtsError::InvalidConfig(
                "Pages are 1-indexed, minimum is 1".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_page, self.end_page) {
            if end < start {
                return Err(Doc2TtsError::InvalidConfig(format!(
                    "Invalid page range {start}-{end}: end page must be >= start page"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the page bounds into a [`PageRange`].
    ///
    /// `Some(0)` counts as unset. An inverted range keeps only the start
    /// bound.
    pub fn page_range(&self) -> PageRange {
        let start = self.start_page.filter(|&p| p > 0);
        let end = self.end_page.filter(|&p| p > 0);
        match (start, end) {
            (Some(s), Some(e)) if e >= s => PageRange::Between(s, e),
            (Some(s), Some(e)) => {
                tracing::warn!(
                    "End page {} precedes start page {}; processing from page {} onward",
                    e,
                    s,
                    s
                );
                PageRange::From(s)
            }
            (Some(s), None) => PageRange::From(s),
            (None, Some(e)) => PageRange::UpTo(e),
            (None, None) => PageRange::All,
        }
    }
}

/// The portion of the document the model is told to process.
///
/// Filtering happens by instruction only: the full document is always sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRange {
    /// Whole document; no range clause is emitted.
    All,
    /// Pages `start..=end`.
    Between(u32, u32),
    /// From `start` to the end of the document.
    From(u32),
    /// From the beginning up to `end`.
    UpTo(u32),
}

/// How the cleaned text is partitioned into chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Detect headings/sections and give each chapter its own title. (default)
    #[default]
    Auto,
    /// Return the whole document as a single chapter titled "Full Document".
    None,
}

// ── Call configuration ───────────────────────────────────────────────────

/// Configuration for the model call.
///
/// Built via [`CleaningConfig::builder()`] or using
/// [`CleaningConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2tts::{CleaningConfig, Credential};
///
/// let config = CleaningConfig::builder()
///     .model("gemini-2.5-flash")
///     .credential(Credential::new("my-key"))
///     .api_timeout_secs(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CleaningConfig {
    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_BASE_URL`].
    ///
    /// Override to point at a proxy or a local mock server.
    pub base_url: String,

    /// API credential used when no `gateway` is injected.
    pub credential: Option<Credential>,

    /// Pre-constructed gateway. Takes precedence over `credential`.
    pub gateway: Option<Arc<dyn ModelGateway>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Narration text should be a faithful rewrite of the source, not a
    /// creative one.
    pub temperature: f32,

    /// Timeout for the single model request in seconds. Default: 600.
    ///
    /// The model reads the entire document before answering; a 300-page PDF
    /// routinely takes several minutes.
    pub api_timeout_secs: u64,

    /// Custom preamble replacing the built-in TTS role description.
    pub system_prompt: Option<String>,

    /// Optional progress callback. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: None,
            gateway: None,
            temperature: 0.1,
            api_timeout_secs: 600,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CleaningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleaningConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .field("gateway", &self.gateway.as_ref().map(|_| "<dyn ModelGateway>"))
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CleaningProgressCallback>"),
            )
            .finish()
    }
}

impl CleaningConfig {
    /// Create a new builder for `CleaningConfig`.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CleaningConfig`].
#[derive(Debug)]
pub struct CleaningConfigBuilder {
    config: CleaningConfig,
}

impl CleaningConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.config.gateway = Some(gateway);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CleaningConfig, Doc2TtsError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Doc2TtsError::InvalidConfig("Model id must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Doc2TtsError::InvalidConfig(format!(
                "Base URL must be an HTTP/HTTPS URL, got '{}'",
                c.base_url
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(Doc2TtsError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_clean_everything() {
        let o = CleaningOptions::default();
        assert!(o.remove_headers_footers);
        assert!(o.remove_page_numbers);
        assert!(o.normalize_whitespace);
        assert!(o.linearize_tables);
        assert_eq!(o.page_range(), PageRange::All);
    }

    #[test]
    fn page_range_forms() {
        let base = CleaningOptions::default();
        assert_eq!(
            base.clone().with_pages(Some(5), Some(20)).page_range(),
            PageRange::Between(5, 20)
        );
        assert_eq!(base.clone().with_pages(Some(5), None).page_range(), PageRange::From(5));
        assert_eq!(base.clone().with_pages(None, Some(20)).page_range(), PageRange::UpTo(20));
        assert_eq!(base.with_pages(Some(7), Some(7)).page_range(), PageRange::Between(7, 7));
    }

    #[test]
    fn inverted_range_keeps_start_bound() {
        let o = CleaningOptions::default().with_pages(Some(20), Some(5));
        assert_eq!(o.page_range(), PageRange::From(20));
        assert!(o.validate().is_err());
    }

    #[test]
    fn zero_page_counts_as_unset() {
        let o = CleaningOptions::default().with_pages(Some(0), Some(9));
        assert_eq!(o.page_range(), PageRange::UpTo(9));
        assert!(o.validate().is_err());
    }

    #[test]
    fn split_strategy_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&SplitStrategy::Auto).unwrap(), "\"auto\"");
        assert_eq!(serde_json::to_string(&SplitStrategy::None).unwrap(), "\"none\"");
        let s: SplitStrategy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(s, SplitStrategy::None);
    }

    #[test]
    fn builder_validates() {
        assert!(CleaningConfig::builder().model("  ").build().is_err());
        assert!(CleaningConfig::builder().base_url("ftp://x").build().is_err());
        assert!(CleaningConfig::builder().api_timeout_secs(0).build().is_err());
        let c = CleaningConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_credential() {
        let c = CleaningConfig::builder()
            .credential(Credential::new("super-secret-key"))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret-key"), "got: {dbg}");
    }
}

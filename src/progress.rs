//! Progress-callback trait for cleaning events.
//!
//! Inject an [`Arc<dyn CleaningProgressCallback>`] via
//! [`crate::config::CleaningConfigBuilder::progress_callback`] to receive
//! events as the call moves through its stages. The model request is one
//! long wait (often minutes), so the useful signals are "document read",
//! "request sent" and "answer mapped"; a terminal front-end typically shows
//! a spinner between the last two.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2tts::{CleaningConfig, CleaningProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl CleaningProgressCallback for Log {
//!     fn on_request_start(&self, model: &str) {
//!         eprintln!("waiting for {model}…");
//!     }
//! }
//!
//! let config = CleaningConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn CleaningProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the cleaning pipeline at each stage.
///
/// Implementations must be `Send + Sync`; independent calls may run on
/// different tasks and share one callback. All methods default to no-ops.
pub trait CleaningProgressCallback: Send + Sync {
    /// The document was read and encoded.
    ///
    /// # Arguments
    /// * `bytes`     : raw document size
    /// * `media_type`: declared MIME type
    fn on_document_encoded(&self, bytes: usize, media_type: &str) {
        let _ = (bytes, media_type);
    }

    /// The model request is about to be sent.
    fn on_request_start(&self, model: &str) {
        let _ = model;
    }

    /// The response was validated and mapped.
    ///
    /// # Arguments
    /// * `chapters`: number of chapters produced
    fn on_request_complete(&self, chapters: usize) {
        let _ = chapters;
    }

    /// The call failed; no chapters will be produced.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleaningProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CleaningConfig`].
pub type ProgressCallback = Arc<dyn CleaningProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        encoded: AtomicUsize,
        started: Mutex<Option<String>>,
        chapters: AtomicUsize,
        errors: AtomicUsize,
    }

    impl CleaningProgressCallback for TrackingCallback {
        fn on_document_encoded(&self, bytes: usize, _media_type: &str) {
            self.encoded.store(bytes, Ordering::SeqCst);
        }

        fn on_request_start(&self, model: &str) {
            *self.started.lock().unwrap() = Some(model.to_string());
        }

        fn on_request_complete(&self, chapters: usize) {
            self.chapters.store(chapters, Ordering::SeqCst);
        }

        fn on_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_encoded(10, "application/pdf");
        cb.on_request_start("gemini-2.5-pro");
        cb.on_request_complete(3);
        cb.on_error("boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_document_encoded(2048, "application/pdf");
        tracker.on_request_start("gemini-2.5-pro");
        tracker.on_request_complete(4);

        assert_eq!(tracker.encoded.load(Ordering::SeqCst), 2048);
        assert_eq!(tracker.started.lock().unwrap().as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(tracker.chapters.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_request_start("m");
        cb.on_request_complete(1);
    }
}

//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a document moves through extraction and rendering. The CLI uses
//! it to drive a spinner; a GUI would use it to update its status line.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2deck::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::Arc;
//!
//! struct StatusLine;
//!
//! impl ConversionProgressCallback for StatusLine {
//!     fn on_extraction_complete(&self, question_count: usize) {
//!         eprintln!("Recognised {question_count} questions");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StatusLine) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the document is resolved, just before the AI request.
    ///
    /// # Arguments
    /// * `name`: file name or URL of the document
    /// * `bytes`: size of the raw document
    fn on_extraction_start(&self, name: &str, bytes: usize) {
        let _ = (name, bytes);
    }

    /// Called when the extraction result has been parsed.
    fn on_extraction_complete(&self, question_count: usize) {
        let _ = question_count;
    }

    /// Called when extraction fails; `error` is the user-facing message.
    fn on_extraction_error(&self, error: &str) {
        let _ = error;
    }

    /// Called every time a deck is packaged, including re-downloads.
    ///
    /// # Arguments
    /// * `file_name`  : download file name
    /// * `slide_count`: slides in the deck, title slide included
    fn on_deck_ready(&self, file_name: &str, slide_count: usize) {
        let _ = (file_name, slide_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        questions: AtomicUsize,
        errors: AtomicUsize,
        decks: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, _name: &str, _bytes: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, question_count: usize) {
            self.questions.store(question_count, Ordering::SeqCst);
        }

        fn on_extraction_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_deck_ready(&self, file_name: &str, _slide_count: usize) {
            self.decks.lock().unwrap().push(file_name.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start("de-thi.pdf", 1024);
        cb.on_extraction_complete(12);
        cb.on_extraction_error("boom");
        cb.on_deck_ready("De_Thi_Interactive.pptx", 13);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_start("a.pdf", 10);
        tracker.on_extraction_complete(4);
        tracker.on_deck_ready("A_Interactive.pptx", 5);
        tracker.on_deck_ready("A_Interactive.pptx", 5);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.questions.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.decks.lock().unwrap().len(), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start("x.png", 1);
        cb.on_deck_ready("X_Interactive.pptx", 1);
    }
}

//! Single-flight conversion session.
//!
//! A [`Session`] is the library form of the upload screen: one document at a
//! time, the last successful result kept for re-download, and the deck
//! delivered automatically the moment a conversion succeeds.
//!
//! ```text
//!         convert()             success
//!  Idle ─────────────▶ Processing ─────────▶ Ready(result)
//!   ▲                      │                   │  │
//!   │       failure        │                   │  │ download_again()
//!   ├──────────────────────┘                   │  └──────▶ (stays Ready)
//!   │                 reset()                  │
//!   └──────────────────────────────────────────┘
//! ```
//!
//! `convert()` while `Processing` fails with [`DocDeckError::Busy`]. The
//! state lock is only held for transitions, never across an `.await`.

use crate::config::ConversionConfig;
use crate::convert;
use crate::error::DocDeckError;
use crate::pipeline::input::{self, SourceDocument};
use crate::quiz::ExtractionResult;
use crate::sink::DeckSink;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Processing,
    Ready(Arc<ExtractionResult>),
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    last_error: Option<String>,
}

/// One user's conversion workflow.
pub struct Session {
    config: ConversionConfig,
    sink: Arc<dyn DeckSink>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: ConversionConfig, sink: Arc<dyn DeckSink>) -> Self {
        Self {
            config,
            sink,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                last_error: None,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// User-facing message of the last failed conversion or delivery,
    /// cleared when the next one starts or a delivery succeeds.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// The current result, if the session is `Ready`.
    pub fn result(&self) -> Option<Arc<ExtractionResult>> {
        match &self.lock().state {
            SessionState::Ready(result) => Some(Arc::clone(result)),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.lock().state, SessionState::Processing)
    }

    /// Convert a file path or URL and deliver the deck.
    ///
    /// Returns where the sink stored the deck.
    pub async fn convert(&self, input_str: &str) -> Result<PathBuf, DocDeckError> {
        let guard = self.begin()?;
        let doc = match input::resolve_input(input_str, self.config.download_timeout_secs).await {
            Ok(doc) => doc,
            Err(e) => return Err(guard.fail(e)),
        };
        self.finish(guard, &doc).await
    }

    /// Convert in-memory document bytes and deliver the deck.
    pub async fn convert_bytes(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<PathBuf, DocDeckError> {
        let guard = self.begin()?;
        let doc = match SourceDocument::from_bytes(name, bytes) {
            Ok(doc) => doc,
            Err(e) => return Err(guard.fail(e)),
        };
        self.finish(guard, &doc).await
    }

    /// Re-render the current result and deliver it again.
    ///
    /// Rendering is deterministic, so every delivery carries identical bytes
    /// under the same file name.
    pub fn download_again(&self) -> Result<PathBuf, DocDeckError> {
        let result = self.result().ok_or(DocDeckError::NoResult)?;
        self.deliver(&result)
    }

    /// Drop the current result and any recorded error.
    ///
    /// Has no effect while a conversion is in flight.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, SessionState::Processing) {
            warn!("reset ignored: conversion in progress");
            return;
        }
        inner.state = SessionState::Idle;
        inner.last_error = None;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Idle/Ready → Processing, or `Busy`.
    fn begin(&self) -> Result<ProcessingGuard<'_>, DocDeckError> {
        let mut inner = self.lock();
        if matches!(inner.state, SessionState::Processing) {
            return Err(DocDeckError::Busy);
        }
        inner.state = SessionState::Processing;
        inner.last_error = None;
        Ok(ProcessingGuard {
            session: self,
            armed: true,
        })
    }

    async fn finish(
        &self,
        guard: ProcessingGuard<'_>,
        doc: &SourceDocument,
    ) -> Result<PathBuf, DocDeckError> {
        let result = match convert::extract_document(doc, &self.config).await {
            Ok(result) => Arc::new(result),
            Err(e) => return Err(guard.fail(e)),
        };
        guard.succeed(Arc::clone(&result));
        info!("Session ready: {} questions", result.question_count());
        self.deliver(&result)
    }

    /// Render and hand the deck to the sink. A failure here keeps the
    /// session `Ready` and records the message, so the user can retry with
    /// `download_again`.
    fn deliver(&self, result: &ExtractionResult) -> Result<PathBuf, DocDeckError> {
        let delivered =
            convert::render(result, &self.config).and_then(|deck| self.sink.deliver(&deck));
        let mut inner = self.lock();
        match &delivered {
            Ok(_) => inner.last_error = None,
            Err(e) => {
                warn!("Deck delivery failed: {e}");
                inner.last_error = Some(e.to_string());
            }
        }
        delivered
    }
}

/// Returns the session to `Idle` unless the conversion succeeded, including
/// when the conversion future is dropped mid-flight.
struct ProcessingGuard<'a> {
    session: &'a Session,
    armed: bool,
}

impl ProcessingGuard<'_> {
    fn succeed(mut self, result: Arc<ExtractionResult>) {
        self.armed = false;
        self.session.lock().state = SessionState::Ready(result);
    }

    fn fail(mut self, error: DocDeckError) -> DocDeckError {
        self.armed = false;
        let mut inner = self.session.lock();
        inner.state = SessionState::Idle;
        inner.last_error = Some(error.to_string());
        error
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.lock().state = SessionState::Idle;
        }
    }
}

//! Error type for the edgequake-doc2deck library.
//!
//! Extraction is all-or-nothing: there is no partial result to salvage, so a
//! single fatal error type covers every stage. Two variants carry the generic
//! user-facing messages shown to educators when the AI service misbehaves:
//!
//! * [`DocDeckError::ServiceBusy`]: the request never produced a response
//!   (network failure, timeout, non-2xx status).
//! * [`DocDeckError::AnalysisFailed`]: a response arrived but its text was
//!   empty or not the JSON shape we asked for.
//!
//! Both keep a `detail` string for logs; it is not part of the message.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-doc2deck library.
#[derive(Debug, Error)]
pub enum DocDeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The document is not a PDF, Word document or supported image.
    #[error("Unsupported document '{name}' (detected: {detected})\nAccepted: PDF, DOC/DOCX, PNG, JPEG, GIF, WebP, BMP, TIFF.")]
    UnsupportedDocument { name: String, detected: String },

    // ── AI service errors ─────────────────────────────────────────────────
    /// No API key or endpoint is available for the extraction service.
    #[error("AI provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Network failure or non-2xx status from the AI service.
    #[error("Hệ thống bận, Thầy vui lòng thử lại. (system busy, please retry)")]
    ServiceBusy { detail: String },

    /// Empty response text, or text that does not parse as an extraction result.
    #[error("Lỗi hệ thống khi phân tích tài liệu. (system error analysing the document)")]
    AnalysisFailed { detail: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// A conversion is already in flight on this session.
    #[error("A document is already being processed; wait for it to finish")]
    Busy,

    /// A re-download was requested before any extraction succeeded.
    #[error("No extraction result available; convert a document first")]
    NoResult,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the .pptx package failed.
    #[error("Failed to render slide deck: {0}")]
    RenderFailed(String),

    /// Could not create or write the output deck file.
    #[error("Failed to write output file '{path}': {source}")]
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

impl DocDeckError {
    /// Diagnostic detail for the two generic AI-service errors.
    ///
    /// Their `Display` is deliberately generic; logs want the real cause.
    pub fn detail(&self) -> Option<&str> {
        match self {
            DocDeckError::ServiceBusy { detail } | DocDeckError::AnalysisFailed { detail } => {
                Some(detail)
            }
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DocDeckError {
    fn from(e: zip::result::ZipError) -> Self {
        DocDeckError::RenderFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_busy_hides_detail() {
        let e = DocDeckError::ServiceBusy {
            detail: "connection reset by peer".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("system busy"), "got: {msg}");
        assert!(!msg.contains("connection reset"));
        assert_eq!(e.detail(), Some("connection reset by peer"));
    }

    #[test]
    fn analysis_failed_display() {
        let e = DocDeckError::AnalysisFailed {
            detail: "empty response text".into(),
        };
        assert!(e.to_string().contains("analysing the document"));
        assert_eq!(e.detail(), Some("empty response text"));
    }

    #[test]
    fn unsupported_document_display() {
        let e = DocDeckError::UnsupportedDocument {
            name: "notes.txt".into(),
            detected: "unknown".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("PDF"));
    }

    #[test]
    fn detail_absent_for_other_variants() {
        assert_eq!(DocDeckError::Busy.detail(), None);
        assert_eq!(DocDeckError::RenderFailed("x".into()).detail(), None);
    }
}

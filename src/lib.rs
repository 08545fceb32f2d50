//! # edgequake-doc2deck
//!
//! Turn a quiz document (PDF, Word or a photo of a worksheet) into an
//! interactive PowerPoint deck, using Google Gemini to read the questions.
//!
//! ## Why this crate?
//!
//! Teachers already have their exercises as scanned tests and Word files.
//! Retyping them into slides is slow and error-prone, especially with
//! chemical formulae. This crate sends the document to a multimodal model
//! with a strict response schema, gets back every question as typed data,
//! and lays it out on a consistent chalkboard-style deck with the answers
//! revealed on click.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input    read local file or download URL, sniff MIME type
//!  ├─ 2. Encode   bytes → base64 inline data
//!  ├─ 3. Extract  one schema-constrained Gemini call → ExtractionResult
//!  ├─ 4. Polish   cleanup rules (stray rules, blank-fill underscores, …)
//!  ├─ 5. Layout   title slide + one slide per question
//!  └─ 6. Package  deterministic .pptx, handed to a DeckSink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2deck::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let config = ConversionConfig::default();
//!     let (path, stats) = convert_to_file("de-kiem-tra.pdf", "decks", &config).await?;
//!     eprintln!("{} questions → {}", stats.questions, path.display());
//!     Ok(())
//! }
//! ```
//!
//! For an upload-screen style workflow (one document at a time, download
//! again on demand) use [`Session`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2deck` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-doc2deck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod session;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, DeckConfig};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_file, extract, inspect, render,
};
pub use error::DocDeckError;
pub use output::{ConversionOutput, ConversionStats, DocumentInfo, RenderedDeck};
pub use pipeline::encode::InlineDocument;
pub use pipeline::llm::{GeminiExtractor, QuestionExtractor};
pub use pipeline::pptx::render_deck;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use quiz::{
    AnswerChoice, ExtractionResult, LintWarning, QuestionBody, QuestionKind, QuestionRecord,
};
pub use session::{Session, SessionState};
pub use sink::{DeckSink, DirectorySink};

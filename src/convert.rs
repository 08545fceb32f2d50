//! One-shot conversion entry points.
//!
//! These functions run the whole pipeline for a single document and return.
//! They hold no state between calls; [`crate::session::Session`] builds the
//! single-flight, re-downloadable workflow on top of the same stage helpers
//! ([`extract_document`] and [`render`]).

use crate::config::ConversionConfig;
use crate::error::DocDeckError;
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo, RenderedDeck};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::llm::{GeminiExtractor, QuestionExtractor};
use crate::pipeline::{encode, postprocess, pptx};
use crate::quiz::ExtractionResult;
use crate::sink::{DeckSink, DirectorySink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a document file or URL into a slide deck.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str`: Local file path or HTTP/HTTPS URL to a PDF, Word document or image
/// * `config`: Conversion configuration
///
/// # Errors
/// Everything is fatal: there is no partial deck. The AI-service failures
/// surface as [`DocDeckError::ServiceBusy`] and [`DocDeckError::AnalysisFailed`].
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocDeckError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);
    let doc = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_document(&doc, config).await
}

/// Convert document bytes held in memory.
///
/// `name` is only used for logs and progress events; the type is detected
/// from the bytes.
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2deck::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("de-kiem-tra.pdf")?;
/// let config = ConversionConfig::default();
/// let output = convert_from_bytes("de-kiem-tra.pdf", bytes, &config).await?;
/// std::fs::write(&output.deck.file_name, &output.deck.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocDeckError> {
    let doc = SourceDocument::from_bytes(name, bytes)?;
    convert_document(&doc, config).await
}

/// Convert a document and write the deck into `output_dir`.
///
/// The file name is derived from the extracted title. Returns the written
/// path and the conversion stats.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionStats), DocDeckError> {
    let output = convert(input_str, config).await?;
    let path = DirectorySink::new(output_dir.as_ref()).deliver(&output.deck)?;
    Ok((path, output.stats))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocDeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocDeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Resolve and type-check a document without calling the AI service.
///
/// Does not require an API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    download_timeout_secs: u64,
) -> Result<DocumentInfo, DocDeckError> {
    let doc = input::resolve_input(input_str.as_ref(), download_timeout_secs).await?;
    Ok(DocumentInfo {
        name: doc.name,
        mime_type: doc.mime_type.to_string(),
        size_bytes: doc.bytes.len(),
    })
}

/// Resolve a document and extract its questions, without rendering.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ExtractionResult, DocDeckError> {
    let doc = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract_document(&doc, config).await
}

/// Extract and clean the questions of an already-resolved document.
///
/// Fires `on_extraction_start`, then either `on_extraction_complete` or
/// `on_extraction_error`. Lint findings are logged, never fatal.
pub async fn extract_document(
    doc: &SourceDocument,
    config: &ConversionConfig,
) -> Result<ExtractionResult, DocDeckError> {
    let extractor = resolve_extractor(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(&doc.name, doc.bytes.len());
    }

    let inline = encode::encode_document(doc);
    let result = match extractor.extract(&inline).await {
        Ok(result) => postprocess::clean_result(result),
        Err(e) => {
            if let Some(detail) = e.detail() {
                warn!("Extraction via {} failed: {}", extractor.name(), detail);
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_extraction_error(&e.to_string());
            }
            return Err(e);
        }
    };

    for (i, question) in result.slides.iter().enumerate() {
        for warning in question.lint() {
            warn!("Question {} ({}): {}", i + 1, question.kind(), warning);
        }
    }

    info!(
        "Extracted {} questions from '{}' via {}",
        result.question_count(),
        doc.name,
        extractor.name()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(result.question_count());
    }
    Ok(result)
}

/// Render a result into a deck and announce it to the progress callback.
pub fn render(result: &ExtractionResult, config: &ConversionConfig) -> Result<RenderedDeck, DocDeckError> {
    let deck = pptx::render_deck(result, &config.deck)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_ready(&deck.file_name, deck.slide_count);
    }
    Ok(deck)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_document(
    doc: &SourceDocument,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocDeckError> {
    let extract_start = Instant::now();
    let result = extract_document(doc, config).await?;
    let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

    let render_start = Instant::now();
    let deck = render(&result, config)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    debug!("Rendered deck in {}ms", render_duration_ms);

    let mut stats = ConversionStats {
        input_bytes: doc.bytes.len(),
        mime_type: doc.mime_type.to_string(),
        slides: deck.slide_count,
        extraction_duration_ms,
        render_duration_ms,
        ..ConversionStats::default()
    };
    stats.count_questions(&result);

    info!(
        "Conversion complete: {} questions → {} slides, {}ms",
        stats.questions,
        stats.slides,
        extraction_duration_ms + render_duration_ms
    );

    Ok(ConversionOutput {
        result,
        deck,
        stats,
    })
}

/// Pick the extractor: a pre-built one from the config, else Gemini.
fn resolve_extractor(config: &ConversionConfig) -> Result<Arc<dyn QuestionExtractor>, DocDeckError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    Ok(Arc::new(GeminiExtractor::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ConversionProgressCallback;
    use crate::quiz::{AnswerChoice, QuestionRecord};
    use crate::pipeline::encode::InlineDocument;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedExtractor(Result<ExtractionResult, String>);

    #[async_trait]
    impl QuestionExtractor for FixedExtractor {
        async fn extract(&self, _document: &InlineDocument) -> Result<ExtractionResult, DocDeckError> {
            self.0.clone().map_err(|detail| DocDeckError::AnalysisFailed { detail })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl ConversionProgressCallback for Events {
        fn on_extraction_start(&self, name: &str, bytes: usize) {
            self.0.lock().unwrap().push(format!("start {name} {bytes}"));
        }
        fn on_extraction_complete(&self, question_count: usize) {
            self.0.lock().unwrap().push(format!("complete {question_count}"));
        }
        fn on_extraction_error(&self, _error: &str) {
            self.0.lock().unwrap().push("error".into());
        }
        fn on_deck_ready(&self, file_name: &str, slide_count: usize) {
            self.0.lock().unwrap().push(format!("deck {file_name} {slide_count}"));
        }
    }

    fn config_with(
        outcome: Result<ExtractionResult, String>,
        events: Arc<Events>,
    ) -> ConversionConfig {
        ConversionConfig::builder()
            .extractor(Arc::new(FixedExtractor(outcome)))
            .progress_callback(events)
            .build()
            .unwrap()
    }

    fn sample() -> ExtractionResult {
        ExtractionResult::new(
            "Bai Kiem Tra",
            vec![QuestionRecord::multiple_choice(
                "1",
                "Câu 1: Chọn đáp án\n_______",
                vec![
                    AnswerChoice::new("A", "H₂O", true),
                    AnswerChoice::new("B", "CO₂", false),
                ],
            )],
        )
    }

    #[tokio::test]
    async fn converts_bytes_end_to_end() {
        let events = Arc::new(Events::default());
        let config = config_with(Ok(sample()), events.clone());

        let output = convert_from_bytes("de.pdf", b"%PDF-1.4 x".to_vec(), &config)
            .await
            .unwrap();

        assert_eq!(output.deck.file_name, "Bai_Kiem_Tra_Interactive.pptx");
        assert_eq!(output.deck.slide_count, 2);
        assert_eq!(output.stats.questions, 1);
        assert_eq!(output.stats.multiple_choice, 1);
        assert_eq!(output.stats.mime_type, "application/pdf");
        // Post-processing ran before rendering.
        assert_eq!(output.result.slides[0].question_text, "Câu 1: Chọn đáp án");

        let seen = events.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "start de.pdf 10".to_string(),
                "complete 1".to_string(),
                "deck Bai_Kiem_Tra_Interactive.pptx 2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn extraction_failure_fires_error_event() {
        let events = Arc::new(Events::default());
        let config = config_with(Err("empty response text".into()), events.clone());

        let err = convert_from_bytes("de.pdf", b"%PDF-1.4".to_vec(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocDeckError::AnalysisFailed { .. }));
        let seen = events.0.lock().unwrap().clone();
        assert_eq!(seen.last().map(String::as_str), Some("error"));
        assert!(!seen.iter().any(|e| e.starts_with("deck")));
    }

    #[tokio::test]
    async fn unsupported_bytes_never_reach_extractor() {
        let events = Arc::new(Events::default());
        let config = config_with(Ok(sample()), events.clone());
        let err = convert_from_bytes("notes.txt", b"plain text".to_vec(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocDeckError::UnsupportedDocument { .. }));
        assert!(events.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn convert_to_file_writes_named_deck() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("de.pdf");
        std::fs::write(&src, b"%PDF-1.7").unwrap();
        let config = config_with(Ok(sample()), Arc::new(Events::default()));

        let (path, stats) = convert_to_file(src.to_str().unwrap(), tmp.path().join("out"), &config)
            .await
            .unwrap();
        assert!(path.ends_with("out/Bai_Kiem_Tra_Interactive.pptx"));
        assert_eq!(stats.slides, 2);
        assert!(std::fs::read(&path).unwrap().starts_with(b"PK"));
    }

    #[tokio::test]
    async fn inspect_needs_no_extractor() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("scan.pdf");
        std::fs::write(&src, b"%PDF-1.7 body").unwrap();
        let info = inspect(src.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(info.name, "scan.pdf");
        assert_eq!(info.mime_type, "application/pdf");
        assert_eq!(info.size_bytes, 13);
    }
}

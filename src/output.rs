//! Output types: the rendered deck and the per-conversion report.

use crate::quiz::{ExtractionResult, QuestionKind};
use serde::{Deserialize, Serialize};

/// A packaged `.pptx` ready to be handed to a [`crate::sink::DeckSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDeck {
    /// Download file name derived from the result title.
    pub file_name: String,
    /// The complete Office Open XML package.
    pub bytes: Vec<u8>,
    /// Title slide included.
    pub slide_count: usize,
}

/// Everything produced by one call to [`crate::convert::convert`].
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub result: ExtractionResult,
    pub deck: RenderedDeck,
    pub stats: ConversionStats,
}

/// What [`crate::convert::inspect`] learns without calling the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub mime_type: String,
    pub questions: usize,
    pub multiple_choice: usize,
    pub true_false: usize,
    pub short_answer: usize,
    pub slides: usize,
    pub extraction_duration_ms: u64,
    pub render_duration_ms: u64,
}

impl ConversionStats {
    /// Fill the question counters from a result.
    pub fn count_questions(&mut self, result: &ExtractionResult) {
        self.questions = result.question_count();
        self.multiple_choice = result.count_of(QuestionKind::MultipleChoice);
        self.true_false = result.count_of(QuestionKind::TrueFalse);
        self.short_answer = result.count_of(QuestionKind::ShortAnswer);
    }
}

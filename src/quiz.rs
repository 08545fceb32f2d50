//! Quiz data model: what the extractor produces and the renderer consumes.
//!
//! The AI service answers with a flat JSON record per question where the
//! `type` field decides which of `options`, `trueFalseParts` or `shortAnswer`
//! is meaningful. Internally that becomes the closed [`QuestionBody`] union so
//! every consumer has to match all three kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three question kinds the extractor classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
        };
        f.write_str(s)
    }
}

/// A labelled statement that is either correct or not.
///
/// Used for multiple-choice options (`A`, `B`, …) and true/false parts
/// (`a`, `b`, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerChoice {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerChoice {
    pub fn new(label: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            is_correct,
        }
    }
}

/// Kind-specific payload of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    MultipleChoice { options: Vec<AnswerChoice> },
    TrueFalse { parts: Vec<AnswerChoice> },
    ShortAnswer { answer: String },
}

impl QuestionBody {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionBody::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionBody::ShortAnswer { .. } => QuestionKind::ShortAnswer,
        }
    }
}

/// One extracted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireQuestion", into = "WireQuestion")]
pub struct QuestionRecord {
    /// Opaque id assigned by the extractor, unique within a result.
    pub id: String,
    pub question_text: String,
    pub body: QuestionBody,
    /// Worked explanation, when the model provides one. Never rendered.
    pub explanation: Option<String>,
}

impl QuestionRecord {
    pub fn multiple_choice(
        id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<AnswerChoice>,
    ) -> Self {
        Self::with_body(id, question, QuestionBody::MultipleChoice { options })
    }

    pub fn true_false(
        id: impl Into<String>,
        question: impl Into<String>,
        parts: Vec<AnswerChoice>,
    ) -> Self {
        Self::with_body(id, question, QuestionBody::TrueFalse { parts })
    }

    pub fn short_answer(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self::with_body(
            id,
            question,
            QuestionBody::ShortAnswer {
                answer: answer.into(),
            },
        )
    }

    fn with_body(id: impl Into<String>, question: impl Into<String>, body: QuestionBody) -> Self {
        Self {
            id: id.into(),
            question_text: question.into(),
            body,
            explanation: None,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    /// Soft consistency checks on the extracted answer key.
    ///
    /// The answer key is trusted from the model, so findings are reported
    /// rather than enforced. An empty list means nothing looked off.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();
        if self.question_text.trim().is_empty() {
            warnings.push(LintWarning::EmptyQuestion);
        }
        match &self.body {
            QuestionBody::MultipleChoice { options } => {
                if options.is_empty() {
                    warnings.push(LintWarning::NoOptions);
                } else {
                    let correct = options.iter().filter(|o| o.is_correct).count();
                    if correct == 0 {
                        warnings.push(LintWarning::NoCorrectOption);
                    } else if correct > 1 {
                        warnings.push(LintWarning::SeveralCorrectOptions(correct));
                    }
                }
            }
            QuestionBody::TrueFalse { parts } => {
                if parts.is_empty() {
                    warnings.push(LintWarning::NoOptions);
                }
            }
            QuestionBody::ShortAnswer { answer } => {
                if answer.trim().is_empty() {
                    warnings.push(LintWarning::EmptyAnswer);
                }
            }
        }
        warnings
    }
}

/// Finding reported by [`QuestionRecord::lint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintWarning {
    EmptyQuestion,
    NoOptions,
    NoCorrectOption,
    SeveralCorrectOptions(usize),
    EmptyAnswer,
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintWarning::EmptyQuestion => f.write_str("question text is empty"),
            LintWarning::NoOptions => f.write_str("no options or parts were extracted"),
            LintWarning::NoCorrectOption => f.write_str("no option is marked correct"),
            LintWarning::SeveralCorrectOptions(n) => write!(f, "{n} options are marked correct"),
            LintWarning::EmptyAnswer => f.write_str("short answer is empty"),
        }
    }
}

/// Title plus questions in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub slides: Vec<QuestionRecord>,
}

impl ExtractionResult {
    pub fn new(title: impl Into<String>, slides: Vec<QuestionRecord>) -> Self {
        Self {
            title: title.into(),
            slides,
        }
    }

    pub fn question_count(&self) -> usize {
        self.slides.len()
    }

    /// Number of questions of the given kind.
    pub fn count_of(&self, kind: QuestionKind) -> usize {
        self.slides.iter().filter(|q| q.kind() == kind).count()
    }
}

// ── Wire form ────────────────────────────────────────────────────────────

/// Flat JSON shape used by the AI response schema and saved results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: QuestionKind,
    #[serde(default)]
    question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<AnswerChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    true_false_parts: Option<Vec<AnswerChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    short_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl From<WireQuestion> for QuestionRecord {
    fn from(w: WireQuestion) -> Self {
        let body = match w.kind {
            QuestionKind::MultipleChoice => QuestionBody::MultipleChoice {
                options: w.options.unwrap_or_default(),
            },
            QuestionKind::TrueFalse => QuestionBody::TrueFalse {
                parts: w.true_false_parts.unwrap_or_default(),
            },
            QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
                answer: w.short_answer.unwrap_or_default(),
            },
        };
        QuestionRecord {
            id: w.id,
            question_text: w.question,
            body,
            explanation: w.explanation,
        }
    }
}

impl From<QuestionRecord> for WireQuestion {
    fn from(q: QuestionRecord) -> Self {
        let kind = q.kind();
        let mut wire = WireQuestion {
            id: q.id,
            kind,
            question: q.question_text,
            options: None,
            true_false_parts: None,
            short_answer: None,
            explanation: q.explanation,
        };
        match q.body {
            QuestionBody::MultipleChoice { options } => wire.options = Some(options),
            QuestionBody::TrueFalse { parts } => wire.true_false_parts = Some(parts),
            QuestionBody::ShortAnswer { answer } => wire.short_answer = Some(answer),
        }
        wire
    }
}

//! Post-processing: deterministic cleanup of extracted question text.
//!
//! The prompt already asks the model to drop stray rules and blank-fill
//! underscores, but models do not always comply, and scanned worksheets are
//! full of both. These rules run on every string of the result before
//! rendering. Each is a pure `&str → String` pass and the whole chain is
//! idempotent, so cleaning a saved result twice changes nothing.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the line-based rules see `\n` only;
//! rule lines are dropped before blank-line collapsing so the gap they leave
//! is collapsed too.

use crate::quiz::{AnswerChoice, ExtractionResult, QuestionBody, QuestionRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to every text field of the result.
pub fn clean_result(result: ExtractionResult) -> ExtractionResult {
    ExtractionResult {
        title: clean_text(&result.title),
        slides: result.slides.into_iter().map(clean_record).collect(),
    }
}

fn clean_record(record: QuestionRecord) -> QuestionRecord {
    let body = match record.body {
        QuestionBody::MultipleChoice { options } => QuestionBody::MultipleChoice {
            options: options.into_iter().map(clean_choice).collect(),
        },
        QuestionBody::TrueFalse { parts } => QuestionBody::TrueFalse {
            parts: parts.into_iter().map(clean_choice).collect(),
        },
        QuestionBody::ShortAnswer { answer } => QuestionBody::ShortAnswer {
            answer: clean_text(&answer),
        },
    };
    QuestionRecord {
        id: record.id,
        question_text: clean_text(&record.question_text),
        body,
        explanation: record.explanation.map(|e| clean_text(&e)),
    }
}

fn clean_choice(choice: AnswerChoice) -> AnswerChoice {
    AnswerChoice {
        label: clean_text(&choice.label),
        text: clean_text(&choice.text),
        is_correct: choice.is_correct,
    }
}

/// Clean one string.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
/// 3. Drop lines that are only a rule of underscores, dashes or `=`
/// 4. Collapse blank-fill underscore runs to `___`
/// 5. Trim trailing whitespace per line
/// 6. Collapse runs of blank lines to one
/// 7. Trim
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_rule_lines(&s);
    let s = collapse_underscores(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Drop stray rule lines ────────────────────────────────────────────

static RE_RULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[_\-–—=]{3,}\s*$").unwrap());

fn remove_rule_lines(input: &str) -> String {
    input
        .lines()
        .filter(|line| !RE_RULE_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank-fill underscores ──────────────────────────────────

static RE_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{4,}").unwrap());

fn collapse_underscores(input: &str) -> String {
    RE_UNDERSCORES.replace_all(input, "___").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Deck layout: map an [`ExtractionResult`] onto positioned slide elements.
//!
//! This stage decides *what goes where*; [`crate::pipeline::pptx`] decides
//! how it is spelled in Office Open XML. Keeping the two apart lets the
//! layout rules be tested on plain structs instead of zipped XML.
//!
//! Geometry is in inches on a 10 × 5.625 in (16:9) slide. Every question
//! slide has the same skeleton: accent bar, question number, question text,
//! then one answer block chosen by the question kind, then the footer.
//! Elements flagged `reveal` are hidden until the presenter clicks, so the
//! answer key can be shown after the class has answered.

use crate::config::DeckConfig;
use crate::quiz::{AnswerChoice, ExtractionResult, QuestionBody, QuestionRecord};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SLIDE_WIDTH: f64 = 10.0;
pub const SLIDE_HEIGHT: f64 = 5.625;

/// Top of the answer block on question slides.
const OPTIONS_Y: f64 = 2.8;
/// Left edges of the two multiple-choice columns.
const OPTION_COLUMNS_X: [f64; 2] = [1.3, 5.6];
const OPTION_ROW_PITCH: f64 = 0.9;
const OPTION_WIDTH: f64 = 4.1;
const OPTION_HEIGHT: f64 = 0.75;
const TRUE_FALSE_ROW_PITCH: f64 = 0.65;

/// Glyph placed on the correct multiple-choice option.
pub const CORRECT_MARK: &str = "✦";
pub const TRUE_BADGE: &str = "ĐÚNG ✔";
pub const FALSE_BADGE: &str = "SAI ✘";
pub const SHORT_ANSWER_PREFIX: &str = "ĐÁP SỐ: ";
/// Shown when a short answer was extracted empty.
pub const EMPTY_ANSWER: &str = "---";

/// An `RRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub &'static str);

/// Fixed chalkboard palette.
pub mod palette {
    use super::Color;

    pub const BACKGROUND: Color = Color("1A4417");
    pub const NEON_BLUE: Color = Color("38BDF8");
    pub const NEON_PURPLE: Color = Color("A855F7");
    pub const NEON_PINK: Color = Color("F472B6");
    pub const WHITE: Color = Color("FFFFFF");
    pub const SUBTLE_TEXT: Color = Color("94A3B8");
    pub const DARK_CARD: Color = Color("0D250C");
    pub const SUCCESS: Color = Color("22C55E");
}

use palette::*;

/// Position and size in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Frame {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Rect,
    /// Corner radius in inches.
    RoundRect { radius: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: Color,
    /// 0 = opaque, 100 = invisible.
    pub transparency: u8,
}

impl Fill {
    pub const fn solid(color: Color) -> Self {
        Self {
            color,
            transparency: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub color: Color,
    pub width_pt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Middle,
}

/// A styled run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size_pt: u32,
    pub color: Color,
    pub bold: bool,
}

/// Text content of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub runs: Vec<TextRun>,
    pub align: Align,
    pub anchor: Anchor,
}

/// One drawable on a slide: a shape, a text box, or text on a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub frame: Frame,
    pub geometry: Geometry,
    pub fill: Option<Fill>,
    pub outline: Option<Outline>,
    pub text: Option<TextBody>,
    /// Hidden until the presenter clicks.
    pub reveal: bool,
}

impl Element {
    fn shape(frame: Frame, geometry: Geometry, fill: Fill) -> Self {
        Self {
            frame,
            geometry,
            fill: Some(fill),
            outline: None,
            text: None,
            reveal: false,
        }
    }

    fn text(frame: Frame, run: TextRun, align: Align, anchor: Anchor) -> Self {
        Self::rich_text(frame, vec![run], align, anchor)
    }

    fn rich_text(frame: Frame, runs: Vec<TextRun>, align: Align, anchor: Anchor) -> Self {
        Self {
            frame,
            geometry: Geometry::Rect,
            fill: None,
            outline: None,
            text: Some(TextBody {
                runs,
                align,
                anchor,
            }),
            reveal: false,
        }
    }

    fn outlined(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    fn on_background(mut self, geometry: Geometry, fill: Fill) -> Self {
        self.geometry = geometry;
        self.fill = Some(fill);
        self
    }

    fn revealed(mut self) -> Self {
        self.reveal = true;
        self
    }

    /// Concatenated run text, empty for pure shapes.
    pub fn plain_text(&self) -> String {
        self.text
            .as_ref()
            .map(|t| t.runs.iter().map(|r| r.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub background: Color,
    pub elements: Vec<Element>,
}

impl Slide {
    fn new() -> Self {
        Self {
            background: BACKGROUND,
            elements: Vec::new(),
        }
    }

    fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Text of every element, in drawing order, skipping pure shapes.
    pub fn texts(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter(|e| e.text.is_some())
            .map(Element::plain_text)
            .collect()
    }
}

/// A laid-out deck: title slide first, then one slide per question.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckLayout {
    pub title: String,
    pub slides: Vec<Slide>,
}

fn run(text: impl Into<String>, size_pt: u32, color: Color, bold: bool) -> TextRun {
    TextRun {
        text: text.into(),
        size_pt,
        color,
        bold,
    }
}

// ── Text rules ───────────────────────────────────────────────────────────

static RE_QUESTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Câu|Bài|C\^au)\s+\d+[\s.:-]*\s*").unwrap());

/// Remove the leading "Câu N:" / "Bài N." enumeration from question text.
///
/// Repeated prefixes ("Bài 2. Câu 1: …") are all removed, so applying the
/// function to its own output never changes it.
pub fn strip_question_prefix(text: &str) -> String {
    let mut s = text.trim();
    while let Some(m) = RE_QUESTION_PREFIX.find(s) {
        if m.end() == 0 {
            break;
        }
        s = s[m.end()..].trim();
    }
    s.to_string()
}

/// Question font size: shorter text gets a larger font.
pub fn font_size_for(text: &str) -> u32 {
    match text.chars().count() {
        0..120 => 20,
        120..250 => 17,
        _ => 14,
    }
}

/// Download file name: whitespace runs become `_`, plus `_Interactive.pptx`.
pub fn deck_file_name(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        let illegal = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        stem.push(if illegal || c.is_control() { '_' } else { c });
    }
    if stem.is_empty() {
        stem.push_str("Untitled");
    }
    format!("{stem}_Interactive.pptx")
}

/// Grid cell `(column, row)` of the multiple-choice option at `index`.
pub fn option_cell(index: usize) -> (usize, usize) {
    (index % 2, index / 2)
}

// ── Slides ───────────────────────────────────────────────────────────────

/// Lay out the whole deck. Pure: the same input always yields the same layout.
pub fn layout_deck(result: &ExtractionResult, deck: &DeckConfig) -> DeckLayout {
    let mut slides = Vec::with_capacity(result.slides.len() + 1);
    slides.push(title_slide(&result.title, deck));
    slides.extend(
        result
            .slides
            .iter()
            .enumerate()
            .map(|(i, q)| question_slide(i + 1, q, deck)),
    );
    DeckLayout {
        title: result.title.clone(),
        slides,
    }
}

fn title_slide(title: &str, deck: &DeckConfig) -> Slide {
    let mut slide = Slide::new();
    slide.push(Element::shape(
        Frame::new(0.0, 0.0, SLIDE_WIDTH, 0.1),
        Geometry::Rect,
        Fill::solid(NEON_BLUE),
    ));
    slide.push(Element::text(
        Frame::new(0.5, 1.8, 9.0, 1.5),
        run(title.to_uppercase(), 44, WHITE, true),
        Align::Center,
        Anchor::Middle,
    ));
    slide.push(Element::shape(
        Frame::new(3.5, 3.3, 3.0, 0.05),
        Geometry::Rect,
        Fill::solid(NEON_PINK),
    ));
    if let Some(byline) = deck.byline.as_deref().filter(|b| !b.trim().is_empty()) {
        slide.push(Element::text(
            Frame::new(0.5, 3.5, 9.0, 0.5),
            run(byline, 18, NEON_BLUE, true),
            Align::Center,
            Anchor::Middle,
        ));
    }
    slide
}

fn question_slide(number: usize, question: &QuestionRecord, deck: &DeckConfig) -> Slide {
    let mut slide = Slide::new();
    let text = strip_question_prefix(&question.question_text);
    let size = font_size_for(&text);

    slide.push(Element::shape(
        Frame::new(0.1, 0.0, 0.05, SLIDE_HEIGHT),
        Geometry::Rect,
        Fill::solid(NEON_PURPLE),
    ));
    slide.push(Element::text(
        Frame::new(0.3, 0.2, 0.8, 0.8),
        run(number.to_string(), 36, NEON_PINK, true),
        Align::Center,
        Anchor::Middle,
    ));
    slide.push(Element::text(
        Frame::new(0.3, 0.8, 0.8, 0.2),
        run(deck.question_caption.as_str(), 10, SUBTLE_TEXT, true),
        Align::Center,
        Anchor::Middle,
    ));
    slide.push(Element::text(
        Frame::new(1.3, 0.4, 8.2, 1.8),
        run(text, size, WHITE, true),
        Align::Left,
        Anchor::Top,
    ));

    match &question.body {
        QuestionBody::MultipleChoice { options } => {
            for (i, option) in options.iter().enumerate() {
                push_option(&mut slide, i, option);
            }
        }
        QuestionBody::TrueFalse { parts } => {
            for (i, part) in parts.iter().enumerate() {
                push_true_false_part(&mut slide, i, part);
            }
        }
        QuestionBody::ShortAnswer { answer } => push_short_answer(&mut slide, answer),
    }

    slide.push(Element::text(
        Frame::new(0.0, 5.3, SLIDE_WIDTH, 0.3),
        run(deck.footer.as_str(), 9, SUBTLE_TEXT, true),
        Align::Center,
        Anchor::Middle,
    ));
    slide
}

fn push_option(slide: &mut Slide, index: usize, option: &AnswerChoice) {
    let (column, row) = option_cell(index);
    let x = OPTION_COLUMNS_X[column];
    let y = OPTIONS_Y + row as f64 * OPTION_ROW_PITCH;
    let card = Frame::new(x, y, OPTION_WIDTH, OPTION_HEIGHT);
    let rounded = Geometry::RoundRect { radius: 0.05 };

    slide.push(
        Element::shape(card, rounded, Fill::solid(DARK_CARD)).outlined(Outline {
            color: NEON_PURPLE,
            width_pt: 1.0,
        }),
    );
    slide.push(
        Element::text(
            Frame::new(x + 0.1, y + 0.1, 0.4, 0.5),
            run(option.label.as_str(), 22, NEON_BLUE, true),
            Align::Center,
            Anchor::Middle,
        )
        .on_background(Geometry::RoundRect { radius: 0.5 }, Fill::solid(BACKGROUND)),
    );
    slide.push(Element::text(
        Frame::new(x + 0.6, y, 3.3, OPTION_HEIGHT),
        run(option.text.as_str(), 17, WHITE, false),
        Align::Left,
        Anchor::Middle,
    ));

    if option.is_correct {
        slide.push(
            Element::shape(
                card,
                rounded,
                Fill {
                    color: SUCCESS,
                    transparency: 80,
                },
            )
            .outlined(Outline {
                color: SUCCESS,
                width_pt: 3.0,
            })
            .revealed(),
        );
        slide.push(
            Element::text(
                Frame::new(x + 3.7, y, 0.4, OPTION_HEIGHT),
                run(CORRECT_MARK, 20, SUCCESS, true),
                Align::Center,
                Anchor::Middle,
            )
            .revealed(),
        );
    }
}

fn push_true_false_part(slide: &mut Slide, index: usize, part: &AnswerChoice) {
    let y = OPTIONS_Y + index as f64 * TRUE_FALSE_ROW_PITCH;

    slide.push(
        Element::shape(Frame::new(1.3, y, 7.2, 0.5), Geometry::Rect, Fill::solid(DARK_CARD))
            .outlined(Outline {
                color: NEON_PURPLE,
                width_pt: 1.0,
            }),
    );
    slide.push(Element::text(
        Frame::new(1.4, y, 7.0, 0.5),
        run(format!("{}. {}", part.label, part.text), 15, WHITE, false),
        Align::Left,
        Anchor::Middle,
    ));

    let (badge, color) = if part.is_correct {
        (TRUE_BADGE, SUCCESS)
    } else {
        (FALSE_BADGE, NEON_PINK)
    };
    slide.push(
        Element::text(
            Frame::new(8.6, y, 1.1, 0.5),
            run(badge, 11, WHITE, true),
            Align::Center,
            Anchor::Middle,
        )
        .on_background(Geometry::RoundRect { radius: 0.05 }, Fill::solid(color))
        .revealed(),
    );
}

fn push_short_answer(slide: &mut Slide, answer: &str) {
    let answer = if answer.trim().is_empty() {
        EMPTY_ANSWER
    } else {
        answer
    };
    slide.push(
        Element::rich_text(
            Frame::new(1.0, 3.0, 8.0, 1.0),
            vec![
                run(SHORT_ANSWER_PREFIX, 32, NEON_BLUE, true),
                run(answer, 32, WHITE, true),
            ],
            Align::Center,
            Anchor::Middle,
        )
        .revealed(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::AnswerChoice;

    fn sample() -> ExtractionResult {
        ExtractionResult::new(
            "Bai Kiem Tra",
            vec![
                QuestionRecord::multiple_choice(
                    "q1",
                    "Câu 1: Công thức của nước?",
                    vec![
                        AnswerChoice::new("A", "H2O", true),
                        AnswerChoice::new("B", "H2O2", false),
                    ],
                ),
                QuestionRecord::true_false(
                    "q2",
                    "Câu 2. Xét các phát biểu sau",
                    vec![
                        AnswerChoice::new("a", "Nước là hợp chất", true),
                        AnswerChoice::new("b", "Nước là đơn chất", false),
                    ],
                ),
                QuestionRecord::short_answer("q3", "Bài 3 - Tính số mol", ""),
            ],
        )
    }

    fn find<'a>(slide: &'a Slide, text: &str) -> &'a Element {
        slide
            .elements
            .iter()
            .find(|e| e.plain_text() == text)
            .unwrap_or_else(|| panic!("no element with text {text:?}"))
    }

    #[test]
    fn strips_enumeration_prefix() {
        assert_eq!(strip_question_prefix("Câu 5: 2H2 + O2 -> ?"), "2H2 + O2 -> ?");
        assert_eq!(strip_question_prefix("  Bài 12.  Cân bằng"), "Cân bằng");
        assert_eq!(strip_question_prefix("CÂU 3 - Nêu"), "Nêu");
        assert_eq!(strip_question_prefix("C^au 7: x"), "x");
        assert_eq!(strip_question_prefix("Câu hỏi mở"), "Câu hỏi mở");
        assert_eq!(strip_question_prefix(""), "");
    }

    #[test]
    fn prefix_stripping_is_idempotent() {
        for text in [
            "Câu 5: 2H2 + O2 -> ?",
            "Bài 2. Câu 1: Tính",
            "2H2 + O2 -> ?",
            "   ",
            "Câu 10",
        ] {
            let once = strip_question_prefix(text);
            assert_eq!(strip_question_prefix(&once), once, "input {text:?}");
        }
    }

    #[test]
    fn font_size_tiers() {
        assert_eq!(font_size_for(&"x".repeat(119)), 20);
        assert_eq!(font_size_for(&"x".repeat(120)), 17);
        assert_eq!(font_size_for(&"x".repeat(249)), 17);
        assert_eq!(font_size_for(&"x".repeat(250)), 14);
        // Vietnamese diacritics count as one character each.
        assert_eq!(font_size_for(&"ễ".repeat(119)), 20);
    }

    #[test]
    fn font_size_is_monotonic() {
        let mut last = u32::MAX;
        for len in 0..400 {
            let size = font_size_for(&"a".repeat(len));
            assert!(size <= last, "size grew at length {len}");
            last = size;
        }
    }

    #[test]
    fn file_name_from_title() {
        assert_eq!(deck_file_name("Bai Kiem Tra"), "Bai_Kiem_Tra_Interactive.pptx");
        assert_eq!(deck_file_name("Đề  thi\tHK1"), "Đề_thi_HK1_Interactive.pptx");
        assert_eq!(deck_file_name("Hóa 11/12: ôn tập"), "Hóa_11_12__ôn_tập_Interactive.pptx");
        assert_eq!(deck_file_name("   "), "Untitled_Interactive.pptx");
    }

    #[test]
    fn one_slide_per_question_plus_title() {
        let deck = layout_deck(&sample(), &DeckConfig::default());
        assert_eq!(deck.slides.len(), 4);
        assert_eq!(deck.slides[0].texts(), vec!["BAI KIEM TRA".to_string()]);
    }

    #[test]
    fn byline_only_when_configured() {
        let deck = DeckConfig {
            byline: Some("BIÊN SOẠN: TỔ HÓA".into()),
            ..DeckConfig::default()
        };
        let layout = layout_deck(&sample(), &deck);
        assert!(layout.slides[0]
            .texts()
            .contains(&"BIÊN SOẠN: TỔ HÓA".to_string()));
    }

    #[test]
    fn question_slide_skeleton() {
        let deck = layout_deck(&sample(), &DeckConfig::default());
        let slide = &deck.slides[1];
        let texts = slide.texts();
        assert_eq!(texts[0], "1");
        assert_eq!(texts[1], "CÂU HỎI");
        assert_eq!(texts[2], "Công thức của nước?");
        assert_eq!(texts.last().unwrap(), crate::config::DEFAULT_FOOTER);

        let question = find(slide, "Công thức của nước?");
        assert_eq!(question.text.as_ref().unwrap().runs[0].size_pt, 20);
        assert_eq!(question.frame, Frame::new(1.3, 0.4, 8.2, 1.8));
    }

    #[test]
    fn multiple_choice_two_column_grid() {
        assert_eq!(option_cell(0), (0, 0));
        assert_eq!(option_cell(1), (1, 0));
        assert_eq!(option_cell(2), (0, 1));
        assert_eq!(option_cell(3), (1, 1));

        let deck = layout_deck(&sample(), &DeckConfig::default());
        let slide = &deck.slides[1];

        let a = find(slide, "A");
        let b = find(slide, "B");
        assert_eq!(a.frame.x, 1.3 + 0.1);
        assert_eq!(b.frame.x, 5.6 + 0.1);
        assert_eq!(a.frame.y, b.frame.y);

        // Only the correct option gets the mark and the green overlay.
        let marks: Vec<&Element> = slide
            .elements
            .iter()
            .filter(|e| e.plain_text() == CORRECT_MARK)
            .collect();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].frame.x, 1.3 + 3.7);
        let overlays = slide
            .elements
            .iter()
            .filter(|e| e.fill.map(|f| f.color) == Some(SUCCESS) && e.text.is_none())
            .count();
        assert_eq!(overlays, 1);
    }

    #[test]
    fn third_option_starts_second_row() {
        let result = ExtractionResult::new(
            "T",
            vec![QuestionRecord::multiple_choice(
                "1",
                "q",
                vec![
                    AnswerChoice::new("A", "a", false),
                    AnswerChoice::new("B", "b", false),
                    AnswerChoice::new("C", "c", true),
                ],
            )],
        );
        let deck = layout_deck(&result, &DeckConfig::default());
        let c = find(&deck.slides[1], "C");
        assert!((c.frame.x - 1.4).abs() < 1e-9);
        assert!((c.frame.y - (2.8 + 0.9 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn true_false_rows_with_badges() {
        let deck = layout_deck(&sample(), &DeckConfig::default());
        let slide = &deck.slides[2];
        let first = find(slide, "a. Nước là hợp chất");
        let second = find(slide, "b. Nước là đơn chất");
        assert_eq!(first.frame.x, second.frame.x);
        assert!((second.frame.y - first.frame.y - 0.65).abs() < 1e-9);

        let badges: Vec<&Element> = slide.elements.iter().filter(|e| e.reveal).collect();
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[0].plain_text(), TRUE_BADGE);
        assert_eq!(badges[0].fill.unwrap().color, SUCCESS);
        assert_eq!(badges[1].plain_text(), FALSE_BADGE);
        assert_eq!(badges[1].fill.unwrap().color, NEON_PINK);
        assert_eq!(badges[0].frame.x, 8.6);
    }

    #[test]
    fn short_answer_placeholder() {
        let deck = layout_deck(&sample(), &DeckConfig::default());
        let slide = &deck.slides[3];
        assert!(slide.texts().contains(&"ĐÁP SỐ: ---".to_string()));
        assert_eq!(slide.texts()[2], "Tính số mol");
    }

    #[test]
    fn layout_is_deterministic() {
        let result = sample();
        let config = DeckConfig::default();
        assert_eq!(layout_deck(&result, &config), layout_deck(&result, &config));
    }
}

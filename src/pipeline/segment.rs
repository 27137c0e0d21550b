//! Line classifier & assembler: normalised transcript → `Vec<Question>`.
//!
//! OCR transcripts are noisy. Stems and options wrap across several source
//! lines, and option markers come out as `(a)`, `a)`, `a.`, `[b]` or plain
//! `1.`–`4.` depending on how confident the OCR was. The segmenter therefore
//! recognises only two structural anchors, *question start* and *option
//! start*, and folds every other line into whichever span is currently
//! accumulating text.
//!
//! ## Algorithm
//!
//! One forward pass over trimmed, non-blank lines with no lookahead and no
//! backtracking. The open question carries an explicit [`Cursor`]:
//!
//! ```text
//!            question start                 option line
//!   (none) ─────────────────▶ Stem ─────────────────────▶ Option(i)
//!                              │ ▲  continuation            │ ▲ continuation
//!                              └─┘  appends to stem         └─┘ appends to option i
//! ```
//!
//! A new question start closes the open question. Lines seen before the
//! first question start are dropped.
//!
//! ## Numeric option markers
//!
//! `1. First` is both a valid question start and a valid option line. It is
//! read as an option only when it continues a numeric option run: marker `1`
//! directly after a stem that has no options yet, or marker `n + 1` after `n`
//! numerically-marked options. The marker must also carry punctuation or
//! brackets (`1.`, `1)`, `(1)`, `[1]`); a bare `1 kg…` never reads as an
//! option. Everywhere else the question-start reading wins, so lettered exams
//! are segmented exactly as if numeric markers did not exist.
//!
//! This is a heuristic: a wrapped stem line that happens to begin with a
//! number (`12 months later…`, `1 kg moves…`) still opens a new question.

use crate::output::{AnswerMap, Question, QuestionOption};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `12. Stem`, `12) Stem`, `12- Stem`, `12 Stem`
static RE_QUESTION_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})\s*[.)-]?\s+(.*)$").unwrap());

/// `(a) text`, `a) text`, `a. text`, `[b] text`, `C text`, `3. text`
static RE_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[(\[]?\s*([a-dA-D1-4])\s*[)\].]?\s+(.*)$").unwrap());

/// Numeric option marker with punctuation or brackets: `1.`, `2)`, `(3)`, `[4]`
static RE_NUMERIC_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[(\[]\s*[1-4]\s*[)\]]?|[1-4]\s*[)\].])\s+").unwrap());

/// Where continuation lines of the open question go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Stem,
    Option(usize),
}

/// Classification of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    QuestionStart {
        number: u32,
        stem: &'a str,
    },
    Option {
        label: char,
        text: &'a str,
        numeric: bool,
    },
    Text(&'a str),
}

/// The question currently accumulating text.
struct OpenQuestion {
    question: Question,
    cursor: Cursor,
    /// Every option so far came from a `1`–`4` marker.
    numeric_run: bool,
}

impl OpenQuestion {
    fn new(number: u32, stem: &str) -> Self {
        Self {
            question: Question::new(number, stem),
            cursor: Cursor::Stem,
            numeric_run: false,
        }
    }

    /// The numeric marker that would continue this question's option list.
    fn next_numeric_marker(&self) -> Option<u32> {
        match self.question.options.len() {
            0 => Some(1),
            n if self.numeric_run => u32::try_from(n + 1).ok(),
            _ => None,
        }
    }

    fn push_option(&mut self, label: char, text: &str, numeric: bool) {
        self.numeric_run = numeric && (self.question.options.is_empty() || self.numeric_run);
        self.question.options.push(QuestionOption::new(label, text));
        self.cursor = Cursor::Option(self.question.options.len() - 1);
    }

    fn append(&mut self, text: &str) {
        let target = match self.cursor {
            Cursor::Stem => &mut self.question.stem,
            Cursor::Option(i) => &mut self.question.options[i].text,
        };
        target.push(' ');
        target.push_str(text);
    }

    fn finish(self) -> Question {
        let mut q = self.question;
        q.stem = q.stem.trim().to_string();
        for option in &mut q.options {
            option.text = option.text.trim().to_string();
        }
        q
    }
}

/// Segment a normalised transcript into questions.
///
/// Total over all input: unmatched lines are absorbed as continuations or
/// dropped, never reported. Output preserves source order; repeated or
/// out-of-order numbers yield separate records.
pub fn segment_questions(text: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut open: Option<OpenQuestion> = None;
    let mut dropped = 0usize;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let numeric_marker = open.as_ref().and_then(OpenQuestion::next_numeric_marker);

        match classify_line(line, numeric_marker) {
            Line::QuestionStart { number, stem } => {
                if let Some(prev) = open.take() {
                    questions.push(prev.finish());
                }
                open = Some(OpenQuestion::new(number, stem));
            }
            Line::Option {
                label,
                text,
                numeric,
            } => match open.as_mut() {
                Some(q) => q.push_option(label, text, numeric),
                None => dropped += 1,
            },
            Line::Text(text) => match open.as_mut() {
                Some(q) => q.append(text),
                None => dropped += 1,
            },
        }
    }

    if let Some(last) = open {
        questions.push(last.finish());
    }

    debug!(
        "Segmented {} questions ({} leading lines dropped)",
        questions.len(),
        dropped
    );
    questions
}

/// Copy answers from the answer key onto matching questions.
///
/// Questions whose number has no entry keep `answer: None`; entries without a
/// matching question are ignored.
pub fn attach_answers(questions: &mut [Question], answers: &AnswerMap) {
    for q in questions {
        if let Some(&letter) = answers.get(&q.number) {
            q.answer = Some(letter);
        }
    }
}

/// Map an option marker to its label: letters are lowercased, `1`–`4`
/// become `a`–`d`.
pub fn normalize_label(marker: char) -> char {
    match marker {
        '1' => 'a',
        '2' => 'b',
        '3' => 'c',
        '4' => 'd',
        c => c.to_ascii_lowercase(),
    }
}

fn classify_line(line: &str, numeric_marker: Option<u32>) -> Line<'_> {
    if let Some(caps) = RE_QUESTION_START.captures(line) {
        if let Ok(number) = caps[1].parse::<u32>() {
            if numeric_marker == Some(number) && RE_NUMERIC_OPTION.is_match(line) {
                if let Some(option) = parse_option(line) {
                    return option;
                }
            }
            let stem = caps.get(2).map_or("", |m| m.as_str());
            return Line::QuestionStart { number, stem };
        }
    }
    parse_option(line).unwrap_or(Line::Text(line))
}

fn parse_option(line: &str) -> Option<Line<'_>> {
    let caps = RE_OPTION.captures(line)?;
    let marker = caps.get(1)?.as_str().chars().next()?;
    Some(Line::Option {
        label: normalize_label(marker),
        text: caps.get(2).map_or("", |m| m.as_str()),
        numeric: marker.is_ascii_digit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(q: &Question) -> Vec<char> {
        q.options.iter().map(|o| o.label).collect()
    }

    #[test]
    fn no_question_start_yields_nothing() {
        assert!(segment_questions("").is_empty());
        assert!(segment_questions("Instructions\nRead carefully.\n(a) stray").is_empty());
    }

    #[test]
    fn simple_question_with_letter_options() {
        let qs = segment_questions("1. Stem text\na. OptA\nb. OptB");
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].number, 1);
        assert_eq!(qs[0].stem, "Stem text");
        assert_eq!(
            qs[0].options,
            vec![QuestionOption::new('a', "OptA"), QuestionOption::new('b', "OptB")]
        );
        assert_eq!(qs[0].answer, None);
    }

    #[test]
    fn numeric_markers_become_letters() {
        let qs = segment_questions("1. Q\n1. First\n2. Second");
        assert_eq!(qs.len(), 1);
        assert_eq!(labels(&qs[0]), vec!['a', 'b']);
        assert_eq!(qs[0].options[1].text, "Second");
    }

    #[test]
    fn four_numeric_options_then_next_question() {
        let qs = segment_questions("1. Q\n1. w\n2. x\n3. y\n4. z\n2. Next");
        assert_eq!(qs.len(), 2);
        assert_eq!(labels(&qs[0]), vec!['a', 'b', 'c', 'd']);
        assert_eq!(qs[1].number, 2);
        assert_eq!(qs[1].stem, "Next");
    }

    #[test]
    fn parenthesised_numeric_markers() {
        let qs = segment_questions("7) Pick one\n(1) red\n(3) blue");
        assert_eq!(labels(&qs[0]), vec!['a', 'c']);
    }

    #[test]
    fn lettered_question_is_not_swallowed_by_next_number() {
        // Question 3 follows a question with two lettered options; the
        // ordinal 3 must not be read as a third option.
        let qs = segment_questions("2. Q two\na) x\nb) y\n3. Q three\na) z");
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[1].number, 3);
        assert_eq!(qs[1].stem, "Q three");
    }

    #[test]
    fn continuation_attaches_to_open_span() {
        let qs = segment_questions("1. Stem line one\nstill stem\na. opt text\nmore opt text");
        assert_eq!(qs[0].stem, "Stem line one still stem");
        assert_eq!(qs[0].options, vec![QuestionOption::new('a', "opt text more opt text")]);
    }

    #[test]
    fn option_marker_variants() {
        let qs = segment_questions("5. Q\n(a) one\nB) two\n[c] three\nd. four");
        assert_eq!(labels(&qs[0]), vec!['a', 'b', 'c', 'd']);
        assert_eq!(qs[0].options[2].text, "three");
    }

    #[test]
    fn question_without_options_is_kept() {
        let qs = segment_questions("1. Define entropy.\n2. Q\na. x");
        assert_eq!(qs.len(), 2);
        assert!(qs[0].options.is_empty());
        assert_eq!(qs[0].stem, "Define entropy.");
    }

    #[test]
    fn lines_before_first_question_are_dropped() {
        let qs = segment_questions("(a) orphan option\nheader text\n3. Real\n(b) kept");
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].number, 3);
        assert_eq!(labels(&qs[0]), vec!['b']);
    }

    #[test]
    fn repeated_and_unordered_numbers_stay_separate() {
        let qs = segment_questions("4. A\n2. B\n4. C");
        let numbers: Vec<u32> = qs.iter().map(|q| q.number).collect();
        assert_eq!(numbers, vec![4, 2, 4]);
    }

    #[test]
    fn question_start_punctuation_variants() {
        let qs = segment_questions("10) a\n11- b\n12 c\n13 . d");
        let numbers: Vec<u32> = qs.iter().map(|q| q.number).collect();
        assert_eq!(numbers, vec![10, 11, 12, 13]);
        assert_eq!(qs[3].stem, "d");
    }

    #[test]
    fn numeral_leading_continuation_opens_question() {
        let qs = segment_questions("1. How long is a year?\n12 months or so\na. yes");
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[1].number, 12);
    }

    #[test]
    fn bare_numeral_wrap_opens_question_not_option() {
        let qs = segment_questions(
            "5. A body of mass\n1 kg moves with speed v. Its KE is\n(a) mv\n(b) mv^2/2",
        );
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].number, 5);
        assert_eq!(qs[0].stem, "A body of mass");
        assert!(qs[0].options.is_empty());
        assert_eq!(qs[1].number, 1);
        assert_eq!(qs[1].stem, "kg moves with speed v. Its KE is");
        assert_eq!(labels(&qs[1]), vec!['a', 'b']);
    }

    #[test]
    fn punctuated_numeric_markers_open_option_run() {
        for text in ["1. Q\n1) x\n2) y", "1. Q\n[1] x\n[2] y", "1. Q\n1 . x\n2. y"] {
            let qs = segment_questions(text);
            assert_eq!(qs.len(), 1, "{text:?}");
            assert_eq!(labels(&qs[0]), vec!['a', 'b'], "{text:?}");
        }
    }

    #[test]
    fn duplicate_labels_are_not_deduplicated() {
        let qs = segment_questions("1. Q\na. x\na. y");
        assert_eq!(labels(&qs[0]), vec!['a', 'a']);
    }

    #[test]
    fn blank_lines_and_padding_ignored() {
        let qs = segment_questions("\n   1.   Padded stem   \n\n   a.  spaced   \n");
        assert_eq!(qs[0].stem, "Padded stem");
        assert_eq!(qs[0].options[0].text, "spaced");
    }

    #[test]
    fn segmentation_is_deterministic() {
        let text = "1. Q\na. x\nwrap\n2. R\n1. y\n2. z";
        assert_eq!(segment_questions(text), segment_questions(text));
    }

    #[test]
    fn attach_answers_sets_matching_numbers_only() {
        let mut qs = segment_questions("1. Q\na. x\n2. R\nb. y");
        let mut key = AnswerMap::new();
        key.insert(2, 'b');
        key.insert(9, 'a');
        attach_answers(&mut qs, &key);
        assert_eq!(qs[0].answer, None);
        assert_eq!(qs[1].answer, Some('b'));
    }

    #[test]
    fn normalize_label_maps_digits() {
        assert_eq!(normalize_label('1'), 'a');
        assert_eq!(normalize_label('4'), 'd');
        assert_eq!(normalize_label('C'), 'c');
    }
}

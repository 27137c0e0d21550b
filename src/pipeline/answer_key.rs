//! Answer-key extraction from the raw transcript.
//!
//! Exam papers often end with a compact key such as
//!
//! ```text
//! Answer Key
//! 1) A 2) C 3) B
//! 4) D
//! ```
//!
//! This module turns that section into an [`AnswerMap`]. It must run on the
//! *raw* transcript: [`crate::pipeline::normalize::clean_transcript`] deletes
//! the section.

use crate::output::AnswerMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Answer Key:?").unwrap());

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\)\s*([A-D])").unwrap());

/// Build the question-number → letter map from an "Answer Key" section.
///
/// Returns an empty map when no marker is present. Lines that contain no
/// `<number>) <letter>` token contribute nothing; when a number appears more
/// than once the last token wins.
pub fn extract_answer_key(transcript: &str) -> AnswerMap {
    let mut answers = AnswerMap::new();

    let Some(marker) = RE_MARKER.find(transcript) else {
        return answers;
    };

    for line in transcript[marker.end()..].lines() {
        for caps in RE_TOKEN.captures_iter(line.trim()) {
            // Numbers too long for u32 are OCR noise, not questions.
            let Ok(number) = caps[1].parse::<u32>() else {
                continue;
            };
            if let Some(letter) = caps[2].chars().next() {
                answers.insert(number, letter.to_ascii_lowercase());
            }
        }
    }

    debug!("Answer key: {} entries", answers.len());
    answers
}

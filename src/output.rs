//! Output types: segmented questions and the full conversion result.
//!
//! Everything here is plain data with serde derives so the same values can be
//! returned by the library, printed by the CLI with `--format json`, sent by
//! the HTTP server, and posted back by the browser for DOCX export.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Question number → lowercase answer letter, as read from an "Answer Key"
/// section. A missing entry means no answer was recorded.
pub type AnswerMap = BTreeMap<u32, char>;

/// One multiple-choice question recovered from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Number exactly as printed in the source (never renumbered).
    pub number: u32,
    /// Question body; may contain `\( … \)` inline-math spans.
    pub stem: String,
    /// Options in source order. Labels are neither deduplicated nor checked
    /// for completeness.
    pub options: Vec<QuestionOption>,
    /// Answer letter from the answer key, if one was found.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_answer"
    )]
    pub answer: Option<char>,
}

impl Question {
    pub fn new(number: u32, stem: impl Into<String>) -> Self {
        Self {
            number,
            stem: stem.into(),
            options: Vec::new(),
            answer: None,
        }
    }

    /// Text of the first option carrying `label`, if any.
    pub fn option_text(&self, label: char) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.text.as_str())
    }
}

/// A single lettered answer choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Lowercase letter `a`–`d`.
    pub label: char,
    pub text: String,
}

impl QuestionOption {
    pub fn new(label: char, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// Browsers post questions back with `"answer": ""` for unanswered items.
fn deserialize_answer<'de, D>(deserializer: D) -> Result<Option<char>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.trim().chars().next())
        .map(|c| c.to_ascii_lowercase()))
}

/// Result of the pure transcript pipeline (answer key → normalise → segment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTranscript {
    pub answer_key: AnswerMap,
    pub cleaned_text: String,
    pub questions: Vec<Question>,
}

/// Complete output of a PDF conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Mathpix document id.
    pub pdf_id: String,
    pub questions: Vec<Question>,
    pub answer_key: AnswerMap,
    /// Transcript after math-delimiter normalisation and answer-key removal.
    pub cleaned_text: String,
    /// Transcript exactly as returned by Mathpix.
    pub raw_mmd: String,
    /// Questions formatted as `n. stem` / `a. option` blocks.
    pub latex_questions: String,
    /// `latex_questions` wrapped in a compilable article.
    pub latex_document: String,
    /// Final status object reported by Mathpix.
    pub status: serde_json::Value,
    pub stats: ConversionStats,
}

/// Timing and count summary of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Number of status requests issued while waiting for Mathpix.
    pub poll_attempts: u32,
    pub upload_ms: u64,
    pub processing_ms: u64,
    pub fetch_ms: u64,
    pub total_duration_ms: u64,
    pub question_count: usize,
    /// Questions that received an answer from the answer key.
    pub answered_count: usize,
}

//! Transcript normalisation: rewrite every math span into one canonical form.
//!
//! Mathpix emits math with three different delimiter styles depending on how
//! the formula sat on the page: `$$…$$` for display blocks, `\[…\]` for
//! bracket display math and `$…$` for inline spans. The browser renderer and
//! the LaTeX export only understand one wrapper, so every span is rewritten to
//! inline `\( … \)`.
//!
//! The same pass drops structural noise the segmenter must never see:
//! `\section*{…}`-style heading lines and the trailing "Answer Key" section
//! (extract the key with [`crate::pipeline::answer_key`] *before* cleaning).
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the multi-line rules see plain `\n`.
//! Block math runs before inline math: `$$x$$` would otherwise be read as two
//! empty `$…$` spans around `x`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical replacement for every math span.
const INLINE_MATH: &str = r"\(${1}\)";

/// Apply all normalisation rules to a raw Mathpix transcript.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Collapse 3+ consecutive newlines down to a single blank line
/// 3. `$$…$$` → `\(…\)`
/// 4. `\[…\]` → `\(…\)`
/// 5. `$…$` → `\(…\)`
/// 6. Remove `\section*{…}` / `\subsection*{…}` / `\title{…}` lines
/// 7. Remove everything from the first "Answer Key" to the end
/// 8. Trim surrounding whitespace
pub fn clean_transcript(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = collapse_blank_lines(&s);
    let s = convert_block_math(&s);
    let s = convert_bracket_math(&s);
    let s = convert_inline_math(&s);
    let s = remove_heading_markers(&s);
    let s = strip_answer_key(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n")
}

// ── Rule 2: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 3: Display blocks ───────────────────────────────────────────────────

static RE_BLOCK_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$").unwrap());

fn convert_block_math(input: &str) -> String {
    RE_BLOCK_MATH.replace_all(input, INLINE_MATH).to_string()
}

// ── Rule 4: Bracket display math ─────────────────────────────────────────────

static RE_BRACKET_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap());

fn convert_bracket_math(input: &str) -> String {
    RE_BRACKET_MATH.replace_all(input, INLINE_MATH).to_string()
}

// ── Rule 5: Single-dollar inline math ────────────────────────────────────────

static RE_INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$]+?)\$").unwrap());

fn convert_inline_math(input: &str) -> String {
    RE_INLINE_MATH.replace_all(input, INLINE_MATH).to_string()
}

// ── Rule 6: Heading markers ──────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\\(?:title|(?:sub){0,2}section\*?)\{.*\}$").unwrap()
});

fn remove_heading_markers(input: &str) -> String {
    RE_HEADING.replace_all(input, "").to_string()
}

// ── Rule 7: Answer key section ───────────────────────────────────────────────

static RE_ANSWER_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)Answer Key.*$").unwrap());

fn strip_answer_key(input: &str) -> String {
    RE_ANSWER_KEY.replace(input, "").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

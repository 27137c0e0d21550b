//! Plain-text renderers for segmented questions.
//!
//! Three views of the same `Vec<Question>`:
//!
//! - [`latex_questions`]: `n. stem` followed by `a. option` lines, one
//!   block per question. Math stays in `\( … \)` form, which LaTeX accepts
//!   inline, so the block can be pasted into any document.
//! - [`latex_document`]: the blocks wrapped in a compilable `article`.
//! - [`readable_text`]: the same layout with indented options and the answer
//!   key appended, for terminal output.

use crate::output::Question;
use std::fmt::Write;

/// Format questions as `"{n}. {stem}\n{label}. {text}…"` blocks joined by a
/// blank line.
pub fn latex_questions(questions: &[Question]) -> String {
    questions
        .iter()
        .map(|q| {
            let mut block = format!("{}. {}", q.number, q.stem);
            for opt in &q.options {
                block.push('\n');
                let _ = write!(block, "{}. {}", opt.label, opt.text);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap pre-formatted question blocks in a standalone LaTeX article.
pub fn latex_document(latex_questions: &str) -> String {
    format!(
        "\\documentclass[12pt]{{article}}\n\
         \\usepackage{{amsmath}}\n\
         \\usepackage{{amssymb}}\n\
         \\usepackage{{geometry}}\n\
         \\geometry{{margin=1in}}\n\
         \n\
         \\begin{{document}}\n\
         \\section*{{Questions}}\n\
         \n\
         {latex_questions}\n\
         \n\
         \\end{{document}}"
    )
}

/// Exam-style text: indented options, then an `Answer:` line when known.
pub fn readable_text(questions: &[Question]) -> String {
    let mut out = String::new();
    for (i, q) in questions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}. {}", q.number, q.stem);
        for opt in &q.options {
            let _ = writeln!(out, "   ({}) {}", opt.label, opt.text);
        }
        if let Some(answer) = q.answer {
            let _ = writeln!(out, "   Answer: {}", answer.to_ascii_uppercase());
        }
    }
    out
}

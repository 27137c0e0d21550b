//! DOCX export: one table row per question.
//!
//! A `.docx` file is a zip archive of WordprocessingML parts. A table-only
//! document needs just three of them:
//!
//! ```text
//! [Content_Types].xml   part → MIME type registry
//! _rels/.rels           package → main document relationship
//! word/document.xml     the body: one <w:tbl>
//! ```
//!
//! The column layout matches the question-bank import sheet the output is
//! pasted into: `Sr. No.`, `Question`, `Option A`–`Option D`, `Ans Key`,
//! `Solution` (left blank), `Tage` and `Medium` (fixed tags), followed by an
//! empty separator row under the header.

use crate::error::Pdf2QuizError;
use crate::output::{AnswerMap, Question};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// MIME type of the produced archive.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Header labels and widths in fiftieths of a percent (`w:type="pct"`).
const COLUMNS: [(&str, u32); 10] = [
    ("Sr. No.", 250),
    ("Question", 1250),
    ("Option A", 500),
    ("Option B", 500),
    ("Option C", 500),
    ("Option D", 500),
    ("Ans Key", 250),
    ("Solution", 750),
    ("Tage", 250),
    ("Medium", 250),
];

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Fixed per-row tags written into the `Tage` and `Medium` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Test label, e.g. `NEET TEST -- 01 (2024)`.
    pub tag: String,
    /// Difficulty label, e.g. `Easy`.
    pub difficulty: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            tag: "NEET TEST -- 01 (2024)".to_string(),
            difficulty: "Easy".to_string(),
        }
    }
}

/// Build a DOCX archive containing the question table.
///
/// The answer cell uses the answer-map entry for the question number,
/// falling back to `question.answer`, uppercased; empty when neither exists.
pub fn export_docx(
    questions: &[Question],
    answers: &AnswerMap,
    options: &ExportOptions,
) -> Result<Vec<u8>, Pdf2QuizError> {
    let document = document_xml(questions, answers, options)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ] {
        zip.start_file(name, file_options)?;
        zip.write_all(body)
            .map_err(|e| Pdf2QuizError::ExportFailed(format!("{name}: {e}")))?;
    }

    let bytes = zip.finish()?.into_inner();
    info!(
        "Exported {} questions to DOCX ({} bytes)",
        questions.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Render `word/document.xml`.
fn document_xml(
    questions: &[Question],
    answers: &AnswerMap,
    options: &ExportOptions,
) -> Result<Vec<u8>, Pdf2QuizError> {
    let mut w = Writer::new(Vec::new());

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    start(&mut w, BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)]))?;
    start(&mut w, BytesStart::new("w:body"))?;
    start(&mut w, BytesStart::new("w:tbl"))?;

    start(&mut w, BytesStart::new("w:tblPr"))?;
    empty(&mut w, BytesStart::new("w:tblW").with_attributes([("w:w", "5000"), ("w:type", "pct")]))?;
    start(&mut w, BytesStart::new("w:tblBorders"))?;
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        empty(
            &mut w,
            BytesStart::new(format!("w:{side}")).with_attributes([
                ("w:val", "single"),
                ("w:sz", "4"),
                ("w:space", "0"),
                ("w:color", "auto"),
            ]),
        )?;
    }
    end(&mut w, "w:tblBorders")?;
    end(&mut w, "w:tblPr")?;

    start(&mut w, BytesStart::new("w:tblGrid"))?;
    for (_, width) in COLUMNS {
        let width = width.to_string();
        empty(&mut w, BytesStart::new("w:gridCol").with_attributes([("w:w", width.as_str())]))?;
    }
    end(&mut w, "w:tblGrid")?;

    write_row(&mut w, COLUMNS.map(|(label, _)| label.to_string()))?;
    write_row(&mut w, std::array::from_fn(|_| String::new()))?;

    for q in questions {
        let option = |label: char| q.option_text(label).unwrap_or_default().to_string();
        let answer = answers
            .get(&q.number)
            .copied()
            .or(q.answer)
            .map(|c| c.to_ascii_uppercase().to_string())
            .unwrap_or_default();

        write_row(
            &mut w,
            [
                q.number.to_string(),
                q.stem.clone(),
                option('a'),
                option('b'),
                option('c'),
                option('d'),
                answer,
                String::new(),
                options.tag.clone(),
                options.difficulty.clone(),
            ],
        )?;
    }

    end(&mut w, "w:tbl")?;
    empty(&mut w, BytesStart::new("w:p"))?;
    empty(&mut w, BytesStart::new("w:sectPr"))?;
    end(&mut w, "w:body")?;
    end(&mut w, "w:document")?;

    Ok(w.into_inner())
}

fn write_row(w: &mut Writer<Vec<u8>>, cells: [String; 10]) -> Result<(), Pdf2QuizError> {
    start(w, BytesStart::new("w:tr"))?;
    for (text, (_, width)) in cells.iter().zip(COLUMNS) {
        let width = width.to_string();
        start(w, BytesStart::new("w:tc"))?;
        start(w, BytesStart::new("w:tcPr"))?;
        empty(
            w,
            BytesStart::new("w:tcW").with_attributes([("w:w", width.as_str()), ("w:type", "pct")]),
        )?;
        end(w, "w:tcPr")?;

        if text.is_empty() {
            empty(w, BytesStart::new("w:p"))?;
        } else {
            start(w, BytesStart::new("w:p"))?;
            start(w, BytesStart::new("w:r"))?;
            start(w, BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]))?;
            w.write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?;
            end(w, "w:t")?;
            end(w, "w:r")?;
            end(w, "w:p")?;
        }
        end(w, "w:tc")?;
    }
    end(w, "w:tr")
}

// ── Writer helpers ───────────────────────────────────────────────────────

fn start(w: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<(), Pdf2QuizError> {
    w.write_event(Event::Start(element)).map_err(xml_error)
}

fn empty(w: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<(), Pdf2QuizError> {
    w.write_event(Event::Empty(element)).map_err(xml_error)
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<(), Pdf2QuizError> {
    w.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> Pdf2QuizError {
    Pdf2QuizError::ExportFailed(format!("word/document.xml: {e}"))
}

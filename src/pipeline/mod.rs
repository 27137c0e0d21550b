//! Pipeline stages for PDF-to-questions conversion.
//!
//! Each submodule implements exactly one transformation step. Only `input`
//! and `mathpix` perform I/O; the three transcript stages are pure
//! `&str → value` functions that can be tested without a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ mathpix ──▶ answer_key ──▶ normalize ──▶ segment
//! (path/URL) (upload,    (raw MMD)     (math, key     (questions)
//!            poll, .mmd)               removal)
//! ```
//!
//! 1. [`input`]      — canonicalise the user-supplied path or URL to a local PDF
//! 2. [`mathpix`]    — upload, poll until processed, fetch the `.mmd` transcript
//! 3. [`answer_key`] — read the trailing "Answer Key" section, if any
//! 4. [`normalize`]  — canonical inline math, heading and answer-key removal
//! 5. [`segment`]    — classify lines and assemble `Question` records

pub mod answer_key;
pub mod input;
pub mod mathpix;
pub mod normalize;
pub mod segment;

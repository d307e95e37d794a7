//! Error types for the md2docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2DocxError`] — **Fatal**: the export cannot proceed at all (no
//!   source text, the package could not be written, the output file could
//!   not be persisted). Returned as `Err(Md2DocxError)` from the top-level
//!   `convert*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image line could not be
//!   resolved (missing asset, unsupported format, corrupt header). The line
//!   degrades to a placeholder paragraph and the conversion carries on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2docx library.
///
/// Image failures use [`ImageError`] and never surface here.
#[derive(Debug, Error)]
pub enum Md2DocxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No text could be obtained from the source document.
    #[error("Cannot read Markdown source '{path}': {reason}")]
    ContentUnavailable { path: PathBuf, reason: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Packing the document into the binary container failed.
    #[error("Failed to serialise document part '{part}': {detail}")]
    SerializationFailed { part: String, detail: String },

    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for Md2DocxError {
    fn from(e: zip::result::ZipError) -> Self {
        Md2DocxError::SerializationFailed {
            part: "package".into(),
            detail: e.to_string(),
        }
    }
}

/// Why an image line could not be embedded.
///
/// Carried through logs, stats and progress callbacks so "not found" can be
/// told apart from "unsupported format" and "corrupt header".
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ImageError {
    /// The line starts with `![` but is neither `![[path]]` nor `![alt](path)`.
    #[error("malformed image reference '{reference}'")]
    MalformedReference { reference: String },

    /// No asset exists at the resolved path.
    #[error("image '{path}' not found")]
    NotFound { path: String },

    /// The path exists but is not a plain file.
    #[error("image '{path}' is not a file")]
    NotAFile { path: String },

    /// The asset has a suffix that cannot be embedded (SVG).
    #[error("image '{path}' has unsupported format '{extension}'")]
    UnsupportedFormat { path: String, extension: String },

    /// The magic bytes matched but the header could not be read.
    #[error("image '{path}' has a corrupt header: {detail}")]
    CorruptHeader { path: String, detail: String },

    /// Reading the asset failed for another reason.
    #[error("failed to read image '{path}': {detail}")]
    ReadFailed { path: String, detail: String },
}

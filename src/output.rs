//! Results returned by the `convert*` entry points.

use crate::model::Document;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything produced by one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The assembled document model.
    pub document: Document,
    /// The serialised `.docx` package.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub total_lines: usize,
    /// Block count per [`crate::model::Block::kind`].
    pub blocks_by_kind: BTreeMap<String, usize>,
    pub images_embedded: usize,
    pub image_failures: usize,
    /// One entry per failed image line: `line N: reason`.
    pub image_errors: Vec<String>,
    pub output_bytes: usize,
    pub classify_duration_ms: u64,
    pub serialize_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ConversionStats {
    pub fn count(&self, kind: &str) -> usize {
        self.blocks_by_kind.get(kind).copied().unwrap_or(0)
    }
}

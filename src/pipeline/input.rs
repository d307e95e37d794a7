//! Input: read the Markdown source and split it into lines.

use crate::error::Md2DocxError;
use std::path::Path;
use tracing::debug;

/// Split text into source lines on `\r?\n`.
///
/// A trailing newline yields a final empty line, so every line terminator
/// in the source is accounted for by exactly one block.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Read the Markdown source at `path` as UTF-8.
///
/// Any failure (missing file, directory, permission, invalid UTF-8) and an
/// empty file are reported as [`Md2DocxError::ContentUnavailable`], which
/// aborts the export.
pub async fn read_source(path: &Path) -> Result<String, Md2DocxError> {
    let unavailable = |reason: String| Md2DocxError::ContentUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => unavailable("file not found".into()),
        std::io::ErrorKind::PermissionDenied => unavailable("permission denied".into()),
        _ => unavailable(e.to_string()),
    })?;

    let text = String::from_utf8(bytes).map_err(|e| {
        unavailable(format!(
            "not valid UTF-8 (first bad byte at offset {})",
            e.utf8_error().valid_up_to()
        ))
    })?;

    // A leading BOM would otherwise defeat the `# ` check on line one.
    let text = match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    };

    if text.is_empty() {
        return Err(unavailable("document is empty".into()));
    }

    debug!("Read {} bytes of Markdown from {}", text.len(), path.display());
    Ok(text)
}

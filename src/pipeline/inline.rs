//! Inline formatting: split a line into plain and bold spans.
//!
//! Only the bold delimiters `**…**` and `__…__` are recognised here. Pairs
//! are matched left to right, non-overlapping and non-nested: the first
//! complete pair wins and its contents are taken verbatim, even when they
//! contain further markers. Italics are handled by the line classifier, and
//! only for lines that start with a single `*` or `_`.

use crate::model::StyledSpan;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").unwrap());

/// Format one line of text into an ordered sequence of spans.
///
/// Text outside delimiter pairs becomes plain spans, the captured text of
/// each pair a bold span. Without any complete pair the whole input comes
/// back as one plain span, so the result is never empty.
pub fn format_inline(text: &str) -> Vec<StyledSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in RE_BOLD.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            spans.push(StyledSpan::plain(&text[cursor..whole.start()]));
        }
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        spans.push(StyledSpan::bold(inner));
        cursor = whole.end();
    }

    if spans.is_empty() {
        return vec![StyledSpan::plain(text)];
    }
    if cursor < text.len() {
        spans.push(StyledSpan::plain(&text[cursor..]));
    }
    spans
}

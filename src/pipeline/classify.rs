//! Line classification: one Markdown line in, one [`Block`] out.
//!
//! Classification is stateless. Each line is matched against an ordered
//! priority table and the first matching [`Rule`] decides the block type;
//! nothing is remembered between lines, so fenced code, quotes and lists
//! never span more than one line.
//!
//! Several patterns can match the same line and the table order settles it.
//! Two consequences are kept on purpose:
//!
//! - `***text***` hits [`Rule::ThematicBreak`] and `___text___` hits
//!   [`Rule::Bold`], so [`Rule::BoldItalic`] is never reached from
//!   [`match_rule`]. It stays in the table at its original position.
//! - List items and whole-line italic/bold-italic lines are not run through
//!   the inline formatter; headings, quotes and paragraphs are.

use crate::error::ImageError;
use crate::model::{Block, NumberingDefinition, StyledSpan};
use crate::pipeline::assets::AssetSource;
use crate::pipeline::image::{parse_reference, placeholder_text, ImageResolver};
use crate::pipeline::inline::format_inline;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RE_ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\. ").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap());
static RE_EMPHASIS_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[*_]+|[*_]+$").unwrap());

/// The sixteen classification rules, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Heading1,
    Heading2,
    Heading3,
    Blank,
    Quote,
    UnorderedItem,
    OrderedItem,
    CodeFence,
    InlineCode,
    ThematicBreak,
    Link,
    Image,
    Bold,
    Italic,
    BoldItalic,
    Paragraph,
}

type Predicate = fn(&str) -> bool;

/// Priority table; the first predicate that accepts the line wins.
static PRIORITY: [(Rule, Predicate); 16] = [
    (Rule::Heading1, |l: &str| l.starts_with("# ")),
    (Rule::Heading2, |l: &str| l.starts_with("## ")),
    (Rule::Heading3, |l: &str| l.starts_with("### ")),
    (Rule::Blank, |l: &str| l.trim().is_empty()),
    (Rule::Quote, |l: &str| l.starts_with('>')),
    (Rule::UnorderedItem, |l: &str| l.starts_with("- ") || l.starts_with("* ")),
    (Rule::OrderedItem, |l: &str| RE_ORDERED_ITEM.is_match(l)),
    (Rule::CodeFence, |l: &str| l.starts_with("```")),
    (Rule::InlineCode, |l: &str| l.starts_with('`')),
    (Rule::ThematicBreak, |l: &str| l.starts_with("---") || l.starts_with("***")),
    (Rule::Link, |l: &str| l.starts_with('[') && l.contains("](")),
    (Rule::Image, |l: &str| l.starts_with("![")),
    (Rule::Bold, |l: &str| l.starts_with("**") || l.starts_with("__")),
    (Rule::Italic, |l: &str| l.starts_with('*') || l.starts_with('_')),
    (Rule::BoldItalic, |l: &str| l.starts_with("***") || l.starts_with("___")),
    (Rule::Paragraph, |_: &str| true),
];

impl Rule {
    /// 1-based position in the priority table.
    pub fn priority(self) -> usize {
        PRIORITY
            .iter()
            .position(|(rule, _)| *rule == self)
            .map_or(PRIORITY.len(), |i| i + 1)
    }
}

/// Pick the rule for `line`: the first entry of the priority table that matches.
pub fn match_rule(line: &str) -> Rule {
    PRIORITY
        .iter()
        .find(|(_, accepts)| accepts(line))
        .map_or(Rule::Paragraph, |(rule, _)| *rule)
}

/// The outcome of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub rule: Rule,
    pub block: Block,
    /// Set when an image line fell back to a placeholder paragraph.
    pub image_error: Option<ImageError>,
}

/// Classify one line into a block.
pub async fn classify<A: AssetSource + ?Sized>(
    line: &str,
    resolver: &ImageResolver<'_, A>,
) -> Block {
    classify_line(line, resolver).await.block
}

/// Classify one line, keeping the rule and any image failure for reporting.
pub async fn classify_line<A: AssetSource + ?Sized>(
    line: &str,
    resolver: &ImageResolver<'_, A>,
) -> Classification {
    let rule = match_rule(line);
    if rule != Rule::Image {
        return Classification {
            rule,
            block: text_block(rule, line),
            image_error: None,
        };
    }

    let resolved = match parse_reference(line) {
        Some(reference) => resolver
            .resolve(&reference)
            .await
            .map_err(|e| (e, reference.alt_text)),
        None => Err((
            ImageError::MalformedReference {
                reference: line.to_string(),
            },
            line.to_string(),
        )),
    };

    match resolved {
        Ok(image) => Classification {
            rule,
            block: Block::Image(image),
            image_error: None,
        },
        Err((error, alt_text)) => {
            warn!("Image fallback: {}", error);
            Classification {
                rule,
                block: Block::Paragraph {
                    spans: vec![StyledSpan::plain(placeholder_text(&alt_text))],
                },
                image_error: Some(error),
            }
        }
    }
}

/// Build the block for every rule that needs no I/O.
///
/// `Rule::Image` is resolved by [`classify_line`]; here it degrades to a
/// plain paragraph like any other unrecognised line.
pub fn text_block(rule: Rule, line: &str) -> Block {
    match rule {
        Rule::Heading1 => heading(1, line.get(2..).unwrap_or("")),
        Rule::Heading2 => heading(2, line.get(3..).unwrap_or("")),
        Rule::Heading3 => heading(3, line.get(4..).unwrap_or("")),
        Rule::Blank => Block::Empty,
        Rule::Quote => {
            let rest = line
                .strip_prefix("> ")
                .or_else(|| line.strip_prefix('>'))
                .unwrap_or(line);
            Block::BlockQuote {
                spans: format_inline(rest),
            }
        }
        Rule::UnorderedItem => Block::ListItem {
            ordered: false,
            numbering: None,
            spans: vec![StyledSpan::plain(line.get(2..).unwrap_or(""))],
        },
        Rule::OrderedItem => {
            let rest = RE_ORDERED_ITEM
                .find(line)
                .map_or(line, |m| &line[m.end()..]);
            Block::ListItem {
                ordered: true,
                numbering: Some(NumberingDefinition::ORDERED_LIST_ID),
                spans: vec![StyledSpan::plain(rest)],
            }
        }
        Rule::CodeFence => {
            let rest = line.strip_prefix("```").unwrap_or(line);
            let rest = rest.strip_suffix("```").unwrap_or(rest);
            Block::CodeLine {
                text: rest.to_string(),
            }
        }
        Rule::InlineCode => {
            let rest = line.strip_prefix('`').unwrap_or(line);
            let rest = rest.strip_suffix('`').unwrap_or(rest);
            Block::InlineCode {
                text: rest.to_string(),
            }
        }
        Rule::ThematicBreak => Block::ThematicBreak,
        Rule::Link => match RE_LINK.captures(line) {
            Some(caps) => Block::Hyperlink {
                text: caps[1].to_string(),
                url: caps[2].to_string(),
            },
            // `[a](b` without a closing paren: no link to capture.
            None => paragraph(line),
        },
        Rule::Bold => paragraph(line),
        Rule::Italic => Block::Paragraph {
            spans: vec![StyledSpan::italic(strip_emphasis(line))],
        },
        Rule::BoldItalic => Block::Paragraph {
            spans: vec![StyledSpan::bold_italic(strip_emphasis(line))],
        },
        Rule::Image | Rule::Paragraph => paragraph(line),
    }
}

fn heading(level: u8, text: &str) -> Block {
    Block::Heading {
        level,
        spans: format_inline(text),
    }
}

fn paragraph(line: &str) -> Block {
    Block::Paragraph {
        spans: format_inline(line),
    }
}

fn strip_emphasis(line: &str) -> String {
    RE_EMPHASIS_MARKERS.replace_all(line, "").into_owned()
}

//! The in-memory document model produced by the conversion pipeline.
//!
//! One Markdown source line becomes exactly one [`Block`]. Blocks are built
//! once, never mutated, and handed in source order to
//! [`crate::pipeline::assemble`], which wraps them together with the single
//! shared [`NumberingDefinition`] into a [`Document`] ready for
//! serialisation.

use serde::Serialize;
use std::fmt;

/// One inline run of text with uniform styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl StyledSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: false,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: true,
        }
    }

    pub fn bold_italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: true,
        }
    }
}

/// Container format of an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// File extension used for the media part inside the package.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        })
    }
}

/// A resolved image: raw bytes plus the display size in pixels.
///
/// `width`/`height` are already scaled to the configured bounds; the
/// serializer converts them to EMU without further adjustment.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ImageBlock {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub alt_text: String,
}

impl fmt::Debug for ImageBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlock")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alt_text", &self.alt_text)
            .finish()
    }
}

/// Identifier of a numbering definition inside `word/numbering.xml`.
pub type NumberingId = u32;

/// How list markers of a numbering definition are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFormat {
    Decimal,
}

impl NumberFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberFormat::Decimal => "decimal",
        }
    }
}

/// The one ordered-list style shared by every ordered list item.
///
/// Created once per document by the assembler and never mutated. Ordered
/// [`Block::ListItem`]s refer to it by [`NumberingId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberingDefinition {
    pub num_id: NumberingId,
    pub abstract_num_id: u32,
    pub format: NumberFormat,
    pub level_text: &'static str,
    pub start: u32,
    /// Left indent in twentieths of a point.
    pub indent_left: u32,
    /// Hanging indent in twentieths of a point.
    pub hanging: u32,
}

impl NumberingDefinition {
    /// `numId` every ordered list item points at.
    pub const ORDERED_LIST_ID: NumberingId = 1;

    pub const fn ordered() -> Self {
        Self {
            num_id: Self::ORDERED_LIST_ID,
            abstract_num_id: 0,
            format: NumberFormat::Decimal,
            level_text: "%1.",
            start: 1,
            indent_left: 720,
            hanging: 360,
        }
    }
}

impl Default for NumberingDefinition {
    fn default() -> Self {
        Self::ordered()
    }
}

/// One structural unit of the output document; one per source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<StyledSpan>,
    },
    Paragraph {
        spans: Vec<StyledSpan>,
    },
    /// Rendered with a fixed left indent and a shaded background.
    BlockQuote {
        spans: Vec<StyledSpan>,
    },
    ListItem {
        ordered: bool,
        /// Set for ordered items; always the shared definition's id.
        numbering: Option<NumberingId>,
        spans: Vec<StyledSpan>,
    },
    CodeLine {
        text: String,
    },
    InlineCode {
        text: String,
    },
    ThematicBreak,
    Hyperlink {
        text: String,
        url: String,
    },
    Image(ImageBlock),
    Empty,
}

impl Block {
    /// Short lowercase name, used for stats and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::BlockQuote { .. } => "block_quote",
            Block::ListItem { .. } => "list_item",
            Block::CodeLine { .. } => "code_line",
            Block::InlineCode { .. } => "inline_code",
            Block::ThematicBreak => "thematic_break",
            Block::Hyperlink { .. } => "hyperlink",
            Block::Image(_) => "image",
            Block::Empty => "empty",
        }
    }

    /// Visible text of the block with styling dropped.
    pub fn text(&self) -> String {
        if let Some(spans) = self.spans() {
            return spans.iter().map(|s| s.text.as_str()).collect();
        }
        match self {
            Block::CodeLine { text } | Block::InlineCode { text } | Block::Hyperlink { text, .. } => {
                text.clone()
            }
            Block::Image(image) => image.alt_text.clone(),
            _ => String::new(),
        }
    }

    /// Styled runs of the text-bearing kinds; `None` for the rest.
    pub fn spans(&self) -> Option<&[StyledSpan]> {
        match self {
            Block::Heading { spans, .. }
            | Block::Paragraph { spans }
            | Block::BlockQuote { spans }
            | Block::ListItem { spans, .. } => Some(spans),
            _ => None,
        }
    }
}

/// The assembled document: blocks in source order plus the shared numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub numbering: NumberingDefinition,
}

impl Document {
    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(image) => Some(image),
            _ => None,
        })
    }

    pub fn has_ordered_lists(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, Block::ListItem { ordered: true, .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_text_drops_styling() {
        let block = Block::Paragraph {
            spans: vec![
                StyledSpan::plain("a "),
                StyledSpan::bold("b"),
                StyledSpan::plain(" c"),
            ],
        };
        assert_eq!(block.text(), "a b c");
        assert_eq!(block.kind(), "paragraph");
    }

    #[test]
    fn only_text_kinds_carry_spans() {
        let item = Block::ListItem {
            ordered: false,
            numbering: None,
            spans: vec![StyledSpan::bold("x")],
        };
        assert_eq!(item.spans().map(<[_]>::len), Some(1));
        assert!(item.spans().unwrap()[0].bold);

        let code = Block::CodeLine { text: "let x;".into() };
        assert!(code.spans().is_none());
        assert_eq!(code.text(), "let x;");
        assert!(Block::ThematicBreak.spans().is_none());
        assert_eq!(Block::Empty.text(), "");
    }

    #[test]
    fn ordered_numbering_defaults() {
        let def = NumberingDefinition::default();
        assert_eq!(def.num_id, NumberingDefinition::ORDERED_LIST_ID);
        assert_eq!(def.format, NumberFormat::Decimal);
        assert_eq!(def.indent_left, 720);
        assert_eq!(def.hanging, 360);
    }

    #[test]
    fn image_debug_hides_bytes() {
        let image = ImageBlock {
            data: vec![0u8; 2048],
            format: ImageFormat::Png,
            width: 10,
            height: 20,
            alt_text: "x".into(),
        };
        let dbg = format!("{image:?}");
        assert!(dbg.contains("<2048 bytes>"), "got: {dbg}");
    }

    #[test]
    fn block_serialises_with_type_tag() {
        let json = serde_json::to_string(&Block::ThematicBreak).unwrap();
        assert_eq!(json, r#"{"type":"thematic_break"}"#);
    }
}

//! Document assembly: fold the classified blocks into one [`Document`].

use crate::model::{Block, Document, NumberingDefinition};

/// Wrap `blocks` (already in source order) with the shared ordered-list
/// numbering definition.
///
/// Pure aggregation: blocks are neither reordered nor inspected.
pub fn assemble(blocks: Vec<Block>) -> Document {
    Document {
        blocks,
        numbering: NumberingDefinition::ordered(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StyledSpan;

    #[test]
    fn keeps_blocks_in_order() {
        let blocks = vec![
            Block::Heading {
                level: 1,
                spans: vec![StyledSpan::plain("T")],
            },
            Block::Empty,
            Block::ThematicBreak,
        ];
        let doc = assemble(blocks.clone());
        assert_eq!(doc.blocks, blocks);
    }

    #[test]
    fn ordered_items_reference_the_document_numbering() {
        let item = |text: &str| Block::ListItem {
            ordered: true,
            numbering: Some(NumberingDefinition::ORDERED_LIST_ID),
            spans: vec![StyledSpan::plain(text)],
        };
        let doc = assemble(vec![item("a"), item("b")]);
        assert!(doc.has_ordered_lists());
        for block in &doc.blocks {
            match block {
                Block::ListItem { numbering, .. } => {
                    assert_eq!(*numbering, Some(doc.numbering.num_id))
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn empty_input_is_a_valid_document() {
        let doc = assemble(Vec::new());
        assert!(doc.blocks.is_empty());
        assert_eq!(doc.numbering, NumberingDefinition::ordered());
    }
}

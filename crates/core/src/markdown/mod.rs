//! The git mapping layer: deterministic, reversible translation between a
//! page content tree and its flat-file markdown form.
//!
//! One page maps to one file at `root_path + page.path + ".md"`. The block
//! hierarchy serializes to nested markup preserving block order and type;
//! [`parse`] reconstructs an equivalent tree from that markup. The pair
//! satisfies a round-trip law: `parse(serialize(c))` preserves titles,
//! block ordering, nesting, types, and text.
//!
//! Wire format:
//!
//! ```markdown
//! ---
//! title: Getting Started
//! ---
//!
//! # Heading
//!
//! A paragraph.
//!
//! - list item
//!   nested child paragraph (2-space indent per nesting level)
//! ```
//!
//! Reusable blocks serialize as an HTML-comment reference wrapping their
//! inline fallback text so plain-markdown consumers still render content.

mod parse;
mod paths;
mod serialize;

pub use parse::parse;
pub use paths::{file_path, matches_filters, matches_glob, page_path_from_file, MARKDOWN_EXT};
pub use serialize::serialize;

/// Number of spaces per nesting level in the serialized form.
pub(crate) const INDENT_WIDTH: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockNode, BlockType, PageContent};

    fn sample_tree() -> PageContent {
        PageContent::new("Getting Started").with_blocks(vec![
            BlockNode::leaf(BlockType::Heading1, "Welcome"),
            BlockNode::leaf(BlockType::Paragraph, "First steps."),
            BlockNode::leaf(BlockType::BulletedListItem, "install").with_children(vec![
                BlockNode::leaf(BlockType::Paragraph, "use the installer"),
                BlockNode::leaf(BlockType::NumberedListItem, "download"),
                BlockNode::leaf(BlockType::NumberedListItem, "run"),
            ]),
            BlockNode::leaf(BlockType::BulletedListItem, "configure"),
            BlockNode {
                block_type: BlockType::Code,
                text: "fn main() {\n\n    println!(\"hi\");\n}".to_string(),
                language: Some("rust".to_string()),
                ref_block_id: None,
                children: Vec::new(),
            },
            BlockNode::leaf(BlockType::Quote, "measure twice"),
            BlockNode::leaf(BlockType::Divider, ""),
            BlockNode {
                block_type: BlockType::Reusable,
                text: "shared warning text".to_string(),
                language: None,
                ref_block_id: Some(42),
                children: Vec::new(),
            },
            BlockNode::leaf(BlockType::Heading2, "Next"),
        ])
    }

    #[test]
    fn round_trip_preserves_tree() {
        let content = sample_tree();
        let text = serialize(&content);
        let parsed = parse(&text);
        assert_eq!(parsed, content);
    }

    #[test]
    fn round_trip_preserves_deep_nesting() {
        let content = PageContent::new("Deep").with_blocks(vec![BlockNode::leaf(
            BlockType::BulletedListItem,
            "a",
        )
        .with_children(vec![BlockNode::leaf(BlockType::BulletedListItem, "b")
            .with_children(vec![BlockNode::leaf(BlockType::Paragraph, "c")])])]);
        assert_eq!(parse(&serialize(&content)), content);
    }

    #[test]
    fn round_trip_of_empty_page() {
        let content = PageContent::new("Empty");
        assert_eq!(parse(&serialize(&content)), content);
    }
}

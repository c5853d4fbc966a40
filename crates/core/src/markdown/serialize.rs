//! Content tree → markdown serializer.

use crate::content::{BlockNode, BlockType, PageContent};

use super::INDENT_WIDTH;

/// Serialize a content snapshot to its canonical file form.
///
/// The output is deterministic: identical trees always produce identical
/// text, which is what the sync engine's three-way comparison relies on.
pub fn serialize(content: &PageContent) -> String {
    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("title: {}\n", content.title));
    out.push_str("---\n");

    let mut lines: Vec<String> = Vec::new();
    render_blocks(&content.blocks, 0, &mut lines);

    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }
    out.push('\n');
    out
}

/// Render a sibling list at the given nesting level.
///
/// Top-level siblings are separated by a blank line; nested children
/// follow their parent contiguously. The parser ignores blank lines
/// outside code fences, so spacing is purely cosmetic.
fn render_blocks(blocks: &[BlockNode], level: usize, lines: &mut Vec<String>) {
    let mut numbered_ordinal = 0usize;
    for block in blocks {
        if level == 0 && !lines.is_empty() {
            lines.push(String::new());
        }
        if block.block_type == BlockType::NumberedListItem {
            numbered_ordinal += 1;
        } else {
            numbered_ordinal = 0;
        }
        render_block(block, level, numbered_ordinal, lines);
    }
}

fn render_block(block: &BlockNode, level: usize, ordinal: usize, lines: &mut Vec<String>) {
    let indent = " ".repeat(level * INDENT_WIDTH);
    match block.block_type {
        BlockType::Heading1 => lines.push(format!("{indent}# {}", block.text)),
        BlockType::Heading2 => lines.push(format!("{indent}## {}", block.text)),
        BlockType::Heading3 => lines.push(format!("{indent}### {}", block.text)),
        BlockType::Paragraph => lines.push(format!("{indent}{}", block.text)),
        BlockType::BulletedListItem => lines.push(format!("{indent}- {}", block.text)),
        BlockType::NumberedListItem => lines.push(format!("{indent}{ordinal}. {}", block.text)),
        BlockType::Quote => lines.push(format!("{indent}> {}", block.text)),
        BlockType::Divider => lines.push(format!("{indent}---")),
        BlockType::Code => {
            let lang = block.language.as_deref().unwrap_or("");
            lines.push(format!("{indent}```{lang}"));
            for code_line in block.text.split('\n') {
                if code_line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{code_line}"));
                }
            }
            lines.push(format!("{indent}```"));
        }
        BlockType::Reusable => {
            match block.ref_block_id {
                Some(id) => lines.push(format!("{indent}<!-- reusable:{id} -->")),
                None => lines.push(format!("{indent}<!-- reusable -->")),
            }
            for fallback_line in block.text.split('\n') {
                if fallback_line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{fallback_line}"));
                }
            }
            lines.push(format!("{indent}<!-- /reusable -->"));
        }
    }
    render_blocks(&block.children, level + 1, lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockNode, BlockType, PageContent};

    #[test]
    fn front_matter_carries_title() {
        let text = serialize(&PageContent::new("My Page"));
        assert!(text.starts_with("---\ntitle: My Page\n---\n"));
    }

    #[test]
    fn headings_and_paragraphs() {
        let content = PageContent::new("T").with_blocks(vec![
            BlockNode::leaf(BlockType::Heading1, "A"),
            BlockNode::leaf(BlockType::Paragraph, "body"),
        ]);
        let text = serialize(&content);
        assert!(text.contains("\n# A\n"));
        assert!(text.contains("\nbody\n"));
    }

    #[test]
    fn children_are_indented() {
        let content = PageContent::new("T").with_blocks(vec![BlockNode::leaf(
            BlockType::BulletedListItem,
            "parent",
        )
        .with_children(vec![BlockNode::leaf(BlockType::Paragraph, "child")])]);
        let text = serialize(&content);
        assert!(text.contains("\n- parent\n  child\n"));
    }

    #[test]
    fn numbered_items_are_renumbered_by_position() {
        let content = PageContent::new("T").with_blocks(vec![
            BlockNode::leaf(BlockType::NumberedListItem, "one"),
            BlockNode::leaf(BlockType::NumberedListItem, "two"),
        ]);
        let text = serialize(&content);
        assert!(text.contains("1. one"));
        assert!(text.contains("2. two"));
    }

    #[test]
    fn code_block_is_fenced_with_language() {
        let content = PageContent::new("T").with_blocks(vec![BlockNode {
            block_type: BlockType::Code,
            text: "let x = 1;".to_string(),
            language: Some("rust".to_string()),
            ref_block_id: None,
            children: Vec::new(),
        }]);
        let text = serialize(&content);
        assert!(text.contains("```rust\nlet x = 1;\n```"));
    }

    #[test]
    fn reusable_block_wraps_fallback() {
        let content = PageContent::new("T").with_blocks(vec![BlockNode {
            block_type: BlockType::Reusable,
            text: "fallback".to_string(),
            language: None,
            ref_block_id: Some(7),
            children: Vec::new(),
        }]);
        let text = serialize(&content);
        assert!(text.contains("<!-- reusable:7 -->\nfallback\n<!-- /reusable -->"));
    }

    #[test]
    fn identical_trees_serialize_identically() {
        let a = PageContent::new("T")
            .with_blocks(vec![BlockNode::leaf(BlockType::Paragraph, "same")]);
        let b = a.clone();
        assert_eq!(serialize(&a), serialize(&b));
    }
}

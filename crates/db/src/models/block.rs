//! Block models and content-tree ⇄ row conversion helpers.
//!
//! Blocks are stored as flat rows (arena keyed by id, children found via
//! `parent_block_id` + `position`); [`assemble_content`] rebuilds the
//! nested [`PageContent`] snapshot and [`flatten_content`] produces
//! insertable rows in parent-before-child order. Both backends of the
//! store share these helpers so the two representations cannot drift.

use leafpress_core::content::{BlockNode, BlockType, PageContent};
use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A block row from the `blocks` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Block {
    pub id: DbId,
    pub page_id: DbId,
    pub parent_block_id: Option<DbId>,
    pub block_type: String,
    pub position: i32,
    /// Payload: `{"text": …, "language": …}`.
    pub content: serde_json::Value,
    pub ref_block_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Flattening (content tree → rows)
// ---------------------------------------------------------------------------

/// A block ready for insertion. `parent_idx` points into the same list
/// (always at a lower index), letting backends map list positions to
/// freshly assigned row ids.
#[derive(Debug, Clone)]
pub struct FlatBlock {
    pub parent_idx: Option<usize>,
    pub block_type: String,
    pub position: i32,
    pub content: serde_json::Value,
    pub ref_block_id: Option<DbId>,
}

/// Flatten a content snapshot into insertable rows, depth-first so every
/// parent precedes its children.
pub fn flatten_content(content: &PageContent) -> Vec<FlatBlock> {
    let mut out = Vec::with_capacity(content.block_count());
    flatten_nodes(&content.blocks, None, &mut out);
    out
}

fn flatten_nodes(nodes: &[BlockNode], parent_idx: Option<usize>, out: &mut Vec<FlatBlock>) {
    for (position, node) in nodes.iter().enumerate() {
        let mut payload = serde_json::Map::new();
        payload.insert("text".to_string(), serde_json::Value::String(node.text.clone()));
        if let Some(lang) = &node.language {
            payload.insert(
                "language".to_string(),
                serde_json::Value::String(lang.clone()),
            );
        }
        out.push(FlatBlock {
            parent_idx,
            block_type: node.block_type.as_str().to_string(),
            position: position as i32,
            content: serde_json::Value::Object(payload),
            ref_block_id: node.ref_block_id,
        });
        let idx = out.len() - 1;
        flatten_nodes(&node.children, Some(idx), out);
    }
}

// ---------------------------------------------------------------------------
// Assembly (rows → content tree)
// ---------------------------------------------------------------------------

/// Rebuild a content snapshot from a page's block rows.
///
/// Rows with an unknown `block_type` are skipped rather than failing the
/// whole page; order within a sibling group follows `position`.
pub fn assemble_content(title: &str, blocks: &[Block]) -> PageContent {
    PageContent {
        title: title.to_string(),
        blocks: assemble_children(None, blocks),
    }
}

fn assemble_children(parent: Option<DbId>, blocks: &[Block]) -> Vec<BlockNode> {
    let mut group: Vec<&Block> = blocks
        .iter()
        .filter(|b| b.parent_block_id == parent)
        .collect();
    group.sort_by_key(|b| b.position);

    group
        .into_iter()
        .filter_map(|row| {
            let block_type = BlockType::parse(&row.block_type)?;
            let text = row
                .content
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let language = row
                .content
                .get("language")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            Some(BlockNode {
                block_type,
                text,
                language,
                ref_block_id: row.ref_block_id,
                children: assemble_children(Some(row.id), blocks),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: DbId, parent: Option<DbId>, block_type: &str, position: i32, text: &str) -> Block {
        Block {
            id,
            page_id: 1,
            parent_block_id: parent,
            block_type: block_type.to_string(),
            position,
            content: serde_json::json!({"text": text}),
            ref_block_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flatten_orders_parents_before_children() {
        let content = PageContent::new("T").with_blocks(vec![
            BlockNode::leaf(BlockType::BulletedListItem, "parent").with_children(vec![
                BlockNode::leaf(BlockType::Paragraph, "child"),
            ]),
            BlockNode::leaf(BlockType::Paragraph, "sibling"),
        ]);
        let flat = flatten_content(&content);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].parent_idx, None);
        assert_eq!(flat[1].parent_idx, Some(0));
        assert_eq!(flat[2].parent_idx, None);
        assert_eq!(flat[2].position, 1);
    }

    #[test]
    fn assemble_rebuilds_nesting_and_order() {
        let rows = vec![
            row(10, None, "bulleted_list_item", 0, "parent"),
            row(12, None, "paragraph", 1, "sibling"),
            row(11, Some(10), "paragraph", 0, "child"),
        ];
        let content = assemble_content("T", &rows);
        assert_eq!(content.blocks.len(), 2);
        assert_eq!(content.blocks[0].children.len(), 1);
        assert_eq!(content.blocks[0].children[0].text, "child");
        assert_eq!(content.blocks[1].text, "sibling");
    }

    #[test]
    fn flatten_then_assemble_round_trips() {
        let content = PageContent::new("Doc").with_blocks(vec![
            BlockNode::leaf(BlockType::Heading1, "H"),
            BlockNode::leaf(BlockType::BulletedListItem, "a").with_children(vec![
                BlockNode::leaf(BlockType::BulletedListItem, "b").with_children(vec![
                    BlockNode::leaf(BlockType::Paragraph, "deep"),
                ]),
            ]),
        ]);

        // Simulate a backend assigning ids in insertion order.
        let flat = flatten_content(&content);
        let rows: Vec<Block> = flat
            .iter()
            .enumerate()
            .map(|(i, fb)| Block {
                id: i as DbId + 100,
                page_id: 1,
                parent_block_id: fb.parent_idx.map(|p| p as DbId + 100),
                block_type: fb.block_type.clone(),
                position: fb.position,
                content: fb.content.clone(),
                ref_block_id: fb.ref_block_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect();

        assert_eq!(assemble_content("Doc", &rows), content);
    }

    #[test]
    fn unknown_block_types_are_skipped() {
        let rows = vec![
            row(1, None, "paragraph", 0, "keep"),
            row(2, None, "holographic", 1, "drop"),
        ];
        let content = assemble_content("T", &rows);
        assert_eq!(content.blocks.len(), 1);
        assert_eq!(content.blocks[0].text, "keep");
    }

    #[test]
    fn code_language_survives_conversion() {
        let content = PageContent::new("T").with_blocks(vec![BlockNode {
            block_type: BlockType::Code,
            text: "x".into(),
            language: Some("rust".into()),
            ref_block_id: None,
            children: vec![],
        }]);
        let flat = flatten_content(&content);
        assert_eq!(flat[0].content["language"], "rust");
    }
}

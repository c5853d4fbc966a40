//! The page content tree: an ordered hierarchy of typed blocks.
//!
//! [`PageContent`] is the canonical snapshot format — it is what page
//! versions store, what the markdown mapping layer serializes, and what
//! the sync engine compares. Block identity (database ids, parent links,
//! positions) is a storage concern; the snapshot only captures type,
//! payload, and nesting.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Block types
// ---------------------------------------------------------------------------

/// The closed set of block kinds understood by the mapping layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
    BulletedListItem,
    NumberedListItem,
    Code,
    Quote,
    Divider,
    /// A reference to a reusable block, carrying inline fallback text.
    Reusable,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading1 => "heading_1",
            BlockType::Heading2 => "heading_2",
            BlockType::Heading3 => "heading_3",
            BlockType::Paragraph => "paragraph",
            BlockType::BulletedListItem => "bulleted_list_item",
            BlockType::NumberedListItem => "numbered_list_item",
            BlockType::Code => "code",
            BlockType::Quote => "quote",
            BlockType::Divider => "divider",
            BlockType::Reusable => "reusable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "heading_1" => Some(BlockType::Heading1),
            "heading_2" => Some(BlockType::Heading2),
            "heading_3" => Some(BlockType::Heading3),
            "paragraph" => Some(BlockType::Paragraph),
            "bulleted_list_item" => Some(BlockType::BulletedListItem),
            "numbered_list_item" => Some(BlockType::NumberedListItem),
            "code" => Some(BlockType::Code),
            "quote" => Some(BlockType::Quote),
            "divider" => Some(BlockType::Divider),
            "reusable" => Some(BlockType::Reusable),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Content tree
// ---------------------------------------------------------------------------

/// A single block in a content snapshot, with its nested children in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub block_type: BlockType,

    /// Text payload. For [`BlockType::Code`] this may span multiple lines;
    /// for [`BlockType::Divider`] it is empty; for [`BlockType::Reusable`]
    /// it is the inline fallback text.
    #[serde(default)]
    pub text: String,

    /// Language hint for code blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Target of a reusable-block reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_block_id: Option<DbId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    /// A childless block of the given type and text.
    pub fn leaf(block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            block_type,
            text: text.into(),
            language: None,
            ref_block_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BlockNode>) -> Self {
        self.children = children;
        self
    }
}

/// A complete content snapshot of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<BlockNode>,
}

impl PageContent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<BlockNode>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Total number of blocks in the tree.
    pub fn block_count(&self) -> usize {
        fn count(blocks: &[BlockNode]) -> usize {
            blocks.len() + blocks.iter().map(|b| count(&b.children)).sum::<usize>()
        }
        count(&self.blocks)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

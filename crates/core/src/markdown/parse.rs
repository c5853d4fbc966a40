//! Markdown → content tree parser.
//!
//! Lenient by design: files authored outside the platform must still map
//! to a usable block tree. Unrecognized lines become paragraphs, missing
//! front matter yields an empty title (the caller substitutes a
//! slug-derived one), and blank lines outside code fences are ignored.

use crate::content::{BlockNode, BlockType, PageContent};

use super::INDENT_WIDTH;

/// Parse a serialized page back into a content tree.
pub fn parse(text: &str) -> PageContent {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut i = 0;

    let title = match parse_front_matter(&lines, &mut i) {
        Some(title) => title,
        None => String::new(),
    };

    let mut roots: Vec<BlockNode> = Vec::new();
    // Index path to the most recently inserted node at each level.
    let mut path: Vec<usize> = Vec::new();

    while i < lines.len() {
        let raw = lines[i];
        if raw.trim().is_empty() {
            i += 1;
            continue;
        }

        let spaces = leading_spaces(raw);
        let level = (spaces / INDENT_WIDTH).min(path.len());
        let stripped = &raw[spaces..];

        let (node, consumed) = parse_block(&lines, i, level, stripped);
        i += consumed;

        let siblings = siblings_at(&mut roots, &path, level);
        siblings.push(node);
        let idx = siblings.len() - 1;
        path.truncate(level);
        path.push(idx);
    }

    PageContent { title, blocks: roots }
}

// ---------------------------------------------------------------------------
// Front matter
// ---------------------------------------------------------------------------

/// Parse a leading `---` front-matter fence, advancing `i` past it.
///
/// Only treated as front matter when a closing fence exists and every
/// interior line is blank or a `key: value` pair; otherwise the opening
/// `---` is left to be parsed as a divider block.
fn parse_front_matter(lines: &[&str], i: &mut usize) -> Option<String> {
    let mut start = *i;
    while start < lines.len() && lines[start].trim().is_empty() {
        start += 1;
    }
    if start >= lines.len() || lines[start].trim_end() != "---" {
        return None;
    }

    let end = lines[start + 1..]
        .iter()
        .position(|l| l.trim_end() == "---")
        .map(|off| start + 1 + off)?;

    let interior = &lines[start + 1..end];
    if !interior
        .iter()
        .all(|l| l.trim().is_empty() || l.contains(':'))
    {
        return None;
    }

    let mut title = String::new();
    for line in interior {
        if let Some(rest) = line.trim_start().strip_prefix("title:") {
            title = rest.trim().to_string();
        }
    }
    *i = end + 1;
    Some(title)
}

// ---------------------------------------------------------------------------
// Block parsing
// ---------------------------------------------------------------------------

/// Parse one block starting at `lines[i]`. Returns the node and how many
/// lines it consumed (more than one for code fences and reusable wrappers).
fn parse_block(lines: &[&str], i: usize, level: usize, stripped: &str) -> (BlockNode, usize) {
    if let Some(text) = stripped.strip_prefix("### ") {
        return (BlockNode::leaf(BlockType::Heading3, text), 1);
    }
    if let Some(text) = stripped.strip_prefix("## ") {
        return (BlockNode::leaf(BlockType::Heading2, text), 1);
    }
    if let Some(text) = stripped.strip_prefix("# ") {
        return (BlockNode::leaf(BlockType::Heading1, text), 1);
    }
    if let Some(text) = stripped.strip_prefix("- ") {
        return (BlockNode::leaf(BlockType::BulletedListItem, text), 1);
    }
    if let Some(text) = stripped.strip_prefix("> ") {
        return (BlockNode::leaf(BlockType::Quote, text), 1);
    }
    if stripped.trim_end() == "---" {
        return (BlockNode::leaf(BlockType::Divider, ""), 1);
    }
    if let Some(text) = numbered_item_text(stripped) {
        return (BlockNode::leaf(BlockType::NumberedListItem, text), 1);
    }
    if let Some(rest) = stripped.strip_prefix("```") {
        return parse_code_fence(lines, i, level, rest);
    }
    if stripped.starts_with("<!-- reusable") {
        return parse_reusable(lines, i, level, stripped);
    }
    (BlockNode::leaf(BlockType::Paragraph, stripped), 1)
}

/// `"3. text"` → `Some("text")` when the prefix before `. ` is all digits.
fn numbered_item_text(stripped: &str) -> Option<&str> {
    let dot = stripped.find(". ")?;
    if dot > 0 && stripped.as_bytes()[..dot].iter().all(u8::is_ascii_digit) {
        Some(&stripped[dot + 2..])
    } else {
        None
    }
}

fn parse_code_fence(lines: &[&str], i: usize, level: usize, lang: &str) -> (BlockNode, usize) {
    let language = {
        let lang = lang.trim();
        if lang.is_empty() {
            None
        } else {
            Some(lang.to_string())
        }
    };

    let indent = level * INDENT_WIDTH;
    let mut code_lines: Vec<&str> = Vec::new();
    let mut j = i + 1;
    while j < lines.len() && lines[j].trim() != "```" {
        code_lines.push(strip_indent(lines[j], indent));
        j += 1;
    }
    let consumed = if j < lines.len() { j - i + 1 } else { j - i };

    let node = BlockNode {
        block_type: BlockType::Code,
        text: code_lines.join("\n"),
        language,
        ref_block_id: None,
        children: Vec::new(),
    };
    (node, consumed)
}

fn parse_reusable(lines: &[&str], i: usize, level: usize, stripped: &str) -> (BlockNode, usize) {
    // `<!-- reusable:42 -->` or `<!-- reusable -->`.
    let ref_block_id = stripped
        .strip_prefix("<!-- reusable:")
        .and_then(|rest| rest.strip_suffix("-->"))
        .and_then(|id| id.trim().parse::<i64>().ok());

    let indent = level * INDENT_WIDTH;
    let mut fallback: Vec<&str> = Vec::new();
    let mut j = i + 1;
    while j < lines.len() && lines[j].trim() != "<!-- /reusable -->" {
        fallback.push(strip_indent(lines[j], indent));
        j += 1;
    }
    let consumed = if j < lines.len() { j - i + 1 } else { j - i };

    let node = BlockNode {
        block_type: BlockType::Reusable,
        text: fallback.join("\n"),
        language: None,
        ref_block_id,
        children: Vec::new(),
    };
    (node, consumed)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Strip at most `width` leading spaces.
fn strip_indent(line: &str, width: usize) -> &str {
    let n = leading_spaces(line).min(width);
    &line[n..]
}

/// Mutable sibling list at the given level, found by walking the index
/// path from the roots.
fn siblings_at<'a>(
    roots: &'a mut Vec<BlockNode>,
    path: &[usize],
    level: usize,
) -> &'a mut Vec<BlockNode> {
    let mut list = roots;
    for &idx in path.iter().take(level) {
        list = &mut list[idx].children;
    }
    list
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Slug generation and page-path arithmetic.
//!
//! A page path is the slash-joined chain of slugs from the root of a space
//! down to the page, always starting with `/` (e.g. `/guide/setup`). Paths
//! are unique within a space and drive both the tree hierarchy and the
//! file mapping in [`crate::markdown`].

use crate::error::CoreError;

/// Maximum allowed length for a page title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum allowed length for a single slug segment.
pub const MAX_SLUG_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL-safe slug from a page title.
///
/// Converts to lowercase, replaces spaces and special characters with
/// hyphens, collapses consecutive hyphens, and trims leading/trailing
/// hyphens.
pub fn generate_slug(title: &str) -> String {
    let raw: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    // Collapse consecutive hyphens.
    let mut slug = String::with_capacity(raw.len());
    let mut prev_hyphen = false;
    for c in raw.chars() {
        if c == '-' {
            if !prev_hyphen {
                slug.push('-');
            }
            prev_hyphen = true;
        } else {
            slug.push(c);
            prev_hyphen = false;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Derive a human-readable title from a slug (`"getting-started"` →
/// `"Getting started"`). Used when materializing pages from files that
/// carry no front matter.
pub fn title_from_slug(slug: &str) -> String {
    let words = slug.replace('-', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a page title (non-empty, <= [`MAX_TITLE_LENGTH`] chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a slug segment (non-empty, lowercase alphanumeric + hyphens,
/// <= [`MAX_SLUG_LENGTH`] chars).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(CoreError::Validation(format!(
            "Slug must be at most {MAX_SLUG_LENGTH} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "Slug must contain only lowercase alphanumeric characters and hyphens".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Path arithmetic
// ---------------------------------------------------------------------------

/// Join a parent path and a slug into a child path.
///
/// `parent_path = None` produces a root-level path (`/slug`).
pub fn join_path(parent_path: Option<&str>, slug: &str) -> String {
    match parent_path {
        Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), slug),
        None => format!("/{slug}"),
    }
}

/// The parent path of a page path, or `None` for root-level paths.
pub fn parent_path(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        None
    } else {
        Some(&path[..idx])
    }
}

/// The final slug segment of a path.
pub fn slug_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Depth implied by a path: `/intro` is 0, `/guide/setup` is 1.
pub fn path_depth(path: &str) -> i32 {
    path.matches('/').count() as i32 - 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- generate_slug -------------------------------------------------------

    #[test]
    fn slug_basic_title() {
        assert_eq!(generate_slug("Getting Started"), "getting-started");
    }

    #[test]
    fn slug_special_characters() {
        assert_eq!(generate_slug("How to: Sync (v2)"), "how-to-sync-v2");
    }

    #[test]
    fn slug_collapses_consecutive_hyphens() {
        assert_eq!(generate_slug("foo---bar"), "foo-bar");
    }

    #[test]
    fn slug_trims_leading_trailing_hyphens() {
        assert_eq!(generate_slug("--hello--"), "hello");
    }

    // -- title_from_slug -----------------------------------------------------

    #[test]
    fn title_from_slug_capitalizes() {
        assert_eq!(title_from_slug("getting-started"), "Getting started");
    }

    #[test]
    fn title_from_empty_slug() {
        assert_eq!(title_from_slug(""), "");
    }

    // -- validation ----------------------------------------------------------

    #[test]
    fn title_empty_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn title_too_long_rejected() {
        assert!(validate_title(&"a".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn slug_valid() {
        assert!(validate_slug("getting-started").is_ok());
    }

    #[test]
    fn slug_uppercase_rejected() {
        assert!(validate_slug("Hello-World").is_err());
    }

    #[test]
    fn slug_empty_rejected() {
        assert!(validate_slug("").is_err());
    }

    // -- path arithmetic -----------------------------------------------------

    #[test]
    fn join_root_level() {
        assert_eq!(join_path(None, "intro"), "/intro");
    }

    #[test]
    fn join_nested() {
        assert_eq!(join_path(Some("/guide"), "setup"), "/guide/setup");
    }

    #[test]
    fn parent_of_nested_path() {
        assert_eq!(parent_path("/guide/setup"), Some("/guide"));
    }

    #[test]
    fn parent_of_root_path_is_none() {
        assert_eq!(parent_path("/intro"), None);
    }

    #[test]
    fn slug_of_path() {
        assert_eq!(slug_from_path("/guide/setup"), "setup");
        assert_eq!(slug_from_path("/intro"), "intro");
    }

    #[test]
    fn depth_of_paths() {
        assert_eq!(path_depth("/intro"), 0);
        assert_eq!(path_depth("/guide/setup"), 1);
        assert_eq!(path_depth("/a/b/c"), 2);
    }
}

//! Page-path ⇄ repository-file-path mapping and include/exclude filters.

/// File extension used for serialized pages.
pub const MARKDOWN_EXT: &str = ".md";

// ---------------------------------------------------------------------------
// Path mapping
// ---------------------------------------------------------------------------

/// Repository file path for a page path under a sync config's root.
///
/// `file_path("docs", "/guide/setup")` → `"docs/guide/setup.md"`. An empty
/// root maps pages directly at the repository top level.
pub fn file_path(root_path: &str, page_path: &str) -> String {
    let root = root_path.trim_matches('/');
    if root.is_empty() {
        format!("{}{MARKDOWN_EXT}", page_path.trim_start_matches('/'))
    } else {
        format!("{root}{page_path}{MARKDOWN_EXT}")
    }
}

/// Inverse of [`file_path`]: the page path for a repository file, or
/// `None` when the file is outside the root or not a markdown file.
pub fn page_path_from_file(root_path: &str, file: &str) -> Option<String> {
    let root = root_path.trim_matches('/');
    let relative = if root.is_empty() {
        file
    } else {
        file.strip_prefix(root)?.strip_prefix('/')?
    };
    let stem = relative.strip_suffix(MARKDOWN_EXT)?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("/{stem}"))
}

// ---------------------------------------------------------------------------
// Glob filters
// ---------------------------------------------------------------------------

/// Match a file path against a glob pattern.
///
/// Supported syntax: `**` matches any number of path segments (including
/// zero), `*` matches any run of characters within one segment. Everything
/// else matches literally.
pub fn matches_glob(pattern: &str, path: &str) -> bool {
    let pat: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match_segments(&pat, &segs)
}

fn match_segments(pat: &[&str], segs: &[&str]) -> bool {
    match pat.first() {
        None => segs.is_empty(),
        Some(&"**") => {
            // `**` consumes zero or more segments.
            (0..=segs.len()).any(|n| match_segments(&pat[1..], &segs[n..]))
        }
        Some(first) => match segs.first() {
            Some(seg) if match_segment(first, seg) => match_segments(&pat[1..], &segs[1..]),
            _ => false,
        },
    }
}

/// Within-segment match where `*` matches any run of characters.
fn match_segment(pat: &str, seg: &str) -> bool {
    match pat.split_once('*') {
        None => pat == seg,
        Some((prefix, rest)) => {
            if !seg.starts_with(prefix) {
                return false;
            }
            let remainder = &seg[prefix.len()..];
            (0..=remainder.len()).any(|n| match_segment(rest, &remainder[n..]))
        }
    }
}

/// Apply include/exclude pattern lists to a candidate file path.
///
/// An empty include list admits everything; exclusions always win.
pub fn matches_filters(include: &[String], exclude: &[String], path: &str) -> bool {
    let included =
        include.is_empty() || include.iter().any(|pattern| matches_glob(pattern, path));
    let excluded = exclude.iter().any(|pattern| matches_glob(pattern, path));
    included && !excluded
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- path mapping --------------------------------------------------------

    #[test]
    fn file_path_under_root() {
        assert_eq!(file_path("docs", "/guide/setup"), "docs/guide/setup.md");
    }

    #[test]
    fn file_path_with_empty_root() {
        assert_eq!(file_path("", "/intro"), "intro.md");
    }

    #[test]
    fn file_path_tolerates_root_slashes() {
        assert_eq!(file_path("/docs/", "/intro"), "docs/intro.md");
    }

    #[test]
    fn page_path_inverts_file_path() {
        assert_eq!(
            page_path_from_file("docs", "docs/guide/setup.md").as_deref(),
            Some("/guide/setup")
        );
        assert_eq!(
            page_path_from_file("", "intro.md").as_deref(),
            Some("/intro")
        );
    }

    #[test]
    fn page_path_rejects_files_outside_root() {
        assert_eq!(page_path_from_file("docs", "src/main.rs"), None);
        assert_eq!(page_path_from_file("docs", "other/intro.md"), None);
    }

    #[test]
    fn page_path_rejects_non_markdown() {
        assert_eq!(page_path_from_file("docs", "docs/diagram.png"), None);
    }

    #[test]
    fn mapping_round_trips() {
        for (root, page) in [("docs", "/intro"), ("docs", "/guide/setup"), ("", "/a/b")] {
            let file = file_path(root, page);
            assert_eq!(page_path_from_file(root, &file).as_deref(), Some(page));
        }
    }

    // -- globs ---------------------------------------------------------------

    #[test]
    fn literal_glob() {
        assert!(matches_glob("docs/intro.md", "docs/intro.md"));
        assert!(!matches_glob("docs/intro.md", "docs/other.md"));
    }

    #[test]
    fn star_within_segment() {
        assert!(matches_glob("docs/*.md", "docs/intro.md"));
        assert!(!matches_glob("docs/*.md", "docs/guide/setup.md"));
    }

    #[test]
    fn double_star_across_segments() {
        assert!(matches_glob("docs/**/*.md", "docs/guide/setup.md"));
        assert!(matches_glob("docs/**/*.md", "docs/intro.md"));
        assert!(matches_glob("**/*.md", "a/b/c/d.md"));
    }

    #[test]
    fn filters_exclude_wins() {
        let include = vec!["docs/**/*.md".to_string()];
        let exclude = vec!["docs/drafts/**".to_string()];
        assert!(matches_filters(&include, &exclude, "docs/intro.md"));
        assert!(!matches_filters(&include, &exclude, "docs/drafts/wip.md"));
    }

    #[test]
    fn empty_include_admits_all() {
        assert!(matches_filters(&[], &[], "anything/at/all.md"));
    }
}

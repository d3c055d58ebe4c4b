use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn html_tag_regex() -> &'static Regex {
    HTML_TAG_REGEX
        .get_or_init(|| Regex::new(r"</?[^>]*>").expect("failed to compile regex for HTML tags"))
}

/// Shortens `text` to roughly `limit` wide characters, appending `...` when
/// anything was cut.
///
/// CJK characters (anything from U+00C0 up) and ASCII capitals count as one
/// unit; everything else counts as half a unit.
pub fn truncate(text: &str, limit: usize) -> String {
    // Counted in half units.
    let limit = limit * 2;
    let mut used = 0;
    let mut end = 0;

    for (index, grapheme) in text.grapheme_indices(true) {
        if used >= limit {
            break;
        }

        used += grapheme_width(grapheme);
        if used > limit {
            break;
        }

        end = index + grapheme.len();
    }

    if end < text.len() {
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}

fn grapheme_width(grapheme: &str) -> usize {
    match grapheme.chars().next() {
        Some(ch) if ch as u32 >= 0xC0 || ch.is_ascii_uppercase() => 2,
        _ => 1,
    }
}

/// Removes anything that looks like an HTML tag.
pub fn strip_html_tags(html: &str) -> String {
    html_tag_regex().replace_all(html, "").into_owned()
}

/// Splits comma-separated keyword lists and removes blanks and duplicates,
/// keeping the first occurrence of each.
pub fn unique_keywords<'a>(keywords: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    keywords
        .into_iter()
        .flat_map(|keywords| keywords.split(','))
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Joins title parts, most specific first, prefixing "Page N" past the first
/// page.
pub fn page_title<'a>(parts: impl IntoIterator<Item = &'a str>, page: usize) -> String {
    let mut titles = Vec::new();
    if page > 1 {
        titles.push(format!("Page {page}"));
    }

    titles.extend(
        parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(str::to_string),
    );

    titles.join(" - ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello world", 3), "Hello...");
        assert_eq!(truncate("你好世界", 2), "你好...");
        assert_eq!(truncate("aB", 1), "a...");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("", 5), "");
    }

    #[test]
    fn test_truncate_keeps_graphemes_whole() {
        assert_eq!(truncate("e\u{301}tude", 1), "e\u{301}t...");
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(
            strip_html_tags(r#"<p>Hello <a href="/x">there</a></p><br/>"#),
            "Hello there"
        );
    }

    #[test]
    fn test_unique_keywords() {
        assert_eq!(
            unique_keywords(["rust, async", "rust,,web", " async "]),
            vec!["rust", "async", "web"]
        );
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title(["Rust", "Categories", "Perch"], 1), "Rust - Categories - Perch");
        assert_eq!(
            page_title(["Rust", "Categories", "Perch"], 3),
            "Page 3 - Rust - Categories - Perch"
        );
        assert_eq!(page_title(["", "Perch"], 1), "Perch");
    }

    #[test]
    fn test_page_title_from_borrowed_parts() {
        let name = String::from("Rust");
        let parts = vec![name.as_str(), "Tags"];

        assert_eq!(page_title(parts, 2), "Page 2 - Rust - Tags");
        assert_eq!(page_title(std::iter::empty(), 4), "Page 4");
    }
}

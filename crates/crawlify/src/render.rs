//! Decide whether a fetched page needs a browser render

use regex::{Regex, RegexSet};
use std::sync::OnceLock;

/// Pages with more extracted text than this are considered complete
const CONTENT_TEXT_THRESHOLD: usize = 120;

/// Pages with less text than this and at least one script look like JS shells
const SHELL_TEXT_THRESHOLD: usize = 20;

/// Markers left by client-side frameworks in otherwise empty pages
const SPA_SIGNATURES: &[&str] = &[
    r#"(?i)id="root""#,
    r#"(?i)id="app""#,
    r#"(?i)id="__next""#,
    r"(?i)data-reactroot",
    r"(?i)ng-version",
    r#"(?i)<script[^>]+type="module""#,
];

fn spa_signatures() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(SPA_SIGNATURES).unwrap_or_else(|_| RegexSet::empty()))
}

fn script_tag() -> &'static Option<Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<script\b").ok())
}

/// Check whether a content type looks like HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("html")
}

/// Decide whether a browser render is warranted.
///
/// Rules, first match wins:
/// 1. blank HTML renders
/// 2. a present, non-HTML content type never renders
/// 3. more than 120 characters of text never renders
/// 4. a framework mount point or module script renders
/// 5. under 20 characters of text plus any `<script>` renders
///
/// An absent content type is treated as HTML.
pub fn should_render(html: &str, plain_text: &str, content_type: Option<&str>) -> bool {
    let html = html.trim();
    if html.is_empty() {
        return true;
    }

    if let Some(ct) = content_type {
        if !is_html_content_type(ct) {
            return false;
        }
    }

    let text_len = plain_text.chars().count();
    if text_len > CONTENT_TEXT_THRESHOLD {
        return false;
    }

    if spa_signatures().is_match(html) {
        return true;
    }

    let has_script = script_tag()
        .as_ref()
        .map(|re| re.is_match(html))
        .unwrap_or(false);

    text_len < SHELL_TEXT_THRESHOLD && has_script
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: Option<&str> = Some("text/html; charset=utf-8");

    #[test]
    fn test_blank_html_renders() {
        assert!(should_render("", "", HTML));
        assert!(should_render("  \n ", "", Some("application/pdf")));
    }

    #[test]
    fn test_non_html_content_type_never_renders() {
        assert!(!should_render("<div id=\"root\"></div>", "", Some("application/pdf")));
        assert!(!should_render("{\"a\":1}", "", Some("application/json")));
        assert!(!should_render("<script></script>", "", Some("text/plain")));
    }

    #[test]
    fn test_long_text_never_renders() {
        let text = "x".repeat(121);
        let html = format!("<div id=\"root\">{}</div><script></script>", text);
        assert!(!should_render(&html, &text, HTML));
    }

    #[test]
    fn test_spa_shell_renders() {
        assert!(should_render("<div id=\"root\"></div>", "", HTML));
        assert!(should_render("<div ID=\"APP\"></div>", "", HTML));
        assert!(should_render("<div id=\"__next\"></div>", "", HTML));
        assert!(should_render("<html ng-version=\"17\"></html>", "", HTML));
        assert!(should_render("<div data-reactroot></div>", "", HTML));
        assert!(should_render(
            "<script src=\"/main.js\" type=\"module\"></script>",
            "",
            HTML
        ));
    }

    #[test]
    fn test_spa_signature_with_moderate_text_renders() {
        let text = "y".repeat(60);
        let html = format!("<div id=\"root\"><p>{}</p></div>", text);
        assert!(should_render(&html, &text, HTML));
    }

    #[test]
    fn test_empty_shell_with_script_renders() {
        assert!(should_render(
            "<html><body><script src=\"app.js\"></script></body></html>",
            "",
            HTML
        ));
    }

    #[test]
    fn test_short_page_without_script_does_not_render() {
        assert!(!should_render("<p>Hi</p>", "Hi", HTML));
    }

    #[test]
    fn test_script_with_enough_text_does_not_render() {
        let text = "z".repeat(50);
        let html = format!("<p>{}</p><script></script>", text);
        assert!(!should_render(&html, &text, HTML));
    }

    #[test]
    fn test_missing_content_type_treated_as_html() {
        assert!(should_render("<div id=\"root\"></div>", "", None));
    }

    #[test]
    fn test_inline_script_text_does_not_count_as_content() {
        let bootstrap = format!("window.__STATE__ = {{\"items\": \"{}\"}};", "q".repeat(300));
        let html = format!(
            "<html><body><p>Loading</p><script>{}</script></body></html>",
            bootstrap
        );
        let text = crate::extract::plain_text(&html);
        assert_eq!(text, "Loading");
        assert!(should_render(&html, &text, HTML));
    }
}

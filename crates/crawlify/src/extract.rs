//! Plain text and link extraction

use crate::types::Link;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text never counts as page content
const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Schemes that are never reported as links
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extract the visible text of `<body>`, whitespace collapsed and trimmed
pub fn plain_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };

    let mut raw = String::new();
    for element in document.select(&body) {
        collect_text(element, &mut raw);
    }
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(el) => {
                if SKIP_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapse whitespace runs to one space and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract deduplicated absolute links from `<a href>` elements
pub fn links(html: &str, base_url: &str) -> Vec<Link> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for anchor in document.select(&anchors) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let lower = href.to_ascii_lowercase();
        if IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            continue;
        }

        let Some(resolved) = resolve_link(href, base_url) else {
            continue;
        };
        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = collapse_whitespace(&anchor.text().collect::<String>());
        items.push(Link {
            url: resolved,
            text: if text.is_empty() { None } else { Some(text) },
        });
    }

    items
}

/// Resolve an href against the page URL.
///
/// Hrefs that already carry a scheme are returned verbatim.
fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    if has_scheme(href) {
        return Some(href.to_string());
    }

    let base = Url::parse(base_url).ok()?;
    base.host_str()?;

    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("{}://{}", base.scheme(), rest));
    }

    base.join(href).ok().map(|u| u.to_string())
}

/// True when `href` starts with `scheme:` per RFC 3986
fn has_scheme(href: &str) -> bool {
    let Some(colon) = href.find(':') else {
        return false;
    };
    let scheme = &href[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_collapses_whitespace() {
        let html = "<html><body><h1>Hello</h1>\n\n  <p>big   world</p></body></html>";
        assert_eq!(plain_text(html), "Hello big world");
    }

    #[test]
    fn test_plain_text_skips_scripts_and_styles() {
        let html = "<body><p>Before</p><script>alert('bad');</script><style>p{}</style><p>After</p></body>";
        assert_eq!(plain_text(html), "Before After");
    }

    #[test]
    fn test_plain_text_ignores_head() {
        let html = "<html><head><title>Title</title></head><body>Content</body></html>";
        assert_eq!(plain_text(html), "Content");
    }

    #[test]
    fn test_plain_text_empty() {
        assert_eq!(plain_text(""), "");
        assert_eq!(plain_text("   "), "");
        assert_eq!(plain_text("<div id=\"root\"></div>"), "");
    }

    #[test]
    fn test_plain_text_decodes_entities() {
        assert_eq!(plain_text("<p>Tom &amp; Jerry</p>"), "Tom & Jerry");
    }

    #[test]
    fn test_links_single_anchor() {
        let html = r#"<html><body><a href="https://example.com">Example</a></body></html>"#;
        let items = links(html, "https://source.test/page");
        assert_eq!(
            items,
            vec![Link {
                url: "https://example.com".to_string(),
                text: Some("Example".to_string()),
            }]
        );
    }

    #[test]
    fn test_links_resolve_relative() {
        let html = r#"
            <a href="/about">About</a>
            <a href="next">Next</a>
            <a href="//cdn.example.com/x.js">CDN</a>
        "#;
        let items = links(html, "https://source.test/docs/page");
        let urls: Vec<&str> = items.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://source.test/about",
                "https://source.test/docs/next",
                "https://cdn.example.com/x.js",
            ]
        );
    }

    #[test]
    fn test_links_skip_ignored() {
        let html = r##"
            <a href="">Empty</a>
            <a href="#top">Top</a>
            <a href="javascript:void(0)">JS</a>
            <a href="MAILTO:me@example.com">Mail</a>
            <a href="tel:123">Call</a>
            <a href="data:text/plain,hi">Data</a>
            <a href="https://kept.example">Kept</a>
        "##;
        let items = links(html, "https://source.test/");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://kept.example");
    }

    #[test]
    fn test_links_dedupe_keeps_first() {
        let html = r#"
            <a href="https://example.com/a">First</a>
            <a href="https://example.com/a">Second</a>
            <a href="/a"></a>
        "#;
        let items = links(html, "https://example.com/");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text.as_deref(), Some("First"));
    }

    #[test]
    fn test_links_empty_text_is_none() {
        let html = r#"<a href="https://example.com/x">   </a>"#;
        let items = links(html, "https://example.com/");
        assert_eq!(items[0].text, None);
    }

    #[test]
    fn test_links_relative_with_bad_base() {
        let html = r#"<a href="/about">About</a><a href="https://ok.example">Ok</a>"#;
        let items = links(html, "not a url");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://ok.example");
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("ftp://x"));
        assert!(has_scheme("urn:isbn:123"));
        assert!(!has_scheme("/path:with-colon"));
        assert!(!has_scheme("1abc:x"));
        assert!(!has_scheme("relative"));
    }
}

//! Link extractor
//!
//! A pure, stateless transform from fetched HTML to absolute candidate URLs.
//! It resolves relative hrefs against the page URL and discards anything the
//! crawler could never fetch (fragments, mailto:, javascript:, data URIs).
//! It does not deduplicate and applies no domain policy; gating is the
//! scheduler's job.

use scraper::{Html, Selector};
use url::Url;

/// Extracts candidate outbound links from an HTML document.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return links,
    };

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(url) = resolve_href(href, base_url) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves one href; returns None for anything non-fetchable
fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;

    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/section/page").unwrap()
    }

    fn urls(html: &str) -> Vec<String> {
        extract_links(html, &base())
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_absolute_link() {
        let found = urls(r#"<a href="https://example.com/other">x</a>"#);
        assert_eq!(found, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_root_relative_link() {
        let found = urls(r#"<a href="/about">x</a>"#);
        assert_eq!(found, vec!["https://example.com/about"]);
    }

    #[test]
    fn test_path_relative_link() {
        let found = urls(r#"<a href="sibling">x</a>"#);
        assert_eq!(found, vec!["https://example.com/section/sibling"]);
    }

    #[test]
    fn test_skips_non_fetchable_schemes() {
        let html = r#"
            <a href="javascript:void(0)">a</a>
            <a href="mailto:x@example.com">b</a>
            <a href="tel:+123">c</a>
            <a href="data:text/plain,hi">d</a>
            <a href="ftp://example.com/f">e</a>
        "#;
        assert!(urls(html).is_empty());
    }

    #[test]
    fn test_skips_fragment_only() {
        assert!(urls(r##"<a href="#top">x</a>"##).is_empty());
    }

    #[test]
    fn test_keeps_duplicates() {
        // Dedup belongs to the graph's edge set, not here
        let html = r#"<a href="/a">1</a><a href="/a">2</a>"#;
        assert_eq!(urls(html).len(), 2);
    }

    #[test]
    fn test_cross_domain_links_pass_through() {
        // Domain filtering is the scheduler's responsibility
        let found = urls(r#"<a href="https://other.org/page">x</a>"#);
        assert_eq!(found, vec!["https://other.org/page"]);
    }

    #[test]
    fn test_malformed_document_yields_no_panic() {
        let found = urls("<a href=\"/ok\"><div><<<>");
        assert_eq!(found, vec!["https://example.com/ok"]);
    }
}

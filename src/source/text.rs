//! Shared extraction helpers for site adapters: static selectors, text walking, URL joining.

use std::ops::Deref;
use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::outcome::ScrapeError;

/// Parses a selector at static init; panics on invalid CSS.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

/// A lazily compiled selector that remembers its source text for error messages.
pub(crate) struct Css {
    css: &'static str,
    selector: LazyLock<Selector>,
}

impl Css {
    pub(crate) const fn new(css: &'static str, init: fn() -> Selector) -> Self {
        Self {
            css,
            selector: LazyLock::new(init),
        }
    }

    /// First match below `root`, if any.
    pub(crate) fn first<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        root.select(self).next()
    }

    /// First match below `root`, or [`ScrapeError::MissingElement`].
    pub(crate) fn require<'a>(
        &self,
        root: ElementRef<'a>,
        url: &str,
    ) -> Result<ElementRef<'a>, ScrapeError> {
        self.first(root)
            .ok_or_else(|| ScrapeError::missing(self.css, url))
    }
}

impl Deref for Css {
    type Target = Selector;

    fn deref(&self) -> &Selector {
        &self.selector
    }
}

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: $crate::source::text::Css = $crate::source::text::Css::new($css, || {
            $crate::source::text::compile_static_selector($css)
        });
    };
}

pub(crate) use selector;

/// Element text with whitespace runs collapsed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every non-blank text node below `element`, trimmed, in document order.
///
/// Subtrees whose root matches one of `excluded` are skipped, as are
/// `script` and `style` contents.
pub(crate) fn text_nodes(element: ElementRef<'_>, excluded: &[&Css]) -> Vec<String> {
    let mut out = Vec::new();
    collect_text_nodes(element, excluded, &mut out);
    out
}

fn collect_text_nodes(element: ElementRef<'_>, excluded: &[&Css], out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            Node::Element(tag) => {
                if matches!(tag.name(), "script" | "style") {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if excluded.iter().any(|css| css.matches(&child)) {
                    continue;
                }
                collect_text_nodes(child, excluded, out);
            }
            _ => {}
        }
    }
}

/// Text nodes joined into paragraphs.
pub(crate) fn paragraphs(element: ElementRef<'_>, excluded: &[&Css]) -> String {
    text_nodes(element, excluded).join("\n\n")
}

/// Resolves `href` against `base`; falls back to `href` unchanged.
pub(crate) fn absolute_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map_or_else(|_| href.to_string(), String::from)
}

/// Anchor title (the `title` attribute when present, else its text) and absolute URL.
pub(crate) fn link(anchor: ElementRef<'_>, base: &str) -> Option<(String, String)> {
    let href = anchor.value().attr("href")?;
    let title = anchor
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map_or_else(|| text_of(anchor), str::to_string);
    Some((title, absolute_url(base, href)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scraper::Html;

    use super::*;

    selector!(CONTENT, "#content");
    selector!(ADS, ".ads");
    selector!(LINK, "a");

    const PAGE: &str = r#"
        <div id="content">
            <p>First   line</p>
            <div class="ads">Buy now</div>
            <script>var x = 1;</script>
            <p>Second <b>bold</b> line</p>
        </div>
        <a href="/novel/1" title="  ">Novel   One</a>
    "#;

    #[test]
    fn test_text_nodes_skip_excluded_and_scripts() {
        let html = Html::parse_document(PAGE);
        let content = CONTENT.require(html.root_element(), "u").unwrap();
        let nodes = text_nodes(content, &[&ADS]);
        assert_eq!(nodes, ["First   line", "Second", "bold", "line"]);
    }

    #[test]
    fn test_paragraphs_join_with_blank_lines() {
        let html = Html::parse_document(PAGE);
        let content = CONTENT.require(html.root_element(), "u").unwrap();
        let text = paragraphs(content, &[&ADS]);
        assert!(text.starts_with("First   line\n\nSecond"));
        assert!(!text.contains("Buy now"));
    }

    #[test]
    fn test_require_reports_selector_and_url() {
        let html = Html::parse_document("<p>nothing</p>");
        let err = CONTENT
            .require(html.root_element(), "https://example.com/x")
            .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::MissingElement { ref selector, ref url }
                if selector == "#content" && url == "https://example.com/x"
        ));
    }

    #[test]
    fn test_link_falls_back_to_text_for_blank_title() {
        let html = Html::parse_document(PAGE);
        let anchor = LINK.first(html.root_element()).unwrap();
        let (title, url) = link(anchor, "https://example.com/list/").unwrap();
        assert_eq!(title, "Novel One");
        assert_eq!(url, "https://example.com/novel/1");
    }

    #[test]
    fn test_absolute_url_keeps_absolute_hrefs() {
        assert_eq!(
            absolute_url("https://a.com/", "https://b.com/x"),
            "https://b.com/x"
        );
        assert_eq!(absolute_url("not a base", "/x"), "/x");
    }
}

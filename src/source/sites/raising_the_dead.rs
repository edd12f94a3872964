//! Raising The Dead adapter. Chapters are usually reached through redirects.

use super::normalize_base;
use crate::fetch::Document;
use crate::outcome::ScrapeError;
use crate::source::Source;
use crate::source::text::{self, selector};

const BASE_URL: &str = "https://rtd.moe/";

selector!(CONTENT, "#content");
selector!(NESTED_BLOCK, "div");

/// Base adapter for rtd.moe.
#[derive(Debug, Clone)]
pub struct RaisingTheDead {
    base_url: String,
}

impl Default for RaisingTheDead {
    fn default() -> Self {
        Self::new()
    }
}

impl RaisingTheDead {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: normalize_base(base_url),
        }
    }
}

impl Source for RaisingTheDead {
    fn id(&self) -> &str {
        "raising_the_dead"
    }

    fn name(&self) -> &str {
        "Raising The Dead"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let content = CONTENT.require(html.root_element(), doc.url())?;
        Ok(text::paragraphs(content, &[&NESTED_BLOCK]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_text_skips_nested_blocks() {
        let doc = Document::new(
            "https://rtd.moe/kumo/final",
            r#"<section id="content"><p>Spider.</p><div class="share">Share this</div><p>Web.</p></section>"#,
        );
        assert_eq!(
            RaisingTheDead::new().chapter_text(&doc).unwrap(),
            "Spider.\n\nWeb."
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(
            RaisingTheDead::with_base_url("http://127.0.0.1:4000").base_url(),
            "http://127.0.0.1:4000/"
        );
    }
}

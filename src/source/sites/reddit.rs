//! Reddit adapter. Chapter posts are read from the old.reddit.com mirror.

use super::normalize_base;
use crate::fetch::Document;
use crate::outcome::ScrapeError;
use crate::source::Source;
use crate::source::text::{self, selector};

const BASE_URL: &str = "https://www.reddit.com/";
const MIRROR_URL: &str = "https://old.reddit.com/";

selector!(LISTING, ".linklisting");
selector!(
    POST_BODY,
    ".usertext-body, .may-blank-within, .md-container"
);
selector!(EXCLUDED, "table, blockquote");

/// Base adapter for Reddit-hosted chapters.
#[derive(Debug, Clone)]
pub struct Reddit {
    base_url: String,
    mirror_url: String,
}

impl Default for Reddit {
    fn default() -> Self {
        Self::new()
    }
}

impl Reddit {
    #[must_use]
    pub fn new() -> Self {
        Self::with_urls(BASE_URL, MIRROR_URL)
    }

    /// Overrides both the matched prefix and the mirror chapter URLs are rewritten to.
    #[must_use]
    pub fn with_urls(base_url: &str, mirror_url: &str) -> Self {
        Self {
            base_url: normalize_base(base_url),
            mirror_url: normalize_base(mirror_url),
        }
    }
}

impl Source for Reddit {
    fn id(&self) -> &str {
        "reddit"
    }

    fn name(&self) -> &str {
        "Reddit"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let listing = LISTING.require(html.root_element(), doc.url())?;
        let body = POST_BODY.require(listing, doc.url())?;
        Ok(text::paragraphs(body, &[&EXCLUDED]))
    }

    fn transform_chapter_url(&self, url: &str) -> String {
        match url.strip_prefix(self.base_url.as_str()) {
            Some(rest) => format!("{}{rest}", self.mirror_url),
            None => url.to_string(),
        }
    }
}

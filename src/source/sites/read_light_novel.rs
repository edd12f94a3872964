//! ReadLightNovel adapter.
//!
//! The catalog is an alphabetical index: page 0 is the full list, pages
//! 1 through 26 are the letters A to Z, and anything past that is empty.

use async_trait::async_trait;

use super::{normalize_base, page_context};
use crate::fetch::{Document, HttpFetcher};
use crate::library::{BookMetadata, ChapterMetadata};
use crate::outcome::{Outcome, ScrapeError, try_connect};
use crate::source::text::{self, selector};
use crate::source::{CatalogSource, Source};

const BASE_URL: &str = "https://www.readlightnovel.me/";

const CATALOG_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

selector!(CHAPTER_CONTENT, ".chapter-content3 > .desc");
selector!(EXCLUDED, "a, .ads-title, .hidden");
selector!(CHAPTER_LINK, ".chapter-chs a[href]");
selector!(INDEX_ENTRY, ".list-by-word-body > ul > li a[href]");
selector!(ANCHOR, "a[href]");

/// Catalog adapter for readlightnovel.
#[derive(Debug, Clone)]
pub struct ReadLightNovel {
    fetcher: HttpFetcher,
    base_url: String,
}

impl ReadLightNovel {
    #[must_use]
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_base_url(fetcher, BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(fetcher: HttpFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: normalize_base(base_url),
        }
    }

    /// URL of catalog page `index`, or `None` past the last letter.
    fn catalog_url(&self, index: usize) -> Option<String> {
        let list = format!("{}novel-list", self.base_url);
        match index {
            0 => Some(list),
            _ => CATALOG_LETTERS
                .chars()
                .nth(index - 1)
                .map(|letter| format!("{list}/{letter}")),
        }
    }

    fn links(&self, doc: &Document, css: &text::Css) -> Vec<(String, String)> {
        let html = doc.html();
        html.select(css)
            .filter_map(|anchor| text::link(anchor, &self.base_url))
            .collect()
    }
}

impl Source for ReadLightNovel {
    fn id(&self) -> &str {
        "read_light_novel"
    }

    fn name(&self) -> &str {
        "Read Light Novel"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let content = CHAPTER_CONTENT.require(html.root_element(), doc.url())?;
        Ok(text::paragraphs(content, &[&EXCLUDED]))
    }
}

#[async_trait]
impl CatalogSource for ReadLightNovel {
    async fn chapter_list(&self, doc: &Document) -> Result<Vec<ChapterMetadata>, ScrapeError> {
        Ok(self
            .links(doc, &CHAPTER_LINK)
            .into_iter()
            .map(|(title, url)| ChapterMetadata::new(title, url))
            .collect())
    }

    async fn catalog_list(&self, index: usize) -> Outcome<Vec<BookMetadata>> {
        let Some(url) = self.catalog_url(index) else {
            return Ok(Vec::new());
        };

        try_connect(&page_context(index + 1, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            Ok::<_, ScrapeError>(
                self.links(&doc, &INDEX_ENTRY)
                    .into_iter()
                    .map(|(title, url)| BookMetadata::new(title, url))
                    .collect(),
            )
        })
        .await
    }

    async fn catalog_search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>> {
        if input.trim().is_empty() || index > 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}search/autocomplete", self.base_url);

        try_connect(&page_context(index + 1, &url), || async {
            let doc = self.fetcher.post_form(&url, &[("q", input)]).await?;
            Ok::<_, ScrapeError>(
                self.links(&doc, &ANCHOR)
                    .into_iter()
                    .map(|(title, url)| BookMetadata::new(title, url))
                    .collect(),
            )
        })
        .await
    }
}

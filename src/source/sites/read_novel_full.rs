//! ReadNovelFull adapter.
//!
//! Book page: `https://readnovelfull.com/<slug>.html`. The chapter list is not
//! in the book page; it comes from an AJAX archive keyed by the novel id.

use async_trait::async_trait;
use tracing::instrument;

use super::{normalize_base, page_context};
use crate::fetch::{Document, HttpFetcher};
use crate::library::{BookMetadata, ChapterMetadata};
use crate::outcome::{Outcome, ScrapeError, try_connect};
use crate::source::text::{self, selector};
use crate::source::{CatalogSource, Source};

const BASE_URL: &str = "https://readnovelfull.com/";

selector!(CHAPTER_CONTENT, "#chr-content");
selector!(RATING, "#rating");
selector!(ANCHOR, "a[href]");
selector!(CATALOG_ROW, "#list-page .row");
selector!(SEARCH_RESULT, ".col-novel-main .novel-title a, .archive .novel-title a");

/// Catalog adapter for readnovelfull.com.
#[derive(Debug, Clone)]
pub struct ReadNovelFull {
    fetcher: HttpFetcher,
    base_url: String,
}

impl ReadNovelFull {
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

    fn parse_catalog(&self, doc: &Document) -> Vec<BookMetadata> {
        let html = doc.html();
        html.select(&CATALOG_ROW)
            .filter_map(|row| ANCHOR.first(row))
            .filter_map(|anchor| text::link(anchor, &self.base_url))
            .map(|(title, url)| BookMetadata::new(title, url))
            .collect()
    }

    fn parse_search(&self, doc: &Document) -> Vec<BookMetadata> {
        let html = doc.html();
        html.select(&SEARCH_RESULT)
            .filter_map(|anchor| text::link(anchor, &self.base_url))
            .map(|(title, url)| BookMetadata::new(title, url))
            .collect()
    }

    fn novel_id(doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let rating = RATING.require(html.root_element(), doc.url())?;
        rating
            .value()
            .attr("data-novel-id")
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::missing("#rating[data-novel-id]", doc.url()))
    }
}

impl Source for ReadNovelFull {
    fn id(&self) -> &str {
        "read_novel_full"
    }

    fn name(&self) -> &str {
        "Read Novel Full"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let content = CHAPTER_CONTENT.require(html.root_element(), doc.url())?;
        Ok(text::paragraphs(content, &[]))
    }
}

#[async_trait]
impl CatalogSource for ReadNovelFull {
    #[instrument(skip(self, doc), fields(url = %doc.url()))]
    async fn chapter_list(&self, doc: &Document) -> Result<Vec<ChapterMetadata>, ScrapeError> {
        let novel_id = Self::novel_id(doc)?;
        let archive_url = format!("{}ajax/chapter-archive", self.base_url);
        let archive = self
            .fetcher
            .fetch_xhr(&archive_url, &[("novelId", novel_id.as_str())])
            .await?;

        let html = archive.html();
        Ok(html
            .select(&ANCHOR)
            .filter_map(|anchor| text::link(anchor, &self.base_url))
            .map(|(title, url)| ChapterMetadata::new(title, url))
            .collect())
    }

    async fn catalog_list(&self, index: usize) -> Outcome<Vec<BookMetadata>> {
        let page = index + 1;
        let mut url = format!("{}most-popular-novel", self.base_url);
        if page > 1 {
            url.push_str(&format!("?page={page}"));
        }

        try_connect(&page_context(page, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            Ok::<_, ScrapeError>(self.parse_catalog(&doc))
        })
        .await
    }

    async fn catalog_search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>> {
        // Results come as a single page.
        if input.trim().is_empty() || index > 0 {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}search?keyword={}",
            self.base_url,
            urlencoding::encode(input)
        );

        try_connect(&page_context(index + 1, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            Ok::<_, ScrapeError>(self.parse_search(&doc))
        })
        .await
    }
}

//! LightNovelsTranslations adapter.
//!
//! A WordPress site without a real catalog: the book list is the primary
//! navigation menu and chapter titles only exist in the chapter URL slugs.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;

use super::{normalize_base, page_context};
use crate::fetch::{Document, HttpFetcher};
use crate::library::{BookMetadata, ChapterMetadata};
use crate::outcome::{Outcome, ScrapeError, try_connect};
use crate::source::text::{self, selector};
use crate::source::{CatalogSource, Source};

const BASE_URL: &str = "https://lightnovelstranslations.com/";

selector!(ARTICLE, ".page, .type-page, .status-publish, .hentry");
selector!(ENTRY_CONTENT, ".entry-content");
selector!(TEXTBOX, "#textbox");
selector!(CHAPTER_LINK, ".su-spoiler-content .su-u-clearfix.su-u-trim a[href]");
selector!(PRIMARY_NAV, "#prime_nav");
selector!(NAV_LINK, "a");
selector!(SEARCH_CATEGORY, ".jetpack-search-filters-widget__filter-list a[href]");

#[allow(clippy::expect_used)]
static LAST_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+/(.+)$").expect("slug regex is valid"));

#[allow(clippy::expect_used)]
static NUMBERED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+) (\d+) (\S.*)$").expect("numbered title regex is valid")
});

#[allow(clippy::expect_used)]
static CATEGORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*category_name=(.*)$").expect("category regex is valid"));

const ILLUSTRATION_SUFFIXES: [&str; 3] = ["-illustrations/", "-illustration/", "-illustration-page/"];
const ILLUSTRATION_TITLES: [&str; 2] = ["Novel Illustrations", "Novels Illustrations"];

/// Catalog adapter for lightnovelstranslations.
#[derive(Debug, Clone)]
pub struct LightNovelsTranslations {
    fetcher: HttpFetcher,
    base_url: String,
}

impl LightNovelsTranslations {
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

    fn parse_menu(&self, doc: &Document) -> Vec<BookMetadata> {
        let html = doc.html();
        let Some(nav) = PRIMARY_NAV.first(html.root_element()) else {
            return Vec::new();
        };
        // The first menu entry is the home link; books sit in the next three.
        nav.children()
            .filter_map(ElementRef::wrap)
            .skip(1)
            .take(3)
            .flat_map(|menu| menu.select(&NAV_LINK))
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                let title = text::text_of(anchor);
                is_book_link(href, &title)
                    .then(|| BookMetadata::new(title, text::absolute_url(&self.base_url, href)))
            })
            .collect()
    }

    fn parse_search(&self, doc: &Document) -> Vec<BookMetadata> {
        let html = doc.html();
        html.select(&SEARCH_CATEGORY)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                let name = CATEGORY_NAME.captures(href)?.get(1)?.as_str();
                Some(BookMetadata::new(
                    text::text_of(anchor),
                    format!("{}{name}/", self.base_url),
                ))
            })
            .collect()
    }
}

fn is_book_link(href: &str, title: &str) -> bool {
    href != "#"
        && !ILLUSTRATION_SUFFIXES
            .iter()
            .any(|suffix| href.ends_with(suffix))
        && !ILLUSTRATION_TITLES.contains(&title)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Chapter title recovered from the last URL path segment.
///
/// `.../volume-2-the-dark-forest/` becomes `Volume 2 - The dark forest`.
fn title_from_url(url: &str) -> Option<String> {
    let decoded = urlencoding::decode(url).map_or_else(|_| url.to_string(), |d| d.into_owned());
    let decoded = decoded.strip_suffix('/').unwrap_or(&decoded);
    let slug = LAST_SEGMENT.captures(decoded)?.get(1)?.as_str();
    let title = capitalize(&slug.replace('-', " "));

    Some(match NUMBERED_TITLE.captures(&title) {
        Some(parts) => format!("{} {} - {}", &parts[1], &parts[2], capitalize(&parts[3])),
        None => title,
    })
}

impl Source for LightNovelsTranslations {
    fn id(&self) -> &str {
        "light_novels_translations"
    }

    fn name(&self) -> &str {
        "Light Novel Translations"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        let html = doc.html();
        let article = ARTICLE.require(html.root_element(), doc.url())?;
        let content = ENTRY_CONTENT.require(article, doc.url())?;
        Ok(text::paragraphs(content, &[&TEXTBOX]))
    }
}

#[async_trait]
impl CatalogSource for LightNovelsTranslations {
    async fn chapter_list(&self, doc: &Document) -> Result<Vec<ChapterMetadata>, ScrapeError> {
        let html = doc.html();
        Ok(html
            .select(&CHAPTER_LINK)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                let url = text::absolute_url(&self.base_url, href);
                let title = title_from_url(&url).unwrap_or_else(|| text::text_of(anchor));
                Some(ChapterMetadata::new(title, url))
            })
            .collect())
    }

    async fn catalog_list(&self, index: usize) -> Outcome<Vec<BookMetadata>> {
        if index > 0 {
            return Ok(Vec::new());
        }
        let url = self.base_url.clone();

        try_connect(&page_context(index + 1, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            Ok::<_, ScrapeError>(self.parse_menu(&doc))
        })
        .await
    }

    async fn catalog_search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>> {
        if input.trim().is_empty() || index > 0 {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}?order=DESC&orderby=relevance&s={}",
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

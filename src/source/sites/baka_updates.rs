//! Baka-Updates (mangaupdates.com) database adapter, restricted to novels.

use async_trait::async_trait;
use scraper::ElementRef;

use super::{normalize_base, page_context};
use crate::fetch::{Document, HttpFetcher};
use crate::library::{BookAuthor, BookData, BookMetadata};
use crate::outcome::{Outcome, ScrapeError, try_connect};
use crate::source::text::{self, selector};
use crate::source::{DatabaseSource, GenreMap};

const BASE_URL: &str = "https://www.mangaupdates.com/";

const NOVEL_TAG: &str = "(Novel)";

selector!(GENRE_OPTION, ".p-1.col-6.text");
selector!(RESULT_CELL, "div.col-6.py-1.py-md-0.text");
selector!(ANCHOR, "a[href]");
selector!(ANY_ANCHOR, "a");
selector!(TITLE, ".releasestitle.tabletitle");
selector!(CATEGORY_HEADER, "div.sCat > b");
selector!(DESCRIPTION_MORE, "#div_desc_more");
selector!(FIRST_DIV, "div");
selector!(CATEGORY_TAG, "li > a");

/// Database adapter for mangaupdates.com.
#[derive(Debug, Clone)]
pub struct BakaUpdates {
    fetcher: HttpFetcher,
    base_url: String,
}

fn remove_novel_tag(title: &str) -> String {
    title
        .trim()
        .strip_suffix(NOVEL_TAG)
        .unwrap_or(title)
        .trim()
        .to_string()
}

impl BakaUpdates {
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

    fn series_url(&self, page: usize, filters: &[String]) -> String {
        let mut settings = Vec::new();
        if page > 1 {
            settings.push(format!("page={page}"));
        }
        settings.push("display=list".to_string());
        settings.extend(filters.iter().cloned());
        settings.push("type=novel".to_string());
        settings.push("perpage=50".to_string());
        format!("{}series.html?{}", self.base_url, settings.join("&"))
    }

    async fn fetch_results(&self, page: usize, url: String) -> Outcome<Vec<BookMetadata>> {
        try_connect(&page_context(page, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            let html = doc.html();
            Ok::<_, ScrapeError>(
                html.select(&RESULT_CELL)
                    .filter_map(|cell| ANCHOR.first(cell))
                    .filter_map(|anchor| text::link(anchor, &self.base_url))
                    .map(|(title, url)| BookMetadata::new(remove_novel_tag(&title), url))
                    .collect(),
            )
        })
        .await
    }

    fn book_links(&self, entry: Option<ElementRef<'_>>) -> Vec<BookMetadata> {
        entry
            .map(|entry| {
                entry
                    .select(&ANCHOR)
                    .filter_map(|anchor| text::link(anchor, &self.base_url))
                    .map(|(title, url)| BookMetadata::new(remove_novel_tag(&title), url))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Content block following the `div.sCat` whose bold label is `label`.
fn entry<'a>(root: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let header = root
        .select(&CATEGORY_HEADER)
        .find(|bold| text::text_of(*bold) == label)?;
    let category = header.parent().and_then(ElementRef::wrap)?;
    category.next_siblings().find_map(ElementRef::wrap)
}

fn entry_texts(entry: Option<ElementRef<'_>>, css: &text::Css) -> Vec<String> {
    entry
        .map(|entry| entry.select(css).map(text::text_of).collect())
        .unwrap_or_default()
}

#[async_trait]
impl DatabaseSource for BakaUpdates {
    fn id(&self) -> &str {
        "baka_updates"
    }

    fn name(&self) -> &str {
        "Baka-Updates"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>> {
        let page = index + 1;
        let filters = [format!("search={}", urlencoding::encode(input))];
        self.fetch_results(page, self.series_url(page, &filters)).await
    }

    async fn search_advanced(
        &self,
        index: usize,
        genres_included: &[String],
        genres_excluded: &[String],
    ) -> Outcome<Vec<BookMetadata>> {
        let page = index + 1;
        let mut filters = Vec::new();
        if !genres_included.is_empty() {
            filters.push(format!("genre={}", genres_included.join("_")));
        }
        if !genres_excluded.is_empty() {
            filters.push(format!("exclude_genre={}", genres_excluded.join("_")));
        }
        self.fetch_results(page, self.series_url(page, &filters)).await
    }

    async fn search_genres(&self) -> Outcome<GenreMap> {
        let url = format!("{}series.html?act=genresearch", self.base_url);
        try_connect(&format!("url: {url}"), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            let html = doc.html();
            Ok::<_, ScrapeError>(
                html.select(&GENRE_OPTION)
                    .map(text::text_of)
                    .filter(|name| !name.is_empty())
                    .map(|name| {
                        let id = name.replace(' ', "+");
                        (name, id)
                    })
                    .collect(),
            )
        })
        .await
    }

    fn book_data(&self, doc: &Document) -> Result<BookData, ScrapeError> {
        let html = doc.html();
        let root = html.root_element();

        let title = remove_novel_tag(&text::text_of(TITLE.require(root, doc.url())?));
        let description = entry(root, "Description")
            .and_then(|entry| DESCRIPTION_MORE.first(entry).or_else(|| FIRST_DIV.first(entry)))
            .map(|block| text::paragraphs(block, &[&ANY_ANCHOR]))
            .unwrap_or_default();
        let authors = entry(root, "Author(s)")
            .map(|entry| {
                entry
                    .select(&ANY_ANCHOR)
                    .map(|anchor| BookAuthor {
                        name: text::text_of(anchor),
                        url: anchor
                            .value()
                            .attr("href")
                            .map(|href| text::absolute_url(&self.base_url, href)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(BookData {
            title,
            description,
            alternative_titles: entry(root, "Associated Names")
                .map(|entry| text::text_nodes(entry, &[]))
                .unwrap_or_default(),
            authors,
            tags: entry_texts(entry(root, "Categories"), &CATEGORY_TAG),
            genres: entry_texts(entry(root, "Genre"), &ANY_ANCHOR),
            book_type: entry(root, "Type").map(text::text_of).unwrap_or_default(),
            related_books: self.book_links(entry(root, "Category Recommendations")),
            similar_recommended: self.book_links(entry(root, "Recommendations")),
        })
    }
}

//! Novel Updates database adapter.
//!
//! Book page example: `https://www.novelupdates.com/series/mushoku-tensei/`.

use async_trait::async_trait;
use scraper::ElementRef;

use super::{normalize_base, page_context};
use crate::fetch::{Document, HttpFetcher};
use crate::library::{BookAuthor, BookData, BookMetadata};
use crate::outcome::{Outcome, ScrapeError, try_connect};
use crate::source::text::{self, selector};
use crate::source::{DatabaseSource, GenreMap};

const BASE_URL: &str = "https://www.novelupdates.com/";

selector!(GENRE_OPTION, ".genreme");
selector!(SEARCH_TITLE, ".search_title");
selector!(ANCHOR, "a[href]");
selector!(TITLE, ".seriestitlenu");
selector!(DESCRIPTION, "#editdescription");
selector!(ASSOCIATED, "#editassociated");
selector!(BOOK_TYPE, "#showtype");
selector!(GENRE_LINK, "#seriesgenre a");
selector!(TAG_LINK, "#showtags a");
selector!(AUTHOR_LINK, "#showauthors a");
selector!(SERIES_OTHER, "h5.seriesother");

/// Database adapter for novelupdates.com.
#[derive(Debug, Clone)]
pub struct NovelUpdates {
    fetcher: HttpFetcher,
    base_url: String,
}

impl NovelUpdates {
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

    fn search_url(&self, page: usize, input: &str) -> String {
        let page_path = if page > 1 {
            format!("page/{page}/")
        } else {
            String::new()
        };
        format!(
            "{}{page_path}?s={}&post_type=seriesplans",
            self.base_url,
            urlencoding::encode(input)
        )
    }

    fn advanced_url(&self, page: usize, included: &[String], excluded: &[String]) -> String {
        let mut url = format!("{}series-finder/?sf=1", self.base_url);
        if !included.is_empty() {
            url.push_str(&format!("&gi={}&mgi=and", included.join(",")));
        }
        if !excluded.is_empty() {
            url.push_str(&format!("&ge={}", excluded.join(",")));
        }
        url.push_str("&sort=sdate&order=desc");
        if page > 1 {
            url.push_str(&format!("&pg={page}"));
        }
        url
    }

    async fn fetch_results(&self, page: usize, url: String) -> Outcome<Vec<BookMetadata>> {
        try_connect(&page_context(page, &url), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            let html = doc.html();
            Ok::<_, ScrapeError>(
                html.select(&SEARCH_TITLE)
                    .filter_map(|title| ANCHOR.first(title))
                    .filter_map(|anchor| text::link(anchor, &self.base_url))
                    .map(|(title, url)| BookMetadata::new(title, url))
                    .collect(),
            )
        })
        .await
    }

    /// Links listed after the `h5.seriesother` heading named `heading`, up to the next `h5`.
    fn section_links(&self, root: ElementRef<'_>, heading: &str) -> Vec<BookMetadata> {
        let Some(header) = root
            .select(&SERIES_OTHER)
            .find(|header| text::text_of(*header) == heading)
        else {
            return Vec::new();
        };

        let mut books = Vec::new();
        for sibling in header.next_siblings() {
            let Some(element) = ElementRef::wrap(sibling) else {
                continue;
            };
            match element.value().name() {
                "h5" => break,
                "a" => {
                    if let Some((title, url)) = text::link(element, &self.base_url) {
                        books.push(BookMetadata::new(title, url));
                    }
                }
                _ => {}
            }
        }
        books
    }
}

fn texts(root: ElementRef<'_>, css: &text::Css) -> Vec<String> {
    root.select(css).map(text::text_of).collect()
}

#[async_trait]
impl DatabaseSource for NovelUpdates {
    fn id(&self) -> &str {
        "novel_updates"
    }

    fn name(&self) -> &str {
        "Novel Updates"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>> {
        let page = index + 1;
        self.fetch_results(page, self.search_url(page, input)).await
    }

    async fn search_advanced(
        &self,
        index: usize,
        genres_included: &[String],
        genres_excluded: &[String],
    ) -> Outcome<Vec<BookMetadata>> {
        let page = index + 1;
        let url = self.advanced_url(page, genres_included, genres_excluded);
        self.fetch_results(page, url).await
    }

    async fn search_genres(&self) -> Outcome<GenreMap> {
        let url = format!("{}series-finder/", self.base_url);
        try_connect(&format!("url: {url}"), || async {
            let doc = self.fetcher.fetch_document(&url).await?;
            let html = doc.html();
            Ok::<_, ScrapeError>(
                html.select(&GENRE_OPTION)
                    .filter_map(|option| {
                        let id = option.value().attr("genreid")?;
                        Some((text::text_of(option), id.to_string()))
                    })
                    .collect(),
            )
        })
        .await
    }

    fn book_data(&self, doc: &Document) -> Result<BookData, ScrapeError> {
        let html = doc.html();
        let root = html.root_element();

        let title = text::text_of(TITLE.require(root, doc.url())?);
        let description = DESCRIPTION
            .first(root)
            .map(|element| text::paragraphs(element, &[]))
            .unwrap_or_default();
        let alternative_titles = ASSOCIATED
            .first(root)
            .map(|element| text::text_nodes(element, &[]))
            .unwrap_or_default();
        let book_type = BOOK_TYPE.first(root).map(text::text_of).unwrap_or_default();
        let authors = root
            .select(&AUTHOR_LINK)
            .map(|anchor| BookAuthor {
                name: text::text_of(anchor),
                url: anchor
                    .value()
                    .attr("href")
                    .map(|href| text::absolute_url(&self.base_url, href)),
            })
            .collect();

        Ok(BookData {
            title,
            description,
            alternative_titles,
            authors,
            tags: texts(root, &TAG_LINK),
            genres: texts(root, &GENRE_LINK),
            book_type,
            related_books: self.section_links(root, "Related Series"),
            similar_recommended: self.section_links(root, "Recommendations"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    const BOOK_PAGE: &str = r#"
        <div class="seriestitlenu">Mushoku Tensei</div>
        <div id="editdescription"><p>A man is reborn.</p><p>He tries again.</p></div>
        <div id="editassociated">Jobless Reincarnation<br>無職転生</div>
        <div id="showtype"><a class="genre type">Light Novel</a></div>
        <div id="seriesgenre"><a class="genre" href="/genre/action/">Action</a><a class="genre" href="/genre/drama/">Drama</a></div>
        <div id="showtags"><a href="/tag/magic/">Magic</a></div>
        <div id="showauthors"><a href="/nauthor/rifujin/">Rifujin na Magonote</a></div>
        <div class="wpb_wrapper">
            <h5 class="seriesother">Related Series</h5>
            <a href="/series/side-story/">Side Story</a><span>(Spin-Off)</span><br>
            <h5 class="seriesother">Recommendations</h5>
            <a href="/series/re-zero/">Re:Zero</a><br>
            <a href="/series/konosuba/">Konosuba</a><br>
            <h5 class="seriesother">Recommendation Lists</h5>
            <a href="/list/1/">List</a>
        </div>
    "#;

    fn adapter(base: &str) -> NovelUpdates {
        NovelUpdates::with_base_url(HttpFetcher::new().unwrap(), base)
    }

    #[test]
    fn test_book_data_extracts_all_sections() {
        let nu = adapter("https://www.novelupdates.com/");
        let doc = Document::new("https://www.novelupdates.com/series/mushoku-tensei/", BOOK_PAGE);
        let data = nu.book_data(&doc).unwrap();

        assert_eq!(data.title, "Mushoku Tensei");
        assert_eq!(data.description, "A man is reborn.\n\nHe tries again.");
        assert_eq!(data.alternative_titles, ["Jobless Reincarnation", "無職転生"]);
        assert_eq!(data.book_type, "Light Novel");
        assert_eq!(data.genres, ["Action", "Drama"]);
        assert_eq!(data.tags, ["Magic"]);
        assert_eq!(data.authors[0].name, "Rifujin na Magonote");
        assert_eq!(
            data.authors[0].url.as_deref(),
            Some("https://www.novelupdates.com/nauthor/rifujin/")
        );
        assert_eq!(data.related_books.len(), 1);
        assert_eq!(data.related_books[0].title, "Side Story");
        let recommended: Vec<_> = data.similar_recommended.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(recommended, ["Re:Zero", "Konosuba"]);
    }

    #[test]
    fn test_book_data_without_title_errors() {
        let nu = adapter("https://www.novelupdates.com/");
        let doc = Document::new("https://www.novelupdates.com/series/x/", "<p>Cloudflare</p>");
        assert!(matches!(
            nu.book_data(&doc),
            Err(ScrapeError::MissingElement { .. })
        ));
    }

    #[test]
    fn test_search_url_pages() {
        let nu = adapter("https://nu.example");
        assert_eq!(
            nu.search_url(1, "tensei slime"),
            "https://nu.example/?s=tensei%20slime&post_type=seriesplans"
        );
        assert_eq!(
            nu.search_url(3, "x"),
            "https://nu.example/page/3/?s=x&post_type=seriesplans"
        );
    }

    #[test]
    fn test_advanced_url_includes_only_given_filters() {
        let nu = adapter("https://nu.example");
        assert_eq!(
            nu.advanced_url(1, &[], &[]),
            "https://nu.example/series-finder/?sf=1&sort=sdate&order=desc"
        );
        assert_eq!(
            nu.advanced_url(2, &["8".to_string(), "280".to_string()], &["3".to_string()]),
            "https://nu.example/series-finder/?sf=1&gi=8,280&mgi=and&ge=3&sort=sdate&order=desc&pg=2"
        );
    }

    #[tokio::test]
    async fn test_search_genres_maps_name_to_id() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/series-finder/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<span class="genreme" genreid="8"> Action </span><span class="genreme" genreid="280">Adult</span>"#,
            ))
            .mount(&mock_server)
            .await;

        let genres = adapter(&mock_server.uri()).search_genres().await.unwrap();
        assert_eq!(genres.get("Action").map(String::as_str), Some("8"));
        assert_eq!(genres.len(), 2);
    }

    #[tokio::test]
    async fn test_search_reads_result_titles() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("s", "slime"))
            .and(query_param("post_type", "seriesplans"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="search_title"><a href="https://www.novelupdates.com/series/slime/">Slime</a></div>"#,
            ))
            .mount(&mock_server)
            .await;

        let books = adapter(&mock_server.uri()).search(0, "slime").await.unwrap();
        assert_eq!(
            books,
            [BookMetadata::new("Slime", "https://www.novelupdates.com/series/slime/")]
        );
    }
}

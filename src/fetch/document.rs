//! Retrieved page plus the URL it was finally served from.

use scraper::Html;

/// A fetched page.
///
/// The raw body is kept rather than the parsed tree: [`scraper::Html`] is not
/// `Send`, so adapters parse on demand with [`Document::html`] and drop the tree
/// before their next await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    url: String,
    body: String,
}

impl Document {
    /// Creates a document from its final URL and body text.
    #[must_use]
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// URL the document was served from, after redirects.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body into an HTML tree.
    #[must_use]
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

//! HTTP client wrapper for retrieving source documents.
//!
//! This module provides [`HttpFetcher`], which applies the fixed request
//! headers, follows redirects, bounds every request with a timeout and maps
//! transport failures into [`FetchError`].

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT, MAX_REDIRECTS};
use super::{Document, FetchError};
use crate::user_agent::{self, BROWSER_USER_AGENT, XML_HTTP_REQUEST};

/// HTTP client for fetching documents from source sites.
///
/// This client is designed to be created once and shared by every adapter,
/// taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use bookshelf_core::fetch::HttpFetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new()?;
/// let doc = fetcher.fetch_document("https://example.com/novel").await?;
/// println!("Served from: {}", doc.url());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    request_timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with default timeouts (30s connect, 120s per request).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Creates a fetcher with explicit connect and per-request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Returns the per-request timeout used by [`fetch_document`](Self::fetch_document).
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fetches a document with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the URL is invalid, the request fails or times
    /// out, or the server responds with a non-success status.
    pub async fn fetch_document(&self, url: &str) -> Result<Document, FetchError> {
        self.fetch_document_with_timeout(url, self.request_timeout)
            .await
    }

    /// Fetches a document with an explicit timeout.
    ///
    /// Redirects are followed; the returned [`Document::url`] is the final URL.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_document`](Self::fetch_document).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_document_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Document, FetchError> {
        let parsed = parse_url(url)?;
        let request = with_document_headers(self.client.get(parsed)).timeout(timeout);
        self.execute(url, request).await
    }

    /// Issues an AJAX-style GET (`x-requested-with`) with extra query pairs.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_document`](Self::fetch_document).
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn fetch_xhr(&self, url: &str, query: &[(&str, &str)]) -> Result<Document, FetchError> {
        let mut parsed = parse_url(url)?;
        if !query.is_empty() {
            parsed.query_pairs_mut().extend_pairs(query);
        }
        let request = with_document_headers(self.client.get(parsed))
            .header("x-requested-with", XML_HTTP_REQUEST)
            .timeout(self.request_timeout);
        self.execute(url, request).await
    }

    /// Issues an AJAX-style form POST.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_document`](Self::fetch_document).
    #[instrument(skip(self, form), fields(url = %url))]
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Document, FetchError> {
        let parsed = parse_url(url)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let request = with_document_headers(self.client.post(parsed))
            .header("x-requested-with", XML_HTTP_REQUEST)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .timeout(self.request_timeout);
        self.execute(url, request).await
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> Result<Document, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "non-success status");
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(final_url = %final_url, bytes = body.len(), "document fetched");
        Ok(Document::new(final_url, body))
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|_| FetchError::invalid_url(url))
}

fn with_document_headers(mut request: RequestBuilder) -> RequestBuilder {
    for (name, value) in user_agent::document_headers() {
        request = request.header(name, value);
    }
    request
}

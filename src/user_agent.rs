//! Fixed identifying headers sent with every gateway request.
//!
//! Many serial-fiction sites serve stripped or empty pages to unknown agents,
//! so the gateway presents itself as a desktop browser arriving from a search
//! engine. Keeping the values here means adapters never set headers ad hoc.

/// Browser User-Agent presented to source sites.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; U; Linux i586; en-US; rv:1.7.3) Gecko/20040924 Epiphany/1.4.4 (Ubuntu)";

/// Referer sent with document requests.
pub const REFERER: &str = "http://www.google.com";

/// Content-Language sent with document requests.
pub const CONTENT_LANGUAGE: &str = "en-US";

/// Accept header for document requests.
pub const ACCEPT_HTML: &str = "text/html";

/// Header value marking AJAX-style requests (`x-requested-with`).
pub const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Returns the full set of fixed headers as `(name, value)` pairs.
#[must_use]
pub(crate) fn document_headers() -> [(&'static str, &'static str); 3] {
    [
        ("referer", REFERER),
        ("content-language", CONTENT_LANGUAGE),
        ("accept", ACCEPT_HTML),
    ]
}

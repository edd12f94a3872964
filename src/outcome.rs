//! Result envelope and the connect boundary.
//!
//! Adapter operations that touch the network return [`Outcome<T>`], a plain
//! `Result` whose error side is always a [`SourceError`]: exactly one of a
//! success value or a renderable failure message. Faults raised while doing
//! the work ([`ScrapeError`], panics) are folded into that envelope by
//! [`try_connect`] and never propagate past it.
//!
//! # Example
//!
//! ```no_run
//! use bookshelf_core::fetch::HttpFetcher;
//! use bookshelf_core::outcome::{Outcome, ScrapeError, try_connect};
//!
//! # async fn example(fetcher: HttpFetcher) {
//! let url = "https://example.com/novel-list";
//! let title: Outcome<String> = try_connect(&format!("url: {url}"), || async {
//!     let doc = fetcher.fetch_document(url).await?;
//!     Ok::<_, ScrapeError>(doc.body().len().to_string())
//! })
//! .await;
//! # }
//! ```

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fetch::FetchError;
use crate::library::StoreError;

/// Envelope returned by every network-touching adapter operation.
pub type Outcome<T> = Result<T, SourceError>;

/// Coarse classification of a [`SourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// A bounded-time network operation exceeded its deadline.
    Timeout,
    /// No adapter matches the URL, including after redirect resolution.
    UnsupportedSource,
    /// Any other failure.
    Unknown,
}

/// Failure side of the result envelope.
///
/// Values are plain data (cloneable, comparable) so they can be stored in
/// observable state and shown to users as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The operation ran out of time.
    Timeout {
        /// Diagnostic context supplied at the boundary (may be empty).
        context: String,
        /// Underlying message.
        message: String,
    },

    /// No registered adapter can handle the URL.
    UnsupportedSource {
        /// URL the caller asked for.
        url: String,
        /// URL reached after redirects, when it differs from `url`.
        redirect_url: Option<String>,
    },

    /// Anything else.
    Unknown {
        /// Diagnostic context supplied at the boundary (may be empty).
        context: String,
        /// Underlying message.
        message: String,
        /// Captured diagnostic trace for later inspection.
        trace: String,
    },
}

impl SourceError {
    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates an `UnsupportedSource` error for a URL no adapter claims.
    #[must_use]
    pub fn unsupported(url: impl Into<String>) -> Self {
        Self::UnsupportedSource {
            url: url.into(),
            redirect_url: None,
        }
    }

    /// Creates an `UnsupportedSource` error for a URL that redirected somewhere unsupported.
    #[must_use]
    pub fn unsupported_after_redirect(url: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self::UnsupportedSource {
            url: url.into(),
            redirect_url: Some(redirect_url.into()),
        }
    }

    /// Creates an `Unknown` error.
    #[must_use]
    pub fn unknown(
        context: impl Into<String>,
        message: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        Self::Unknown {
            context: context.into(),
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            Self::Timeout { .. } => SourceErrorKind::Timeout,
            Self::UnsupportedSource { .. } => SourceErrorKind::UnsupportedSource,
            Self::Unknown { .. } => SourceErrorKind::Unknown,
        }
    }

    /// Returns the boundary context string, if the variant carries one.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Timeout { context, .. } | Self::Unknown { context, .. } => Some(context),
            Self::UnsupportedSource { .. } => None,
        }
    }

    /// Returns the user-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { context, message } => {
                write!(f, "Timeout error.\n\n")?;
                write_info(f, context)?;
                write!(f, "Message:\n{message}")
            }
            Self::UnsupportedSource { url, redirect_url } => {
                write!(f, "Unable to load from url:\n{url}\n\n")?;
                if let Some(redirect_url) = redirect_url {
                    write!(f, "Redirect url:\n{redirect_url}\n\n")?;
                }
                write!(f, "Source not supported")
            }
            Self::Unknown {
                context,
                message,
                trace,
            } => {
                write!(f, "Unknown error.\n\n")?;
                write_info(f, context)?;
                write!(f, "Message:\n{message}\n\nStacktrace:\n{trace}")
            }
        }
    }
}

fn write_info(f: &mut fmt::Formatter<'_>, context: &str) -> fmt::Result {
    if context.is_empty() {
        Ok(())
    } else {
        write!(f, "Info:\n{context}\n\n")
    }
}

/// Faults raised inside a connect boundary.
///
/// Adapters and services return these from the closures they hand to
/// [`try_connect`]; nothing outside the boundary sees them.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Retrieval failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A required element was missing from the page.
    #[error("no element matches '{selector}' in {url}")]
    MissingElement {
        /// CSS selector that matched nothing.
        selector: String,
        /// Page URL.
        url: String,
    },

    /// A value was present but could not be interpreted.
    #[error("unexpected {field} value '{value}'")]
    Malformed {
        /// Which value.
        field: &'static str,
        /// What was found.
        value: String,
    },

    /// No adapter matches the URL.
    #[error("no adapter supports {url}")]
    Unsupported {
        /// URL the caller asked for.
        url: String,
        /// URL reached after redirects, if any.
        redirect_url: Option<String>,
    },

    /// Storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A nested operation already produced an envelope error; it passes through unchanged.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ScrapeError {
    /// Creates a `MissingElement` error.
    pub fn missing(selector: impl Into<String>, url: impl Into<String>) -> Self {
        Self::MissingElement {
            selector: selector.into(),
            url: url.into(),
        }
    }

    /// Creates a `Malformed` error.
    pub fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            value: value.into(),
        }
    }
}

/// Runs `op` and converts every failure into a [`SourceError`].
///
/// - Deadline expiry becomes [`SourceError::Timeout`] carrying `context`.
/// - [`ScrapeError::Unsupported`] becomes [`SourceError::UnsupportedSource`].
/// - Nested envelope errors pass through unchanged.
/// - Everything else, panics included, becomes [`SourceError::Unknown`] with
///   `context`, the message, and a captured diagnostic trace.
pub async fn try_connect<T, F, Fut>(context: &str, op: F) -> Outcome<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    match AssertUnwindSafe(op()).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            let error = classify(context, error);
            debug!(kind = ?error.kind(), context, "operation failed at connect boundary");
            Err(error)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(context, %message, "operation panicked at connect boundary");
            Err(SourceError::unknown(
                context,
                message,
                Backtrace::force_capture().to_string(),
            ))
        }
    }
}

fn classify(context: &str, error: ScrapeError) -> SourceError {
    match error {
        ScrapeError::Fetch(FetchError::Timeout { url }) => {
            SourceError::timeout(context, format!("timeout fetching {url}"))
        }
        ScrapeError::Unsupported { url, redirect_url } => SourceError::UnsupportedSource {
            url,
            redirect_url,
        },
        ScrapeError::Source(inner) => inner,
        other => {
            let trace = diagnostic_trace(&other);
            SourceError::unknown(context, other.to_string(), trace)
        }
    }
}

/// Renders the error's source chain followed by a captured backtrace.
fn diagnostic_trace(error: &(dyn StdError + 'static)) -> String {
    let mut trace = String::new();
    let mut current = error.source();
    while let Some(cause) = current {
        trace.push_str("caused by: ");
        trace.push_str(&cause.to_string());
        trace.push('\n');
        current = cause.source();
    }
    trace.push_str(&Backtrace::force_capture().to_string());
    trace
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}

//! Fetch/parse gateway.
//!
//! Every network retrieval in the crate goes through [`HttpFetcher`], which
//! returns a [`Document`] (final URL + body) or a [`FetchError`]. Raw
//! transport faults stop here; adapters wrap their calls in
//! [`crate::outcome::try_connect`] so callers only ever see envelopes.
//!
//! # Features
//!
//! - Bounded request timeout (120s by default)
//! - Fixed identifying headers (browser UA, referer, content language)
//! - Redirect following with the final URL reported on the document
//! - AJAX-style GET/POST helpers for adapters needing secondary requests

mod client;
pub mod constants;
mod document;
mod error;

pub use client::HttpFetcher;
pub use constants::DEFAULT_REQUEST_TIMEOUT;
pub use document::Document;
pub use error::FetchError;

//! Constants for the fetch gateway (timeouts, redirects).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (2 minutes); slow sites routinely take most of it.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default whole-request timeout as a [`Duration`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(REQUEST_TIMEOUT_SECS);

/// Maximum redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

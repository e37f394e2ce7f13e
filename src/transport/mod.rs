//! Bounded, cancellable REST transport
//!
//! Issues one HTTP request per logical call with a fixed wall-clock deadline,
//! aborts in-flight requests on timeout or cancellation, and chases redirect
//! chains for the headless (no-browser) authentication variant. Redirect
//! following in the underlying client is disabled; every hop is observed and
//! bounded here.
//!
//! Any received HTTP response, 2xx or not, is returned as a
//! [`RestResponse`]; a [`TransportError`] is raised only when no response was
//! obtained.

mod auth;
mod client;
mod response;

pub use auth::{Base64Encoder, CredentialsEncoder, RestAuthentication};
pub use client::{RequestOptions, RestClient, RestClientConfig};
pub use response::RestResponse;

use http::Method;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport failure kinds. Method and URI are retained for diagnostics.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The deadline elapsed before a response arrived; the in-flight request
    /// was aborted.
    #[error("{method} {uri} timed out after {timeout:?}")]
    Timeout {
        /// HTTP method of the aborted request
        method: Method,
        /// Target URI of the aborted request
        uri: Url,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The caller's cancellation token fired; the in-flight request was
    /// aborted.
    #[error("{method} {uri} was cancelled")]
    Cancelled {
        /// HTTP method of the aborted request
        method: Method,
        /// Target URI of the aborted request
        uri: Url,
    },

    /// The request failed at the I/O layer (connect, TLS, read).
    #[error("{method} {uri} failed: {source}")]
    Http {
        /// HTTP method of the failed request
        method: Method,
        /// Target URI of the failed request
        uri: Url,
        /// Underlying transport fault
        #[source]
        source: reqwest::Error,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// A redirect `Location` header was not a valid URI.
    #[error("redirect target `{location}` is not a valid URI: {source}")]
    InvalidLocation {
        /// The raw `Location` header value
        location: String,
        /// Underlying parse failure
        #[source]
        source: url::ParseError,
    },

    /// A redirect chain exceeded the configured hop bound.
    #[error("redirect chain from {start} exceeded {max} hops")]
    TooManyRedirects {
        /// URI the chain started from
        start: Url,
        /// The configured bound
        max: usize,
    },

    /// A redirect chain terminated without reaching the expected target.
    #[error("redirect chain from {start} never reached expected target {expected}")]
    TargetNotReached {
        /// URI the chain started from
        start: Url,
        /// The target prefix that was never matched
        expected: Url,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

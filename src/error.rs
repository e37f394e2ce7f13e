//! Engine-wide error taxonomy
//!
//! Each subsystem raises its own typed error (`CacheError`, `TransportError`,
//! `TokenValidationError`); this module aggregates them into the single
//! [`Error`] type the flow orchestrator maps to terminal `Error` statuses.
//! Every variant carries a stable machine-readable code via [`Error::code`].

use thiserror::Error;

use crate::cache::CacheError;
use crate::token::TokenValidationError;
use crate::transport::TransportError;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum Error {
    /// Precondition violation: a required argument was missing or malformed.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument or field
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// A cache read/write failed (I/O or serialization fault, key or expiry
    /// misuse).
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A transport-level request obtained no usable response (timeout, abort,
    /// cancellation, I/O error). Method and URI are retained for diagnostics.
    #[error(transparent)]
    RequestFailed(#[from] TransportError),

    /// A received response could not be parsed into the expected shape.
    #[error("response could not be parsed as `{target_type}`: {source}")]
    InvalidResponse {
        /// Name of the type the response was expected to deserialize into
        target_type: &'static str,
        /// The raw response content, retained for diagnostics
        content: String,
        /// Underlying parse failure
        #[source]
        source: serde_json::Error,
    },

    /// An ID token failed one or more validation checks.
    #[error("token validation failed: {}", format_failures(.failures))]
    InvalidToken {
        /// Every check that failed, individually enumerable by the caller
        failures: Vec<TokenValidationError>,
    },

    /// Protocol-level scope misuse.
    #[error("invalid scope: {0}")]
    InvalidScope(String),
}

fn format_failures(failures: &[TokenValidationError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Convenience constructor for [`Error::InvalidArgument`].
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this failure kind.
    ///
    /// Callers building UI surface this code plus [`Error`]'s `Display`
    /// message; the underlying cause stays reachable through
    /// [`std::error::Error::source`].
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Cache(CacheError::InvalidKey) => "invalid_argument",
            Self::Cache(CacheError::ExpiryLimit { .. }) => "cache_expiry_limit",
            Self::Cache(CacheError::Access { .. }) => "cache_access",
            Self::RequestFailed(TransportError::Timeout { .. }) => "request_timeout",
            Self::RequestFailed(_) => "request_failed",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InvalidScope(_) => "invalid_scope",
        }
    }
}

impl From<Vec<TokenValidationError>> for Error {
    fn from(failures: Vec<TokenValidationError>) -> Self {
        Self::InvalidToken { failures }
    }
}

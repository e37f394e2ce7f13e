//! ID-token decoding, JWK matching, and claim validation
//!
//! The token endpoint returns a [`TokenResponse`]; when it carries an ID
//! token, the engine matches a signature key from the operator's published
//! JWKS and validates the decoded claims against values captured at
//! authorization start (nonce, audience, issuer, timestamps). Every check is
//! independently toggleable and every failed check is reported as a distinct
//! [`TokenValidationError`].

mod claims;
mod jwks;
mod validator;

pub use claims::{decode_id_token_claims, IdTokenClaims};
pub use jwks::{JwKey, JwKeySet};
pub use validator::{ClaimsValidator, ExpectedClaims, ValidationConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// One failed validation check.
///
/// Validation returns every failure, not a merged boolean, so callers can
/// enumerate exactly what was wrong with a token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenValidationError {
    /// The token is not a compact JWS (three dot-separated segments).
    #[error("token is not a compact JWS")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64url: {0}")]
    PayloadEncoding(String),

    /// The payload did not parse as a claim set.
    #[error("token claims could not be parsed: {0}")]
    ClaimsParse(String),

    /// The token header names an algorithm outside the allowlist.
    #[error("token algorithm `{0}` is not allowed")]
    AlgorithmNotAllowed(String),

    /// No key in the key set matches the token header.
    #[error("no signing key in the key set matches the token header")]
    NoMatchingKey,

    /// Signature verification failed against the matched key.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// The `iss` claim does not equal the expected issuer.
    #[error("issuer mismatch: expected `{expected}`, got `{actual}`")]
    IssuerMismatch {
        /// Issuer the caller expected
        expected: String,
        /// Issuer the token carried
        actual: String,
    },

    /// The audience list does not contain the expected client id.
    #[error("audience does not contain expected client id `{expected}`")]
    AudienceMismatch {
        /// Client id expected in the audience list
        expected: String,
    },

    /// The token expired (`exp` elapsed).
    #[error("token expired at {exp} (now {now})")]
    Expired {
        /// `exp` claim, epoch seconds
        exp: i64,
        /// Validation wall clock, epoch seconds
        now: i64,
    },

    /// The token was issued in the future beyond the clock-skew tolerance.
    #[error("token issued in the future: iat {iat} (now {now})")]
    IssuedInFuture {
        /// `iat` claim, epoch seconds
        iat: i64,
        /// Validation wall clock, epoch seconds
        now: i64,
    },

    /// The token is older than the configured maximum age.
    #[error("token issued at {iat} exceeds maximum age of {max_age_secs}s")]
    TooOld {
        /// `iat` claim, epoch seconds
        iat: i64,
        /// Configured maximum token age, seconds
        max_age_secs: u64,
    },

    /// The `nonce` claim does not equal the nonce generated at
    /// authorization start.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// A claim required by an enabled check is absent.
    #[error("missing required claim `{0}`")]
    MissingClaim(&'static str),
}

/// Response of the operator's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Issued access token.
    pub access_token: String,

    /// Token type (typically `Bearer`).
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime of the access token, seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token, if the operator issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Compact-serialized ID token asserting the subject's identity.
    #[serde(default)]
    pub id_token: Option<String>,

    /// Granted scope, space-separated.
    #[serde(default)]
    pub scope: Option<String>,

    /// Operator-specific extension fields.
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

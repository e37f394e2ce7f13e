//! Decoded ID-token claim set

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::TokenValidationError;

/// The decoded claim set of a received ID token.
///
/// Built once per token and read-only thereafter. The audience is normalized
/// to a list at deserialization time: a scalar `"aud": "x"` and a list
/// `"aud": ["x"]` produce the same internal representation, so validation
/// logic is uniform over both wire shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Issuer identifier.
    #[serde(default)]
    pub iss: Option<String>,

    /// Subject (the authenticated principal).
    #[serde(default)]
    pub sub: Option<String>,

    /// Audience list. Scalar values are normalized to a one-element list.
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,

    /// Expiry, epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issued-at, epoch seconds.
    #[serde(default)]
    pub iat: Option<i64>,

    /// Per-flow replay-protection value bound at authorization start.
    #[serde(default)]
    pub nonce: Option<String>,

    /// Authorized party.
    #[serde(default)]
    pub azp: Option<String>,

    /// Authentication context class reference.
    #[serde(default)]
    pub acr: Option<String>,

    /// Authentication method references.
    #[serde(default)]
    pub amr: Option<Vec<String>>,

    /// Operator-specific custom claims.
    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}

/// Accept either a scalar or a list audience, normalizing to a list.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        Single(String),
        Many(Vec<String>),
    }

    match Option::<Audience>::deserialize(deserializer)? {
        Some(Audience::Single(value)) => Ok(vec![value]),
        Some(Audience::Many(values)) => Ok(values),
        None => Ok(Vec::new()),
    }
}

/// Decode the claim set of a compact-serialized ID token without verifying
/// its signature.
///
/// Signature verification is a separate, toggleable step (see
/// [`ClaimsValidator`](super::ClaimsValidator)); this function only splits
/// the compact form and parses the payload segment.
///
/// # Errors
///
/// [`TokenValidationError::Malformed`] for anything but three dot-separated
/// segments, [`TokenValidationError::PayloadEncoding`] /
/// [`TokenValidationError::ClaimsParse`] for undecodable payloads.
pub fn decode_id_token_claims(token: &str) -> Result<IdTokenClaims, TokenValidationError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenValidationError::Malformed);
    };

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenValidationError::PayloadEncoding(e.to_string()))?;

    serde_json::from_slice(&payload).map_err(|e| TokenValidationError::ClaimsParse(e.to_string()))
}

//! ID-token validation against expected claim values

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::{debug, warn};

use super::claims::{decode_id_token_claims, IdTokenClaims};
use super::jwks::JwKeySet;
use super::TokenValidationError;

/// Toggles for the individual validation checks.
///
/// Every check can be switched off by the caller; defaults enable all of
/// them with a 60-second clock-skew tolerance.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Check `iss` equality against the expected issuer.
    pub validate_issuer: bool,
    /// Check the audience list contains the expected client id.
    pub validate_audience: bool,
    /// Check `exp` has not elapsed.
    pub validate_expiry: bool,
    /// Check `iat` is not in the future beyond the skew tolerance.
    pub validate_issued_at: bool,
    /// Check `nonce` equality against the authorization-start nonce.
    pub validate_nonce: bool,
    /// Verify the JWS signature against a matched JWKS key.
    pub verify_signature: bool,
    /// Clock-skew tolerance applied to time-based checks.
    pub clock_skew: Duration,
    /// Reject tokens issued longer ago than this, when set.
    pub max_token_age: Option<Duration>,
    /// Signature algorithms accepted in token headers.
    pub allowed_algorithms: Vec<Algorithm>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_issuer: true,
            validate_audience: true,
            validate_expiry: true,
            validate_issued_at: true,
            validate_nonce: true,
            verify_signature: true,
            clock_skew: Duration::from_secs(60),
            max_token_age: None,
            allowed_algorithms: vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::ES256,
            ],
        }
    }
}

/// Claim values the token is checked against.
///
/// Absent values skip their check even when the corresponding toggle is on.
#[derive(Debug, Clone, Default)]
pub struct ExpectedClaims {
    /// Expected `iss` value.
    pub issuer: Option<String>,
    /// Client id expected in the audience list.
    pub audience: Option<String>,
    /// Nonce generated at authorization start.
    pub nonce: Option<String>,
}

/// Validates ID tokens: signature-key matching plus claim checks.
#[derive(Debug, Clone, Default)]
pub struct ClaimsValidator {
    config: ValidationConfig,
}

impl ClaimsValidator {
    /// Validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with custom check toggles.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a compact-serialized ID token end to end.
    ///
    /// Decodes the header and claims, matches a signing key from `keyset`,
    /// verifies the signature (when enabled), and runs the configured claim
    /// checks against `expected`.
    ///
    /// # Errors
    ///
    /// Every failed check, as a list, never a single merged failure.
    pub fn validate_id_token(
        &self,
        token: &str,
        keyset: &JwKeySet,
        expected: &ExpectedClaims,
    ) -> Result<IdTokenClaims, Vec<TokenValidationError>> {
        let mut failures = Vec::new();

        let header = match jsonwebtoken::decode_header(token) {
            Ok(header) => header,
            Err(e) => {
                debug!(error = %e, "Failed to decode token header");
                return Err(vec![TokenValidationError::Malformed]);
            }
        };

        if !self.config.allowed_algorithms.contains(&header.alg) {
            return Err(vec![TokenValidationError::AlgorithmNotAllowed(format!(
                "{:?}",
                header.alg
            ))]);
        }

        let claims = match decode_id_token_claims(token) {
            Ok(claims) => claims,
            Err(e) => return Err(vec![e]),
        };

        if self.config.verify_signature {
            match keyset.signing_key_for(&header) {
                Some(key) => {
                    if let Err(e) = verify_signature(token, key, header.alg) {
                        failures.push(e);
                    }
                }
                None => failures.push(TokenValidationError::NoMatchingKey),
            }
        }

        if let Err(mut claim_failures) = self.validate_claims(&claims, expected) {
            failures.append(&mut claim_failures);
        }

        if failures.is_empty() {
            debug!(subject = ?claims.sub, "ID token validated");
            Ok(claims)
        } else {
            warn!(count = failures.len(), "ID token validation failed");
            Err(failures)
        }
    }

    /// Run the configured claim checks against an already-decoded claim set.
    ///
    /// # Errors
    ///
    /// Every failed check, as a list.
    pub fn validate_claims(
        &self,
        claims: &IdTokenClaims,
        expected: &ExpectedClaims,
    ) -> Result<(), Vec<TokenValidationError>> {
        let mut failures = Vec::new();
        let now = Utc::now().timestamp();
        let skew = self.config.clock_skew.as_secs() as i64;

        if self.config.validate_issuer {
            if let Some(expected_issuer) = expected.issuer.as_deref() {
                match claims.iss.as_deref() {
                    None => failures.push(TokenValidationError::MissingClaim("iss")),
                    Some(actual) if actual != expected_issuer => {
                        failures.push(TokenValidationError::IssuerMismatch {
                            expected: expected_issuer.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        if self.config.validate_audience {
            if let Some(client_id) = expected.audience.as_deref() {
                if claims.aud.is_empty() {
                    failures.push(TokenValidationError::MissingClaim("aud"));
                } else if !claims.aud.iter().any(|aud| aud == client_id) {
                    failures.push(TokenValidationError::AudienceMismatch {
                        expected: client_id.to_string(),
                    });
                }
            }
        }

        if self.config.validate_expiry {
            match claims.exp {
                None => failures.push(TokenValidationError::MissingClaim("exp")),
                Some(exp) if now - skew >= exp => {
                    failures.push(TokenValidationError::Expired { exp, now });
                }
                Some(_) => {}
            }
        }

        if self.config.validate_issued_at {
            match claims.iat {
                None => failures.push(TokenValidationError::MissingClaim("iat")),
                Some(iat) => {
                    if iat > now + skew {
                        failures.push(TokenValidationError::IssuedInFuture { iat, now });
                    }
                    if let Some(max_age) = self.config.max_token_age {
                        let max_age_secs = max_age.as_secs();
                        if now.saturating_sub(iat) > max_age_secs as i64 {
                            failures.push(TokenValidationError::TooOld { iat, max_age_secs });
                        }
                    }
                }
            }
        }

        if self.config.validate_nonce {
            if let Some(expected_nonce) = expected.nonce.as_deref() {
                match claims.nonce.as_deref() {
                    None => failures.push(TokenValidationError::MissingClaim("nonce")),
                    Some(actual) if actual != expected_nonce => {
                        failures.push(TokenValidationError::NonceMismatch);
                    }
                    Some(_) => {}
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

/// Verify the compact JWS against one matched key.
fn verify_signature(
    token: &str,
    key: &super::JwKey,
    algorithm: Algorithm,
) -> Result<(), TokenValidationError> {
    let jwk: jsonwebtoken::jwk::Jwk = serde_json::to_value(key)
        .and_then(serde_json::from_value)
        .map_err(|e| TokenValidationError::Signature(format!("unusable JWK: {e}")))?;

    let decoding_key = DecodingKey::from_jwk(&jwk)
        .map_err(|e| TokenValidationError::Signature(format!("unusable JWK: {e}")))?;

    // Claim checks are enumerated separately; here only the signature is
    // verified.
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<serde_json::Value>(token, &decoding_key, &validation)
        .map(|_| ())
        .map_err(|e| TokenValidationError::Signature(e.to_string()))
}

//! JSON Web Key set with predicate-based matching

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cache::Cacheable;

/// One JSON Web Key as published in an operator's JWKS document.
///
/// Immutable once deserialized; unknown members are preserved in
/// `additional_fields` so signature backends see the full key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwKey {
    /// Key type (`RSA`, `EC`, `oct`).
    pub kty: String,

    /// Intended use (`sig` or `enc`).
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Algorithm the key is intended for (`RS256`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key identifier matched against the token header's `kid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// RSA modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Symmetric key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Remaining JWK members (EC coordinates, certificates, ...).
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl JwKey {
    /// True for RSA keys.
    pub fn is_rsa(&self) -> bool {
        self.kty.eq_ignore_ascii_case("RSA")
    }

    /// True for keys usable for signatures.
    ///
    /// A key with no `use` member is treated as signature-capable, per the
    /// JWK specification's optional `use`.
    pub fn is_signing_key(&self) -> bool {
        matches!(self.key_use.as_deref(), None | Some("sig"))
    }
}

/// An ordered collection of JSON Web Keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JwKeySet {
    /// Keys in document order.
    pub keys: Vec<JwKey>,
}

impl JwKeySet {
    /// Lazily iterate the keys satisfying `predicate`.
    ///
    /// The iterator is finite and restartable (call again for a fresh pass).
    /// A `None` predicate is the identity filter and yields all keys.
    /// Multiple matches are a caller policy decision, not an error.
    pub fn matching<'a>(
        &'a self,
        predicate: Option<&'a dyn Fn(&JwKey) -> bool>,
    ) -> impl Iterator<Item = &'a JwKey> + 'a {
        self.keys
            .iter()
            .filter(move |key| predicate.is_none_or(|p| p(key)))
    }

    /// First key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&JwKey> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }

    /// Pick the signing key for a decoded token header.
    ///
    /// A `kid` in the header selects by exact id; otherwise the first
    /// signature-capable key whose `alg` is absent or equal to the header's
    /// algorithm wins.
    pub fn signing_key_for(&self, header: &jsonwebtoken::Header) -> Option<&JwKey> {
        if let Some(kid) = header.kid.as_deref() {
            return self.find(kid).filter(|key| key.is_signing_key());
        }

        let alg = format!("{:?}", header.alg);
        self.keys
            .iter()
            .find(|key| key.is_signing_key() && key.alg.as_deref().is_none_or(|a| a == alg))
    }
}

impl Cacheable for JwKeySet {
    const TYPE_TAG: &'static str = "jwks";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_key(kid: &str) -> JwKey {
        serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": "modulus",
            "e": "AQAB"
        }))
        .unwrap()
    }

    fn symmetric_key() -> JwKey {
        serde_json::from_value(serde_json::json!({
            "kty": "oct",
            "k": "c2VjcmV0"
        }))
        .unwrap()
    }

    #[test]
    fn test_rsa_predicate_yields_only_rsa_keys() {
        let keyset = JwKeySet {
            keys: vec![rsa_key("rsa-1"), symmetric_key()],
        };

        let matches: Vec<_> = keyset.matching(Some(&JwKey::is_rsa)).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kid.as_deref(), Some("rsa-1"));
    }

    #[test]
    fn test_null_predicate_yields_all_keys() {
        let keyset = JwKeySet {
            keys: vec![rsa_key("rsa-1"), symmetric_key()],
        };

        assert_eq!(keyset.matching(None).count(), 2);
    }

    #[test]
    fn test_matching_is_restartable() {
        let keyset = JwKeySet {
            keys: vec![rsa_key("rsa-1"), symmetric_key()],
        };

        assert_eq!(keyset.matching(None).count(), 2);
        assert_eq!(keyset.matching(None).count(), 2);
    }

    #[test]
    fn test_signing_key_selection_by_kid() {
        let keyset = JwKeySet {
            keys: vec![rsa_key("a"), rsa_key("b")],
        };

        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some("b".to_string());

        let key = keyset.signing_key_for(&header).unwrap();
        assert_eq!(key.kid.as_deref(), Some("b"));
    }

    #[test]
    fn test_signing_key_selection_without_kid_prefers_alg_match() {
        let keyset = JwKeySet {
            keys: vec![symmetric_key(), rsa_key("rsa-1")],
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let key = keyset.signing_key_for(&header).unwrap();
        // The symmetric key has no `use`/`alg` so it is also signature-capable;
        // document order decides.
        assert_eq!(key.kty, "oct");
    }

    #[test]
    fn test_signing_key_selection_without_kid_skips_alg_mismatch() {
        let mut rs512 = rsa_key("rsa-512");
        rs512.alg = Some("RS512".to_string());
        let keyset = JwKeySet {
            keys: vec![rs512, rsa_key("rsa-256")],
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let key = keyset.signing_key_for(&header).unwrap();
        assert_eq!(key.kid.as_deref(), Some("rsa-256"));
    }

    #[test]
    fn test_encryption_keys_are_not_signing_keys() {
        let enc: JwKey = serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "use": "enc",
            "kid": "enc-1"
        }))
        .unwrap();
        assert!(!enc.is_signing_key());
    }

    #[test]
    fn test_unknown_members_round_trip() {
        let json = serde_json::json!({
            "kty": "EC",
            "crv": "P-256",
            "x": "xcoord",
            "y": "ycoord"
        });
        let key: JwKey = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            key.additional_fields.get("crv"),
            Some(&serde_json::json!("P-256"))
        );
        assert_eq!(serde_json::to_value(&key).unwrap(), json);
    }
}

//! OAuth scope constants and scope negotiation
//!
//! Mobile Connect requests always carry the mandatory `openid` scope value;
//! callers add product scopes (authentication, authorization, identity) on
//! top. [`coerce_openid_scope`] guarantees the mandatory value and
//! de-duplicates the result.

/// Scope values defined by the Mobile Connect product suite.
pub mod scopes {
    /// Mandatory OpenID Connect scope; always present in a request.
    pub const OPENID: &str = "openid";
    /// Mobile Connect authentication product.
    pub const MC_AUTHN: &str = "mc_authn";
    /// Mobile Connect authorization product.
    pub const MC_AUTHZ: &str = "mc_authz";
    /// Identity: phone number claim.
    pub const MC_IDENTITY_PHONE: &str = "mc_identity_phonenumber";
    /// Identity: sign-up claim set.
    pub const MC_IDENTITY_SIGNUP: &str = "mc_identity_signup";
    /// Identity: sign-up plus claim set.
    pub const MC_IDENTITY_SIGNUP_PLUS: &str = "mc_identity_signupplus";
    /// Identity: national ID claim set.
    pub const MC_IDENTITY_NATIONAL_ID: &str = "mc_identity_nationalid";
}

/// Merge caller-requested scope values with the protocol defaults.
///
/// The mandatory `openid` value is always present, exactly once. A caller
/// that requests specific scopes gets those scopes plus `openid`; a caller
/// that requests nothing gets `default_scope` (split on whitespace, falling
/// back to the single mandatory `openid` token when absent). The result is
/// de-duplicated, preserving first-seen order (order is not significant to
/// the protocol, but a stable order keeps request URLs reproducible).
pub fn coerce_openid_scope(requested: &[String], default_scope: Option<&str>) -> Vec<String> {
    let mut merged = vec![scopes::OPENID.to_string()];

    let requested: Vec<&str> = requested
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if requested.is_empty() {
        for token in default_scope.unwrap_or(scopes::OPENID).split_whitespace() {
            push_unique(&mut merged, token);
        }
    } else {
        for token in requested {
            push_unique(&mut merged, token);
        }
    }

    merged
}

fn push_unique(merged: &mut Vec<String>, token: &str) {
    if !merged.iter().any(|s| s == token) {
        merged.push(token.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_coerce_keeps_mandatory_scope_with_requested_values() {
        let result = coerce_openid_scope(
            &owned(&["mc_identity_signup", "mc_identity_phonenumber"]),
            Some("openid mc_authn"),
        );

        assert_eq!(result.len(), 3);
        for expected in ["openid", "mc_identity_signup", "mc_identity_phonenumber"] {
            assert!(result.iter().any(|s| s == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_coerce_empty_request_falls_back_to_default_scope() {
        let result = coerce_openid_scope(&[], Some("openid mc_authn"));
        assert_eq!(result, owned(&["openid", "mc_authn"]));
    }

    #[test]
    fn test_coerce_never_duplicates_openid() {
        let result = coerce_openid_scope(&owned(&["openid", "mc_authn"]), Some("openid"));
        assert_eq!(result.iter().filter(|s| *s == "openid").count(), 1);
        assert_eq!(result, owned(&["openid", "mc_authn"]));
    }

    #[test]
    fn test_coerce_null_default_falls_back_to_openid() {
        let result = coerce_openid_scope(&owned(&["mc_authz"]), None);
        assert_eq!(result, owned(&["openid", "mc_authz"]));
    }

    #[test]
    fn test_coerce_ignores_blank_requested_tokens() {
        let result = coerce_openid_scope(&owned(&["", "  ", "mc_authn"]), None);
        assert_eq!(result, owned(&["openid", "mc_authn"]));
    }
}

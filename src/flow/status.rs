//! Flow outcomes handed to the caller after every step

use std::sync::Arc;

use url::Url;

use crate::discovery::DiscoveryResponse;
use crate::error::Error;
use crate::token::TokenResponse;

/// The step of the flow an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowTask {
    /// Resolving operator endpoints from a subscriber context.
    Discovery,
    /// Building or completing the authorization redirect.
    Authentication,
    /// Exchanging an authorization code for tokens, or validating them.
    Token,
    /// Fetching the UserInfo resource.
    UserInfo,
    /// Fetching the PremiumInfo (identity) resource.
    Identity,
    /// Revoking an issued token.
    TokenRevocation,
}

impl std::fmt::Display for FlowTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discovery => "discovery",
            Self::Authentication => "authentication",
            Self::Token => "token",
            Self::UserInfo => "userinfo",
            Self::Identity => "identity",
            Self::TokenRevocation => "token revocation",
        };
        f.write_str(name)
    }
}

/// Outcome of one flow step.
///
/// Exactly one variant is produced per step; the tag determines what the
/// caller does next. Statuses are handed off by value and never persisted
/// by the engine.
#[derive(Debug, Clone)]
pub enum MobileConnectStatus {
    /// The operator is unknown; discovery must run (or re-run) first.
    StartDiscovery,

    /// The operator could not be uniquely identified; send the user to the
    /// operator selection UI.
    OperatorSelection {
        /// Operator selection UI to present to the user.
        url: Url,
    },

    /// Discovery resolved an operator; authentication can start.
    StartAuthentication {
        /// The resolved discovery response to start authentication with.
        discovery: DiscoveryResponse,
    },

    /// Authorization request built; redirect the user (or the headless
    /// chaser) to `url`.
    Authentication {
        /// Operator authorization endpoint with all parameters attached.
        url: Url,
        /// CSRF-protection value bound into the request.
        state: String,
        /// Replay-protection value bound into the request, checked against
        /// the ID token's `nonce` claim after the exchange.
        nonce: String,
    },

    /// Token exchange finished and the ID token (when present) validated.
    Complete {
        /// The issued token response.
        token: TokenResponse,
    },

    /// The presented token was revoked at the operator.
    TokenRevoked,

    /// UserInfo resource fetched.
    UserInfo {
        /// Claims returned by the UserInfo endpoint.
        info: serde_json::Value,
    },

    /// PremiumInfo (identity) resource fetched.
    Identity {
        /// Claims returned by the PremiumInfo endpoint.
        info: serde_json::Value,
    },

    /// Terminal failure.
    Error {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable description, safe to surface in UI.
        message: String,
        /// The underlying failure, retained for diagnostics.
        cause: Option<Arc<Error>>,
    },
}

impl MobileConnectStatus {
    /// An `OperatorSelection` status pointing at the selection UI.
    pub fn operator_selection(url: Url) -> Self {
        Self::OperatorSelection { url }
    }

    /// A `StartAuthentication` status carrying the resolved operator.
    pub fn start_authentication(discovery: DiscoveryResponse) -> Self {
        Self::StartAuthentication { discovery }
    }

    /// An `Authentication` status carrying the redirect URL and the
    /// `state`/`nonce` pair the caller must retain for the callback.
    pub fn authentication(url: Url, state: String, nonce: String) -> Self {
        Self::Authentication { url, state, nonce }
    }

    /// A successful `Complete` status.
    pub fn complete(token: TokenResponse) -> Self {
        Self::Complete { token }
    }

    /// A `UserInfo` status.
    pub fn user_info(info: serde_json::Value) -> Self {
        Self::UserInfo { info }
    }

    /// An `Identity` status.
    pub fn identity(info: serde_json::Value) -> Self {
        Self::Identity { info }
    }

    /// An `Error` status with an explicit code and message, used for
    /// protocol-level failures that carry no engine error (e.g. an
    /// `error` parameter on the authorization callback).
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Map an engine error to a terminal `Error` status.
    ///
    /// The single conversion point between the typed error taxonomy and the
    /// status surface: the code comes from [`Error::code`], the message
    /// names the failed task, and the original error stays reachable as the
    /// cause.
    pub fn from_error(error: Error, task: FlowTask) -> Self {
        Self::Error {
            code: error.code(),
            message: format!("{task} failed: {error}"),
            cause: Some(Arc::new(error)),
        }
    }

    /// True for the terminal `Error` variant.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The machine-readable code, for `Error` statuses.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_carries_code_message_and_cause() {
        let status = MobileConnectStatus::from_error(
            Error::invalid_argument("msisdn", "must be non-empty"),
            FlowTask::Discovery,
        );

        match status {
            MobileConnectStatus::Error {
                code,
                message,
                cause,
            } => {
                assert_eq!(code, "invalid_argument");
                assert!(message.starts_with("discovery failed"));
                assert!(cause.is_some());
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn test_protocol_error_has_no_cause() {
        let status = MobileConnectStatus::error("access_denied", "user declined");
        match status {
            MobileConnectStatus::Error { cause, .. } => assert!(cause.is_none()),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn test_error_code_accessor() {
        assert_eq!(
            MobileConnectStatus::error("access_denied", "user declined").error_code(),
            Some("access_denied")
        );
        assert_eq!(MobileConnectStatus::StartDiscovery.error_code(), None);
    }
}

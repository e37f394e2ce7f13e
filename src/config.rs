//! Engine configuration

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::error::Error;

/// Configuration for the Mobile Connect engine.
///
/// Credentials and the discovery endpoint come from the operator programme;
/// the redirect URL is the caller's registered callback.
#[derive(Debug, Clone, Deserialize)]
pub struct MobileConnectConfig {
    /// OAuth client id issued to the calling application.
    pub client_id: String,

    /// OAuth client secret issued to the calling application.
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: SecretString,

    /// Discovery service endpoint.
    pub discovery_url: Url,

    /// Registered redirect (callback) URL.
    pub redirect_url: Url,

    /// Expected ID-token issuer, when known ahead of discovery.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Scope values used when an authorization request specifies none,
    /// space-separated. The mandatory `openid` value is always carried.
    #[serde(default)]
    pub default_scope: Option<String>,

    /// Per-request transport deadline.
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Hop bound for headless redirect chasing.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_redirects() -> usize {
    10
}

impl MobileConnectConfig {
    /// Assemble a configuration from required fields, applying defaults for
    /// the rest.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        discovery_url: Url,
        redirect_url: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            discovery_url,
            redirect_url,
            issuer: None,
            default_scope: None,
            request_timeout: default_request_timeout(),
            max_redirects: default_max_redirects(),
        }
    }

    /// Check required fields are present and well-formed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_empty() {
            return Err(Error::invalid_argument("client_id", "must be non-empty"));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(Error::invalid_argument(
                "client_secret",
                "must be non-empty",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::invalid_argument(
                "request_timeout",
                "must be greater than zero",
            ));
        }
        if self.max_redirects == 0 {
            return Err(Error::invalid_argument(
                "max_redirects",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    Ok(SecretString::new(s))
}

/// Serde adapter for durations expressed as whole seconds.
mod duration_secs {
    use serde::Deserialize;
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MobileConnectConfig {
        MobileConnectConfig::new(
            "client-1",
            "secret-1",
            Url::parse("https://discovery.example/v2/discovery").unwrap(),
            Url::parse("https://app.example/callback").unwrap(),
        )
    }

    #[test]
    fn test_valid_config_passes() {
        config().validate().unwrap();
    }

    #[test]
    fn test_empty_client_id_is_rejected() {
        let mut cfg = config();
        cfg.client_id = String::new();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let cfg: MobileConnectConfig = serde_json::from_value(serde_json::json!({
            "client_id": "client-1",
            "client_secret": "secret-1",
            "discovery_url": "https://discovery.example/v2/discovery",
            "redirect_url": "https://app.example/callback"
        }))
        .unwrap();

        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_redirects, 10);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let debugged = format!("{:?}", config());
        assert!(!debugged.contains("secret-1"));
    }
}

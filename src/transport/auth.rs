//! Outbound request credentials

use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};

/// Encoder used to build Basic credential headers.
///
/// Base64 encoding is delegated through this seam so host platforms can
/// substitute their own implementation; [`Base64Encoder`] is the default.
pub trait CredentialsEncoder: Send + Sync {
    /// Encode raw bytes for transport in a credential header.
    fn encode(&self, raw: &[u8]) -> String;
}

/// Standard-alphabet Base64 encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder;

impl CredentialsEncoder for Base64Encoder {
    fn encode(&self, raw: &[u8]) -> String {
        STANDARD.encode(raw)
    }
}

/// Credential material attached to an outbound request.
///
/// Opaque to the transport beyond `Authorization` header generation; secret
/// material is zeroized on drop and redacted from `Debug` output.
#[derive(Debug, Clone)]
pub enum RestAuthentication {
    /// HTTP Basic credentials (OAuth client id + secret).
    Basic {
        /// OAuth client identifier
        client_id: String,
        /// OAuth client secret
        client_secret: SecretString,
    },
    /// Bearer token credentials.
    Bearer(SecretString),
}

impl RestAuthentication {
    /// Basic credentials from an OAuth client id and secret.
    pub fn basic(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::Basic {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }

    /// Bearer credentials from an access token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(SecretString::new(token.into()))
    }

    /// Render the `Authorization` header value for these credentials.
    pub fn header_value(&self, encoder: &dyn CredentialsEncoder) -> String {
        match self {
            Self::Basic {
                client_id,
                client_secret,
            } => {
                let raw = format!("{client_id}:{}", client_secret.expose_secret());
                format!("Basic {}", encoder.encode(raw.as_bytes()))
            }
            Self::Bearer(token) => format!("Bearer {}", token.expose_secret()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_is_base64_of_id_and_secret() {
        let auth = RestAuthentication::basic("x-client", "x-secret");
        let header = auth.header_value(&Base64Encoder);

        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, b"x-client:x-secret");
    }

    #[test]
    fn test_bearer_header() {
        let auth = RestAuthentication::bearer("token-123");
        assert_eq!(auth.header_value(&Base64Encoder), "Bearer token-123");
    }

    #[test]
    fn test_custom_encoder_is_used() {
        struct Upper;
        impl CredentialsEncoder for Upper {
            fn encode(&self, raw: &[u8]) -> String {
                String::from_utf8_lossy(raw).to_uppercase()
            }
        }

        let auth = RestAuthentication::basic("id", "secret");
        assert_eq!(auth.header_value(&Upper), "Basic ID:SECRET");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let auth = RestAuthentication::basic("id", "hunter2");
        let debugged = format!("{auth:?}");
        assert!(!debugged.contains("hunter2"));
    }
}

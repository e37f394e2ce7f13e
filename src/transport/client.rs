//! REST client with deadline, cancellation, and redirect chasing

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::auth::{Base64Encoder, CredentialsEncoder, RestAuthentication};
use super::response::RestResponse;
use super::TransportError;

/// Header carrying the caller's source IP for operator discovery.
const SOURCE_IP_HEADER: &str = "X-Source-IP";

/// Configuration for [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Wall-clock deadline applied to every request (default: 30 seconds).
    pub request_timeout: Duration,

    /// Hop bound for [`RestClient::get_final_redirect`] (default: 10).
    pub max_redirects: usize,

    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
            user_agent: format!("mobile-connect/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Per-request options.
///
/// All fields default to absent; callers set only what a request needs.
#[derive(Default, Clone, Copy)]
pub struct RequestOptions<'a> {
    /// Credentials rendered into the `Authorization` header.
    pub auth: Option<&'a RestAuthentication>,

    /// Caller source IP, forwarded to discovery in the `X-Source-IP` header.
    pub source_ip: Option<&'a str>,

    /// Cookie pairs rendered into a single `Cookie` header.
    pub cookies: &'a [(String, String)],

    /// Cancellation token observed while the request is in flight.
    pub cancel: Option<&'a CancellationToken>,
}

/// HTTP client issuing bounded, cancellable requests.
///
/// Redirect following in the underlying client is disabled so the engine can
/// observe every hop; any received HTTP response is returned as a
/// [`RestResponse`] regardless of status code. Each request races its
/// exchange against the configured deadline and the caller's cancellation
/// token; losing the race drops the in-flight future, which aborts the
/// underlying connection.
pub struct RestClient {
    client: reqwest::Client,
    config: RestClientConfig,
    encoder: Arc<dyn CredentialsEncoder>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(RestClientConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn with_config(config: RestClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(&config.user_agent)
            .build()
            .map_err(TransportError::ClientBuild)?;

        Ok(Self {
            client,
            config,
            encoder: Arc::new(Base64Encoder),
        })
    }

    /// Substitute the credentials encoder used for `Authorization` headers.
    pub fn with_encoder(mut self, encoder: Arc<dyn CredentialsEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// The configured per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }

    /// Issue a GET request.
    ///
    /// # Errors
    ///
    /// [`TransportError`] if no response was obtained (timeout, cancellation,
    /// I/O failure). A non-2xx response is returned, not raised.
    pub async fn get(
        &self,
        uri: Url,
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let builder = self.client.get(uri.clone());
        self.execute(builder, Method::GET, uri, options).await
    }

    /// Issue a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// [`TransportError::Encode`] if the body cannot be serialized;
    /// otherwise as [`RestClient::get`].
    pub async fn post_json_content<T: Serialize + ?Sized>(
        &self,
        uri: Url,
        body: &T,
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let payload = serde_json::to_string(body)?;
        let builder = self
            .client
            .post(uri.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(builder, Method::POST, uri, options).await
    }

    /// Issue a POST request with URL-encoded form data.
    pub async fn post_form_data(
        &self,
        uri: Url,
        form: &[(String, String)],
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let builder = self.client.post(uri.clone()).form(form);
        self.execute(builder, Method::POST, uri, options).await
    }

    /// Issue a POST request with a plain string body.
    pub async fn post_string_content(
        &self,
        uri: Url,
        body: String,
        content_type: &str,
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let builder = self
            .client
            .post(uri.clone())
            .header(http::header::CONTENT_TYPE, content_type)
            .body(body);
        self.execute(builder, Method::POST, uri, options).await
    }

    /// Issue a POST request with a raw byte body.
    pub async fn post_content(
        &self,
        uri: Url,
        body: Vec<u8>,
        content_type: &str,
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let builder = self
            .client
            .post(uri.clone())
            .header(http::header::CONTENT_TYPE, content_type)
            .body(body);
        self.execute(builder, Method::POST, uri, options).await
    }

    /// Chase a redirect chain until a hop resolves under `expected_target`.
    ///
    /// Used by the headless flow variant where no browser follows redirects.
    /// Issues a GET to `start_uri`; while the response is a redirect whose
    /// resolved `Location` does not share `expected_target`'s
    /// scheme/host/path prefix, follows the location and repeats. On a match
    /// the matching location is returned verbatim, query parameters (e.g.
    /// the authorization code) intact, without dereferencing it.
    ///
    /// # Errors
    ///
    /// [`TransportError::TooManyRedirects`] past the configured hop bound,
    /// [`TransportError::TargetNotReached`] if a non-redirect response
    /// arrives first, [`TransportError::InvalidLocation`] for an unparseable
    /// `Location`, or any per-hop transport failure.
    pub async fn get_final_redirect(
        &self,
        start_uri: Url,
        expected_target: &Url,
        auth: Option<&RestAuthentication>,
    ) -> Result<Url, TransportError> {
        let mut current = start_uri.clone();

        for hop in 0..self.config.max_redirects {
            let options = RequestOptions {
                auth,
                ..RequestOptions::default()
            };
            let response = self.get(current.clone(), options).await?;

            if !response.status_code().is_redirection() {
                warn!(
                    status = %response.status_code(),
                    uri = %current,
                    hop,
                    "Redirect chain terminated before reaching target"
                );
                return Err(TransportError::TargetNotReached {
                    start: start_uri,
                    expected: expected_target.clone(),
                });
            }

            let Some(location) = response.location() else {
                return Err(TransportError::TargetNotReached {
                    start: start_uri,
                    expected: expected_target.clone(),
                });
            };

            // Resolve relative locations against the hop that issued them.
            let next =
                current
                    .join(location)
                    .map_err(|source| TransportError::InvalidLocation {
                        location: location.to_string(),
                        source,
                    })?;

            debug!(hop, from = %current, to = %next, "Following redirect");

            if matches_target(&next, expected_target) {
                return Ok(next);
            }
            current = next;
        }

        Err(TransportError::TooManyRedirects {
            start: start_uri,
            max: self.config.max_redirects,
        })
    }

    /// Execute one request, racing the exchange against the deadline and the
    /// caller's cancellation token.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        method: Method,
        uri: Url,
        options: RequestOptions<'_>,
    ) -> Result<RestResponse, TransportError> {
        let mut builder = builder;

        if let Some(auth) = options.auth {
            builder = builder.header(
                http::header::AUTHORIZATION,
                auth.header_value(self.encoder.as_ref()),
            );
        }
        if let Some(source_ip) = options.source_ip {
            builder = builder.header(SOURCE_IP_HEADER, source_ip);
        }
        if !options.cookies.is_empty() {
            let cookie_header = options
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(http::header::COOKIE, cookie_header);
        }

        let timeout = self.config.request_timeout;

        let exchange = {
            let method = method.clone();
            let uri = uri.clone();
            async move {
                let response = builder.send().await?;
                let status = response.status();
                let headers = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect();
                let content = response.text().await?;

                Ok::<_, reqwest::Error>(RestResponse::new(method, uri, status, headers, content))
            }
        };
        tokio::pin!(exchange);

        tokio::select! {
            result = &mut exchange => result.map_err(|source| {
                warn!(%method, %uri, error = %source, "Request failed");
                if source.is_timeout() {
                    TransportError::Timeout { method, uri, timeout }
                } else {
                    TransportError::Http { method, uri, source }
                }
            }),
            () = tokio::time::sleep(timeout) => {
                warn!(%method, %uri, ?timeout, "Request deadline elapsed, aborting");
                Err(TransportError::Timeout { method, uri, timeout })
            }
            () = wait_cancelled(options.cancel) => {
                debug!(%method, %uri, "Request cancelled by caller");
                Err(TransportError::Cancelled { method, uri })
            }
        }
    }
}

/// Resolve the caller's cancellation token, or wait forever when none was
/// supplied.
async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// True when `candidate` sits under the expected target's
/// scheme + host (+ port) + path prefix.
fn matches_target(candidate: &Url, expected: &Url) -> bool {
    candidate.scheme() == expected.scheme()
        && candidate.host_str() == expected.host_str()
        && candidate.port_or_known_default() == expected.port_or_known_default()
        && candidate.path().starts_with(expected.path())
}

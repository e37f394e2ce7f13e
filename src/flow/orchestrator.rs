//! Flow orchestration over injected collaborator services

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::status::{FlowTask, MobileConnectStatus};
use crate::cache::ConcurrentCache;
use crate::config::MobileConnectConfig;
use crate::discovery::DiscoveryResponse;
use crate::error::{Error, Result};
use crate::scope::coerce_openid_scope;
use crate::token::{ClaimsValidator, ExpectedClaims, JwKeySet, TokenResponse};
use crate::transport::RestClient;

/// Subscriber context a discovery attempt resolves an operator from.
///
/// At least one of the three identification routes (MSISDN, MCC/MNC pair,
/// source IP) must be supplied.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Subscriber phone number in international format.
    pub msisdn: Option<String>,
    /// Mobile country code, paired with `mnc`.
    pub mcc: Option<String>,
    /// Mobile network code, paired with `mcc`.
    pub mnc: Option<String>,
    /// Caller source IP, forwarded for network-based identification.
    pub source_ip: Option<String>,
}

impl DiscoveryOptions {
    /// The cache key this context resolves under: MSISDN first, then the
    /// MCC/MNC pair, then the source IP.
    fn cache_key(&self) -> Option<String> {
        if let Some(msisdn) = self.msisdn.as_deref().filter(|m| !m.is_empty()) {
            return Some(msisdn.to_string());
        }
        if let (Some(mcc), Some(mnc)) = (self.mcc.as_deref(), self.mnc.as_deref()) {
            if !mcc.is_empty() && !mnc.is_empty() {
                return Some(format!("{mcc}_{mnc}"));
            }
        }
        self.source_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .map(ToString::to_string)
    }
}

/// Parameters of one authorization request.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationOptions {
    /// Requested scope values; `openid` is always carried, and the
    /// configured defaults apply when this is empty.
    pub scope: Vec<String>,
    /// CSRF-protection value; generated when absent.
    pub state: Option<String>,
    /// Replay-protection value; generated when absent.
    pub nonce: Option<String>,
    /// Requested authentication context class (defaults to LoA 2).
    pub acr_values: Option<String>,
}

/// Resolves operator endpoints from a subscriber context.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Run discovery against the configured discovery endpoint.
    async fn start_discovery(&self, options: &DiscoveryOptions) -> Result<DiscoveryResponse>;
}

/// Token-endpoint operations against a resolved operator.
#[async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn request_token(
        &self,
        discovery: &DiscoveryResponse,
        code: &str,
        redirect_uri: &Url,
    ) -> Result<TokenResponse>;

    /// Fetch the operator's published JWKS document.
    async fn jwks(&self, discovery: &DiscoveryResponse) -> Result<JwKeySet>;

    /// Revoke an issued token at the operator.
    async fn revoke_token(&self, discovery: &DiscoveryResponse, token: &str) -> Result<()>;
}

/// Identity-resource operations against a resolved operator.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetch the UserInfo resource with an access token.
    async fn request_user_info(
        &self,
        discovery: &DiscoveryResponse,
        access_token: &str,
    ) -> Result<serde_json::Value>;

    /// Fetch the PremiumInfo (identity) resource with an access token.
    async fn request_identity(
        &self,
        discovery: &DiscoveryResponse,
        access_token: &str,
    ) -> Result<serde_json::Value>;
}

/// The flow orchestrator.
///
/// Drives discovery, authorization, token exchange, and identity retrieval
/// over the injected collaborator services. Every operation returns a
/// [`MobileConnectStatus`]; no error escapes this surface as a `Result`.
/// Failures are converted to terminal `Error` statuses at this boundary.
pub struct MobileConnect {
    config: MobileConnectConfig,
    discovery: Arc<dyn DiscoveryService>,
    authentication: Arc<dyn AuthenticationService>,
    identity: Arc<dyn IdentityService>,
    transport: Arc<RestClient>,
    cache: Arc<ConcurrentCache>,
    validator: ClaimsValidator,
}

impl std::fmt::Debug for MobileConnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileConnect")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MobileConnect {
    /// Assemble an orchestrator from its collaborators.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the configuration fails validation.
    pub fn new(
        config: MobileConnectConfig,
        discovery: Arc<dyn DiscoveryService>,
        authentication: Arc<dyn AuthenticationService>,
        identity: Arc<dyn IdentityService>,
        transport: Arc<RestClient>,
        cache: Arc<ConcurrentCache>,
        validator: ClaimsValidator,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            discovery,
            authentication,
            identity,
            transport,
            cache,
            validator,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &MobileConnectConfig {
        &self.config
    }

    /// Resolve operator endpoints for a subscriber context.
    ///
    /// Consults the cache first (keyed by MSISDN, MCC/MNC, or source IP, in
    /// that order); on a miss the discovery service is called and its
    /// response cached. Yields `StartAuthentication` when the operator was
    /// uniquely identified, `OperatorSelection` when the user must pick one.
    pub async fn attempt_discovery(&self, options: &DiscoveryOptions) -> MobileConnectStatus {
        let Some(cache_key) = options.cache_key() else {
            return MobileConnectStatus::from_error(
                Error::invalid_argument(
                    "discovery options",
                    "one of msisdn, mcc+mnc, or source_ip is required",
                ),
                FlowTask::Discovery,
            );
        };

        match self.cache.get::<DiscoveryResponse>(&cache_key) {
            Ok(Some(cached)) => {
                debug!(key = %cache_key, "Using cached discovery response");
                return self.status_from_discovery(cached);
            }
            Ok(None) => {}
            Err(e) => {
                // Cache faults degrade to a fresh lookup, never a failure.
                warn!(key = %cache_key, error = %e, "Discovery cache read failed");
            }
        }

        let response = match self.discovery.start_discovery(options).await {
            Ok(response) => response,
            Err(e) => return MobileConnectStatus::from_error(e, FlowTask::Discovery),
        };

        if let Err(e) = self.cache.add(&cache_key, &response) {
            warn!(key = %cache_key, error = %e, "Failed to cache discovery response");
        }

        self.status_from_discovery(response)
    }

    fn status_from_discovery(&self, response: DiscoveryResponse) -> MobileConnectStatus {
        if !response.requires_operator_selection() {
            return MobileConnectStatus::start_authentication(response);
        }

        match response.operator_selection_url() {
            Some(url) => MobileConnectStatus::operator_selection(url),
            None => MobileConnectStatus::error(
                "invalid_response",
                "operator not identified and no selection endpoint published",
            ),
        }
    }

    /// Build the authorization request for a resolved operator.
    ///
    /// Generates `state` and `nonce` when the caller supplies none; both are
    /// carried in the returned `Authentication` status and must be retained
    /// for the callback. A discovery response without an authorization
    /// endpoint yields `StartDiscovery`: the context is unusable and
    /// discovery must run again.
    pub fn start_authentication(
        &self,
        discovery: &DiscoveryResponse,
        options: AuthenticationOptions,
    ) -> MobileConnectStatus {
        let Some(mut url) = discovery.operator_urls().authorization_url else {
            warn!("Discovery response carries no authorization endpoint");
            return MobileConnectStatus::StartDiscovery;
        };

        let client_id = discovery
            .client_id()
            .unwrap_or(&self.config.client_id)
            .to_string();
        let state = options
            .state
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let nonce = options
            .nonce
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let scope = coerce_openid_scope(&options.scope, self.config.default_scope.as_deref());
        let acr_values = options.acr_values.as_deref().unwrap_or("2");

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &client_id)
                .append_pair("response_type", "code")
                .append_pair("scope", &scope.join(" "))
                .append_pair("redirect_uri", self.config.redirect_url.as_str())
                .append_pair("state", &state)
                .append_pair("nonce", &nonce)
                .append_pair("acr_values", acr_values);
            if let Some(subscriber_id) = &discovery.subscriber_id {
                pairs.append_pair("login_hint", &format!("ENCR_MSISDN:{subscriber_id}"));
            }
        }

        debug!(%url, "Built authorization request");
        MobileConnectStatus::authentication(url, state, nonce)
    }

    /// Complete the flow from the authorization callback URL.
    ///
    /// Checks the returned `state` against the value generated at
    /// authorization start, surfaces operator-reported errors, and exchanges
    /// the authorization code for tokens.
    pub async fn handle_url_redirect(
        &self,
        redirect_url: &Url,
        discovery: &DiscoveryResponse,
        expected_state: &str,
        expected_nonce: &str,
    ) -> MobileConnectStatus {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;

        for (name, value) in redirect_url.query_pairs() {
            match name.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            let message = error_description.unwrap_or_else(|| error.clone());
            warn!(%error, "Authorization callback carried an error");
            return MobileConnectStatus::error("authorization_error", format!("{error}: {message}"));
        }

        if state.as_deref() != Some(expected_state) {
            return MobileConnectStatus::error(
                "state_mismatch",
                "callback state does not match the value sent at authorization start",
            );
        }

        let Some(code) = code else {
            return MobileConnectStatus::error(
                "invalid_response",
                "callback carried neither a code nor an error",
            );
        };

        self.request_token(discovery, &code, expected_nonce).await
    }

    /// Exchange an authorization code for tokens and validate the ID token.
    pub async fn request_token(
        &self,
        discovery: &DiscoveryResponse,
        code: &str,
        expected_nonce: &str,
    ) -> MobileConnectStatus {
        if code.is_empty() {
            return MobileConnectStatus::from_error(
                Error::invalid_argument("code", "must be non-empty"),
                FlowTask::Token,
            );
        }

        let token = match self
            .authentication
            .request_token(discovery, code, &self.config.redirect_url)
            .await
        {
            Ok(token) => token,
            Err(e) => return MobileConnectStatus::from_error(e, FlowTask::Token),
        };

        if let Some(id_token) = token.id_token.as_deref() {
            let keyset = match self.jwks_for(discovery).await {
                Ok(keyset) => keyset,
                Err(e) => return MobileConnectStatus::from_error(e, FlowTask::Token),
            };

            let expected = ExpectedClaims {
                issuer: self.config.issuer.clone(),
                audience: Some(
                    discovery
                        .client_id()
                        .unwrap_or(&self.config.client_id)
                        .to_string(),
                ),
                nonce: Some(expected_nonce.to_string()),
            };

            if let Err(failures) = self.validator.validate_id_token(id_token, &keyset, &expected) {
                return MobileConnectStatus::from_error(failures.into(), FlowTask::Token);
            }
        }

        MobileConnectStatus::complete(token)
    }

    /// Run the headless flow end to end: build the authorization request,
    /// chase the redirect chain to the registered callback, and exchange the
    /// returned code.
    pub async fn request_headless_authentication(
        &self,
        discovery: &DiscoveryResponse,
        options: AuthenticationOptions,
    ) -> MobileConnectStatus {
        let (url, state, nonce) = match self.start_authentication(discovery, options) {
            MobileConnectStatus::Authentication { url, state, nonce } => (url, state, nonce),
            other => return other,
        };

        let callback = match self
            .transport
            .get_final_redirect(url, &self.config.redirect_url, None)
            .await
        {
            Ok(callback) => callback,
            Err(e) => return MobileConnectStatus::from_error(e.into(), FlowTask::Authentication),
        };

        self.handle_url_redirect(&callback, discovery, &state, &nonce)
            .await
    }

    /// Fetch the UserInfo resource with an issued access token.
    pub async fn request_user_info(
        &self,
        discovery: &DiscoveryResponse,
        access_token: &str,
    ) -> MobileConnectStatus {
        match self.identity.request_user_info(discovery, access_token).await {
            Ok(info) => MobileConnectStatus::user_info(info),
            Err(e) => MobileConnectStatus::from_error(e, FlowTask::UserInfo),
        }
    }

    /// Fetch the PremiumInfo (identity) resource with an issued access
    /// token.
    pub async fn request_identity(
        &self,
        discovery: &DiscoveryResponse,
        access_token: &str,
    ) -> MobileConnectStatus {
        match self.identity.request_identity(discovery, access_token).await {
            Ok(info) => MobileConnectStatus::identity(info),
            Err(e) => MobileConnectStatus::from_error(e, FlowTask::Identity),
        }
    }

    /// Revoke an issued token at the operator.
    pub async fn revoke_token(
        &self,
        discovery: &DiscoveryResponse,
        token: &str,
    ) -> MobileConnectStatus {
        if token.is_empty() {
            return MobileConnectStatus::from_error(
                Error::invalid_argument("token", "must be non-empty"),
                FlowTask::TokenRevocation,
            );
        }

        match self.authentication.revoke_token(discovery, token).await {
            Ok(()) => MobileConnectStatus::TokenRevoked,
            Err(e) => MobileConnectStatus::from_error(e, FlowTask::TokenRevocation),
        }
    }

    /// The operator's JWKS, from the cache when fresh, fetched and cached
    /// otherwise.
    async fn jwks_for(&self, discovery: &DiscoveryResponse) -> Result<JwKeySet> {
        let cache_key = discovery
            .operator_urls()
            .jwks_url
            .map(|url| url.to_string())
            .unwrap_or_default();

        if let Ok(Some(cached)) = self.cache.get::<JwKeySet>(&cache_key) {
            debug!(key = %cache_key, "Using cached JWKS");
            return Ok(cached);
        }

        let keyset = self.authentication.jwks(discovery).await?;

        if !cache_key.is_empty() {
            if let Err(e) = self.cache.add(&cache_key, &keyset) {
                warn!(key = %cache_key, error = %e, "Failed to cache JWKS");
            }
        }

        Ok(keyset)
    }
}

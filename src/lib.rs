//! # Mobile Connect protocol engine
//!
//! Client-side engine for the Mobile Connect flow: operator **discovery**
//! from a phone number or carrier network context, the **authorization**
//! redirect, the **token** exchange with ID-token validation against the
//! operator's published JWKS, and **identity** resource retrieval.
//!
//! The engine is a library with no I/O surface of its own beyond HTTP: a
//! host application injects the discovery/authentication/identity
//! collaborators and consumes [`MobileConnectStatus`] values telling it what
//! to do next.
//!
//! ## Layout
//!
//! - [`flow`]: the orchestrator and the status model the caller consumes
//! - [`transport`]: bounded, cancellable HTTP requests and redirect chasing
//! - [`cache`]: concurrent, type-scoped expiring store for discovery
//!   responses and JWKS documents
//! - [`token`]: ID-token decoding, JWK matching, and claim validation
//! - [`discovery`]: the discovery response contract
//! - [`scope`]: OAuth scope negotiation helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mobile_connect::{
//!     cache::ConcurrentCache,
//!     flow::{DiscoveryOptions, MobileConnect, MobileConnectStatus},
//!     token::ClaimsValidator,
//!     transport::RestClient,
//!     MobileConnectConfig,
//! };
//! use url::Url;
//!
//! # async fn run(
//! #     discovery: Arc<dyn mobile_connect::flow::DiscoveryService>,
//! #     authentication: Arc<dyn mobile_connect::flow::AuthenticationService>,
//! #     identity: Arc<dyn mobile_connect::flow::IdentityService>,
//! # ) -> mobile_connect::Result<()> {
//! let config = MobileConnectConfig::new(
//!     "my-client",
//!     "my-secret",
//!     Url::parse("https://discovery.example/v2/discovery").unwrap(),
//!     Url::parse("https://app.example/callback").unwrap(),
//! );
//!
//! let engine = MobileConnect::new(
//!     config,
//!     discovery,
//!     authentication,
//!     identity,
//!     Arc::new(RestClient::new()?),
//!     Arc::new(ConcurrentCache::new()),
//!     ClaimsValidator::new(),
//! )?;
//!
//! let options = DiscoveryOptions {
//!     msisdn: Some("+447700900901".to_string()),
//!     ..DiscoveryOptions::default()
//! };
//!
//! match engine.attempt_discovery(&options).await {
//!     MobileConnectStatus::StartAuthentication { discovery } => {
//!         // Build the authorization redirect next.
//!     }
//!     MobileConnectStatus::OperatorSelection { url } => {
//!         // Send the user to the operator selection UI.
//!     }
//!     other => { /* handle errors and remaining outcomes */ }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod scope;
pub mod token;
pub mod transport;

pub use config::MobileConnectConfig;
pub use error::{Error, Result};
pub use flow::{MobileConnect, MobileConnectStatus};

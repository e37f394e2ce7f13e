//! Discovery response contract
//!
//! The discovery service (an external collaborator) resolves an operator's
//! authorization/token/userinfo endpoints from a phone number or carrier
//! network context. This module carries its parsed response shape: the DTOs
//! the cache stores and the flow orchestrator reads. Endpoints are published
//! as a link collection keyed by relation name.

mod types;

pub use types::{
    DiscoveryResponse, Link, LinkCollection, OperatorApis, OperatorMetadata, OperatorUrls,
};

/// Link relation names used in discovery responses.
pub mod link_relations {
    /// Operator authorization endpoint.
    pub const AUTHORIZATION: &str = "authorization";
    /// Operator token endpoint.
    pub const TOKEN: &str = "token";
    /// Operator token revocation endpoint.
    pub const TOKEN_REVOKE: &str = "tokenrevoke";
    /// Operator UserInfo endpoint.
    pub const USERINFO: &str = "userinfo";
    /// Operator PremiumInfo (identity) endpoint.
    pub const PREMIUMINFO: &str = "premiuminfo";
    /// Operator JWKS document.
    pub const JWKS: &str = "jwks";
    /// OpenID provider configuration document.
    pub const OPENID_CONFIGURATION: &str = "openid-configuration";
    /// Operator selection UI, returned when the operator is ambiguous.
    pub const OPERATOR_SELECTION: &str = "operatorSelection";
}

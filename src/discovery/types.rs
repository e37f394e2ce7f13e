//! Parsed discovery response DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use url::Url;

use super::link_relations;
use crate::cache::Cacheable;

/// One entry in an operator's link collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Relation name (see [`link_relations`](super::link_relations)).
    pub rel: String,
    /// Target URI, as published.
    pub href: String,
}

/// Operator metadata block inside a discovery response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OperatorMetadata {
    /// OAuth client id issued for this operator.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret issued for this operator.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Operator display name.
    #[serde(default)]
    pub serving_operator: Option<String>,

    /// Operator country.
    #[serde(default)]
    pub country: Option<String>,

    /// Published endpoint links.
    #[serde(default)]
    pub apis: Option<OperatorApis>,

    /// Remaining metadata members.
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

/// API groups in a discovery response; Mobile Connect publishes one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OperatorApis {
    /// The `operatorid` API group holding the endpoint links.
    #[serde(rename = "operatorid", default)]
    pub operator_id: Option<LinkCollection>,
}

/// A collection of links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LinkCollection {
    /// Links in document order.
    #[serde(default)]
    pub link: Vec<Link>,
}

/// Parsed response of the discovery service.
///
/// Stored in the engine cache keyed by the subscriber context it was
/// resolved from (MSISDN, MCC/MNC pair, or source IP).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiscoveryResponse {
    /// Cache lifetime hint, epoch milliseconds.
    #[serde(default)]
    pub ttl: Option<i64>,

    /// Encrypted subscriber identifier, when the subscriber was resolved.
    #[serde(default)]
    pub subscriber_id: Option<String>,

    /// Top-level links (operator selection UI when the operator is
    /// ambiguous).
    #[serde(default)]
    pub links: Option<LinkCollection>,

    /// Operator metadata, present once the operator is identified.
    #[serde(default)]
    pub response: Option<OperatorMetadata>,
}

impl DiscoveryResponse {
    /// OAuth client id issued for the resolved operator.
    pub fn client_id(&self) -> Option<&str> {
        self.response.as_ref()?.client_id.as_deref()
    }

    /// OAuth client secret issued for the resolved operator.
    pub fn client_secret(&self) -> Option<&str> {
        self.response.as_ref()?.client_secret.as_deref()
    }

    /// Parsed operator endpoints, by link relation.
    pub fn operator_urls(&self) -> OperatorUrls {
        self.response
            .as_ref()
            .and_then(|r| r.apis.as_ref())
            .and_then(|apis| apis.operator_id.as_ref())
            .map(|collection| OperatorUrls::from_links(&collection.link))
            .unwrap_or_default()
    }

    /// Operator selection URL, when the operator could not be uniquely
    /// identified.
    pub fn operator_selection_url(&self) -> Option<Url> {
        let links = self.links.as_ref()?;
        links
            .link
            .iter()
            .find(|link| link.rel == link_relations::OPERATOR_SELECTION)
            .and_then(|link| parse_href(link))
    }

    /// True when the caller must be sent to the operator selection UI
    /// before authentication can start.
    pub fn requires_operator_selection(&self) -> bool {
        self.client_id().is_none() || self.operator_urls().authorization_url.is_none()
    }
}

impl Cacheable for DiscoveryResponse {
    const TYPE_TAG: &'static str = "discovery-response";
}

/// Operator endpoints extracted from a discovery link collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorUrls {
    /// Authorization endpoint.
    pub authorization_url: Option<Url>,
    /// Token endpoint.
    pub token_url: Option<Url>,
    /// Token revocation endpoint.
    pub token_revoke_url: Option<Url>,
    /// UserInfo endpoint.
    pub userinfo_url: Option<Url>,
    /// PremiumInfo (identity) endpoint.
    pub premiuminfo_url: Option<Url>,
    /// JWKS document.
    pub jwks_url: Option<Url>,
    /// OpenID provider configuration document.
    pub openid_configuration_url: Option<Url>,
}

impl OperatorUrls {
    /// Extract endpoints by link relation.
    ///
    /// Unknown relations are ignored; an unparseable href drops that single
    /// endpoint (the orchestrator reports the missing endpoint when the
    /// flow actually needs it).
    pub fn from_links(links: &[Link]) -> Self {
        let mut urls = Self::default();

        for link in links {
            let slot = match link.rel.as_str() {
                link_relations::AUTHORIZATION => &mut urls.authorization_url,
                link_relations::TOKEN => &mut urls.token_url,
                link_relations::TOKEN_REVOKE => &mut urls.token_revoke_url,
                link_relations::USERINFO => &mut urls.userinfo_url,
                link_relations::PREMIUMINFO => &mut urls.premiuminfo_url,
                link_relations::JWKS => &mut urls.jwks_url,
                link_relations::OPENID_CONFIGURATION => &mut urls.openid_configuration_url,
                _ => continue,
            };
            if slot.is_none() {
                *slot = parse_href(link);
            }
        }

        urls
    }
}

fn parse_href(link: &Link) -> Option<Url> {
    match Url::parse(&link.href) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(rel = %link.rel, href = %link.href, error = %e, "Ignoring unparseable link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator_response() -> DiscoveryResponse {
        serde_json::from_value(serde_json::json!({
            "ttl": 1_466_082_848_000i64,
            "subscriber_id": "enc-sub-1",
            "response": {
                "client_id": "operator-client",
                "client_secret": "operator-secret",
                "serving_operator": "Example Operator",
                "country": "GB",
                "apis": {
                    "operatorid": {
                        "link": [
                            { "rel": "authorization", "href": "https://op.example/authorize" },
                            { "rel": "token", "href": "https://op.example/token" },
                            { "rel": "userinfo", "href": "https://op.example/userinfo" },
                            { "rel": "jwks", "href": "https://op.example/jwks.json" },
                            { "rel": "tokenrevoke", "href": "https://op.example/revoke" }
                        ]
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_operator_urls_extracted_by_relation() {
        let urls = operator_response().operator_urls();

        assert_eq!(
            urls.authorization_url.unwrap().as_str(),
            "https://op.example/authorize"
        );
        assert_eq!(urls.token_url.unwrap().as_str(), "https://op.example/token");
        assert_eq!(
            urls.jwks_url.unwrap().as_str(),
            "https://op.example/jwks.json"
        );
        assert_eq!(
            urls.token_revoke_url.unwrap().as_str(),
            "https://op.example/revoke"
        );
        assert!(urls.premiuminfo_url.is_none());
    }

    #[test]
    fn test_resolved_operator_needs_no_selection() {
        assert!(!operator_response().requires_operator_selection());
    }

    #[test]
    fn test_ambiguous_operator_exposes_selection_url() {
        let response: DiscoveryResponse = serde_json::from_value(serde_json::json!({
            "links": {
                "link": [
                    { "rel": "operatorSelection", "href": "https://discovery.example/select" }
                ]
            }
        }))
        .unwrap();

        assert!(response.requires_operator_selection());
        assert_eq!(
            response.operator_selection_url().unwrap().as_str(),
            "https://discovery.example/select"
        );
    }

    #[test]
    fn test_unparseable_href_drops_only_that_endpoint() {
        let urls = OperatorUrls::from_links(&[
            Link {
                rel: "authorization".to_string(),
                href: "not a url".to_string(),
            },
            Link {
                rel: "token".to_string(),
                href: "https://op.example/token".to_string(),
            },
        ]);

        assert!(urls.authorization_url.is_none());
        assert!(urls.token_url.is_some());
    }

    #[test]
    fn test_first_link_wins_for_duplicate_relations() {
        let urls = OperatorUrls::from_links(&[
            Link {
                rel: "token".to_string(),
                href: "https://op.example/token-1".to_string(),
            },
            Link {
                rel: "token".to_string(),
                href: "https://op.example/token-2".to_string(),
            },
        ]);

        assert_eq!(
            urls.token_url.unwrap().as_str(),
            "https://op.example/token-1"
        );
    }

    #[test]
    fn test_discovery_response_is_cacheable_round_trip() {
        let response = operator_response();
        let value = serde_json::to_value(&response).unwrap();
        let back: DiscoveryResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }
}

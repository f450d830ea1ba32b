//! OpenID Connect provider discovery via the `.well-known` endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InvalidProviderUrl;

/// Endpoints published by an OpenID Connect provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownUrls {
    pub authorization_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    pub jwks_url: String,
    pub issuer: String,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    jwks_uri: String,
    issuer: String,
}

impl From<DiscoveryDocument> for WellKnownUrls {
    fn from(document: DiscoveryDocument) -> Self {
        Self {
            authorization_url: document.authorization_endpoint,
            access_token_url: document.token_endpoint,
            user_info_url: document.userinfo_endpoint,
            jwks_url: document.jwks_uri,
            issuer: document.issuer,
        }
    }
}

/// Location of the discovery document for a provider base URL.
pub fn well_known_url(base_url: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        base_url.trim_end_matches('/')
    )
}

/// Fetch the discovery document of `base_url` and extract its endpoints.
///
/// Any transport error, non-success status, or document missing one of the
/// required keys is reported as [`InvalidProviderUrl`].
pub async fn discover(
    http: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
) -> Result<WellKnownUrls, InvalidProviderUrl> {
    let url = well_known_url(base_url);

    let response = http
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| {
            tracing::error!(url = %url, error = %e, "Provider 'Wellknown URL endpoint' invalid");
            InvalidProviderUrl
        })?;

    let document: DiscoveryDocument = response.json().await.map_err(|e| {
        tracing::error!(url = %url, error = %e, "Provider discovery document is malformed");
        InvalidProviderUrl
    })?;

    tracing::debug!(url = %url, issuer = %document.issuer, "Discovered OpenID Connect endpoints");

    Ok(document.into())
}

//! JWKS fetching, caching and ID token verification.

use std::{sync::Arc, time::Duration};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{cache::TtlCache, error::AuthFlowError};

pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON Web Key Set published by a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

/// A single key of a [`JwkSet`]. Only RSA keys can verify ID tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Result<DecodingKey, AuthFlowError> {
        let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
            tracing::error!(kid = ?self.kid, kty = %self.kty, "JWK has no RSA components");
            return Err(AuthFlowError::InvalidSigningKey);
        };

        DecodingKey::from_rsa_components(n, e).map_err(|e| {
            tracing::error!(kid = ?self.kid, error = %e, "JWK is not a valid RSA key");
            AuthFlowError::InvalidSigningKey
        })
    }
}

/// Resolves ID token signing keys from provider JWKS endpoints.
///
/// Key sets are cached per JWKS URL. When a token names a `kid` missing from
/// the cached set, the entry is invalidated and refetched exactly once before
/// giving up.
#[derive(Debug, Clone)]
pub struct JwksVerifier {
    http: reqwest::Client,
    cache: Arc<TtlCache<Arc<JwkSet>>>,
    ttl: Duration,
    fetch_timeout: Duration,
}

impl JwksVerifier {
    pub fn new(http: reqwest::Client, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            http,
            cache: Arc::new(TtlCache::new()),
            ttl,
            fetch_timeout,
        }
    }

    /// The shared key set cache.
    pub fn cache(&self) -> &TtlCache<Arc<JwkSet>> {
        &self.cache
    }

    /// Signing key for `kid`, refetching the key set once on a miss.
    pub async fn verifying_key(
        &self,
        jwks_url: &str,
        kid: &str,
    ) -> Result<DecodingKey, AuthFlowError> {
        if let Some(key) = self.lookup(jwks_url, kid).await? {
            return Ok(key);
        }

        tracing::info!(jwks_url, kid, "Signing key not in cached JWKS, refetching");
        self.cache.invalidate(jwks_url).await;

        self.lookup(jwks_url, kid).await?.ok_or_else(|| {
            tracing::error!(jwks_url, kid, "Matching JWK not found after refetch");
            AuthFlowError::KeyNotFound {
                kid: kid.to_string(),
            }
        })
    }

    async fn lookup(&self, jwks_url: &str, kid: &str) -> Result<Option<DecodingKey>, AuthFlowError> {
        let jwks = self
            .cache
            .get_or_insert_with(jwks_url, self.ttl, || self.fetch(jwks_url))
            .await?;

        jwks.find(kid).map(Jwk::decoding_key).transpose()
    }

    async fn fetch(&self, jwks_url: &str) -> Result<Arc<JwkSet>, AuthFlowError> {
        let jwks = self
            .http
            .get(jwks_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::error!(jwks_url, error = %e, "Failed to call JWK endpoint");
                AuthFlowError::JwksRequest(jwks_url.to_string())
            })?
            .json::<JwkSet>()
            .await
            .map_err(|e| {
                tracing::error!(jwks_url, error = %e, "JWK endpoint returned an invalid key set");
                AuthFlowError::JwksRequest(jwks_url.to_string())
            })?;

        tracing::debug!(jwks_url, keys = jwks.keys.len(), "Fetched JWKS");

        Ok(Arc::new(jwks))
    }

    /// Verify an RS256 ID token against the provider's keys and return its
    /// claims. Audience must be `client_id` and issuer `issuer`.
    pub async fn verify_id_token(
        &self,
        id_token: &str,
        jwks_url: &str,
        client_id: &str,
        issuer: &str,
    ) -> Result<Map<String, Value>, AuthFlowError> {
        let header = jsonwebtoken::decode_header(id_token).map_err(|e| {
            tracing::error!(error = %e, "Failed to decode id token header");
            AuthFlowError::MalformedIdToken
        })?;

        let kid = header.kid.ok_or_else(|| {
            tracing::error!("Id token header has no kid");
            AuthFlowError::MalformedIdToken
        })?;

        let key = self.verifying_key(jwks_url, &kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        let token = jsonwebtoken::decode::<Map<String, Value>>(id_token, &key, &validation)
            .map_err(|e| {
                tracing::error!(kid = %kid, error = %e, "Id token verification failed");
                AuthFlowError::IdTokenVerification
            })?;

        Ok(token.claims)
    }
}

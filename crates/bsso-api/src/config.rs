use std::time::Duration;

use bsso_oauth::{FlowConfig, FrontendUrlError, FrontendUrls};
use serde::Deserialize;
use thiserror::Error;

/// Longest accepted `OAUTH_SESSION_EXPIRY_MINUTES` (one day).
pub const MAX_OAUTH_SESSION_EXPIRY_MINUTES: i64 = 24 * 60;
/// Longest accepted `JWKS_CACHE_TTL_SECS` (one week).
pub const MAX_JWKS_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Deployment environment, read from `ENV`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("COOKIE_SECRET must be at least 64 bytes long")]
    CookieSecretTooShort,
    #[error(transparent)]
    FrontendUrls(#[from] FrontendUrlError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration, loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Provider configurations are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    /// Public base URL of this service, used in provider callback URLs.
    pub public_backend_url: String,
    /// Comma-separated frontend URLs. The first one is the default redirect.
    pub frontend_urls: String,
    pub cookie_secret: String,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    #[serde(default = "default_oauth_session_expiry_minutes")]
    pub oauth_session_expiry_minutes: i64,
    /// Bearer token of the provider admin API. The admin API rejects every
    /// request when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default)]
    pub allowed_origins: String,
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
    #[serde(default = "default_jwks_fetch_timeout_secs")]
    pub jwks_fetch_timeout_secs: u64,
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_database_max_connections() -> u32 {
    10
}

const fn default_oauth_session_expiry_minutes() -> i64 {
    10
}

const fn default_jwks_cache_ttl_secs() -> u64 {
    3600
}

const fn default_jwks_fetch_timeout_secs() -> u64 {
    60
}

const fn default_discovery_timeout_secs() -> u64 {
    120
}

const fn default_http_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    /// Load and validate the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_secret.len() < 64 {
            return Err(ConfigError::CookieSecretTooShort);
        }
        let expiry = self.oauth_session_expiry_minutes;
        if !(1..=MAX_OAUTH_SESSION_EXPIRY_MINUTES).contains(&expiry) {
            return Err(ConfigError::Invalid(format!(
                "OAUTH_SESSION_EXPIRY_MINUTES must be between 1 and {MAX_OAUTH_SESSION_EXPIRY_MINUTES}"
            )));
        }
        if self.jwks_cache_ttl_secs > MAX_JWKS_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "JWKS_CACHE_TTL_SECS must not exceed {MAX_JWKS_CACHE_TTL_SECS}"
            )));
        }
        if !self.public_backend_url.starts_with("http://")
            && !self.public_backend_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(
                "PUBLIC_BACKEND_URL must be an http(s) URL".to_string(),
            ));
        }
        self.parsed_frontend_urls()?;

        Ok(())
    }

    pub fn parsed_frontend_urls(&self) -> Result<FrontendUrls, FrontendUrlError> {
        let urls: Vec<&str> = self.frontend_urls.split(',').collect();
        FrontendUrls::parse(&urls)
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            public_backend_url: self.public_backend_url.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            jwks_ttl: Duration::from_secs(self.jwks_cache_ttl_secs),
            jwks_fetch_timeout: Duration::from_secs(self.jwks_fetch_timeout_secs),
        }
    }

    pub const fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}

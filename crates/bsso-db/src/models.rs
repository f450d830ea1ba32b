use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `oauth_providers` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderRecord {
    pub id: i64,
    /// One of `google`, `facebook`, `github`, `gitlab`, `openid_connect`
    pub provider_type: String,
    pub name: String,
    pub enabled: bool,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub secret: String,
    /// Tenant URL for GitLab and OpenID Connect providers
    pub base_url: Option<String>,
    pub authorization_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    /// Discovered for OpenID Connect providers
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub use_id_token: bool,
    pub email_attr_key: String,
    pub first_name_attr_key: String,
    pub last_name_attr_key: String,
    pub scope: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written on insert and update.
#[derive(Debug, Clone)]
pub struct ProviderFields<'a> {
    pub provider_type: &'a str,
    pub name: &'a str,
    pub enabled: bool,
    pub client_id: &'a str,
    pub secret: &'a str,
    pub base_url: Option<&'a str>,
    pub authorization_url: &'a str,
    pub access_token_url: &'a str,
    pub user_info_url: &'a str,
    pub jwks_url: Option<&'a str>,
    pub issuer: Option<&'a str>,
    pub use_id_token: bool,
    pub email_attr_key: &'a str,
    pub first_name_attr_key: &'a str,
    pub last_name_attr_key: &'a str,
    pub scope: &'a [String],
}

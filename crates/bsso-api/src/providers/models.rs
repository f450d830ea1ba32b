use bsso_oauth::{ProviderConfig, ProviderKind};
use serde::Serialize;

/// Provider as returned by the admin API. The client secret is never echoed.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: String,
    pub enabled: bool,
    pub client_id: String,
    pub base_url: Option<String>,
    pub authorization_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub use_id_token: bool,
    pub email_attr_key: String,
    pub first_name_attr_key: String,
    pub last_name_attr_key: String,
    pub scope: Vec<String>,
}

impl From<ProviderConfig> for ProviderResponse {
    fn from(provider: ProviderConfig) -> Self {
        Self {
            id: provider.id,
            kind: provider.kind,
            name: provider.name,
            enabled: provider.enabled,
            client_id: provider.client_id,
            base_url: provider.base_url,
            authorization_url: provider.authorization_url,
            access_token_url: provider.access_token_url,
            user_info_url: provider.user_info_url,
            jwks_url: provider.jwks_url,
            issuer: provider.issuer,
            use_id_token: provider.use_id_token,
            email_attr_key: provider.email_attr_key,
            first_name_attr_key: provider.first_name_attr_key,
            last_name_attr_key: provider.last_name_attr_key,
            scope: provider.scope,
        }
    }
}

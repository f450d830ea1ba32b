//! Provider configuration storage and the service managing it.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    discovery::discover,
    error::ProviderError,
    login_options::{LoginOptions, login_options},
    provider::{NewProvider, ProviderConfig, ProviderKind, ProviderUpdate},
};

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Persistence for provider configurations.
#[async_trait]
pub trait ProviderStore: Send + Sync + fmt::Debug {
    async fn get(&self, id: i64) -> anyhow::Result<Option<ProviderConfig>>;

    /// All providers ordered by id.
    async fn list(&self) -> anyhow::Result<Vec<ProviderConfig>>;

    /// Persist a new provider and return it with its assigned id.
    async fn insert(&self, provider: ProviderConfig) -> anyhow::Result<ProviderConfig>;

    /// Overwrite an existing provider. Returns `false` if it does not exist.
    async fn update(&self, provider: &ProviderConfig) -> anyhow::Result<bool>;

    async fn delete(&self, id: i64) -> anyhow::Result<bool>;

    async fn list_enabled(&self, kind: ProviderKind) -> anyhow::Result<Vec<ProviderConfig>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|provider| provider.enabled && provider.kind == kind)
            .collect())
    }
}

#[derive(Debug, Default)]
struct MemoryProviders {
    next_id: i64,
    providers: BTreeMap<i64, ProviderConfig>,
}

/// Process-local provider storage.
#[derive(Debug, Default)]
pub struct MemoryProviderStore {
    inner: RwLock<MemoryProviders>,
}

impl MemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderStore for MemoryProviderStore {
    async fn get(&self, id: i64) -> anyhow::Result<Option<ProviderConfig>> {
        Ok(self.inner.read().await.providers.get(&id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<ProviderConfig>> {
        Ok(self.inner.read().await.providers.values().cloned().collect())
    }

    async fn insert(&self, mut provider: ProviderConfig) -> anyhow::Result<ProviderConfig> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        provider.id = inner.next_id;
        inner.providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    async fn update(&self, provider: &ProviderConfig) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.providers.get_mut(&provider.id) {
            Some(existing) => {
                *existing = provider.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.inner.write().await.providers.remove(&id).is_some())
    }
}

/// Creates, updates and looks up providers, running OpenID Connect discovery
/// whenever a provider's base URL is set.
#[derive(Debug, Clone)]
pub struct ProviderService {
    store: Arc<dyn ProviderStore>,
    http: reqwest::Client,
    discovery_timeout: Duration,
}

impl ProviderService {
    pub fn new(store: Arc<dyn ProviderStore>, http: reqwest::Client) -> Self {
        Self {
            store,
            http,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub async fn create(&self, new: NewProvider) -> Result<ProviderConfig, ProviderError> {
        let mut provider = ProviderConfig::new(
            new.kind,
            new.name,
            new.client_id,
            new.secret,
            new.base_url,
        )?;
        provider.enabled = new.enabled;
        provider.use_id_token = new.use_id_token;
        if let Some(key) = new.email_attr_key {
            provider.email_attr_key = key;
        }
        if let Some(key) = new.first_name_attr_key {
            provider.first_name_attr_key = key;
        }
        if let Some(key) = new.last_name_attr_key {
            provider.last_name_attr_key = key;
        }

        if provider.kind == ProviderKind::OpenIdConnect {
            self.rediscover(&mut provider).await?;
        }
        validate(&provider)?;

        let provider = self.store.insert(provider).await?;
        tracing::info!(
            provider_id = provider.id,
            provider_type = %provider.kind,
            "Created OAuth provider"
        );

        Ok(provider)
    }

    /// Apply `changes` to provider `id`. Discovery runs before anything is
    /// written, so a failing discovery leaves the stored provider untouched.
    pub async fn update(
        &self,
        id: i64,
        changes: ProviderUpdate,
    ) -> Result<ProviderConfig, ProviderError> {
        let mut provider = self.get(id).await?;

        if let Some(base_url) = changes.base_url {
            let base_url = base_url.trim_end_matches('/').to_string();
            if provider.kind.requires_base_url() && base_url.is_empty() {
                return Err(ProviderError::Invalid(format!(
                    "a base_url is required for {} providers",
                    provider.kind
                )));
            }

            if provider.base_url.as_deref() != Some(base_url.as_str()) {
                provider.base_url = Some(base_url).filter(|url| !url.is_empty());
                match provider.kind {
                    ProviderKind::OpenIdConnect => self.rediscover(&mut provider).await?,
                    ProviderKind::GitLab => provider.apply_type_endpoints(),
                    _ => {}
                }
            }
        }

        if let Some(name) = changes.name {
            provider.name = name;
        }
        if let Some(client_id) = changes.client_id {
            provider.client_id = client_id;
        }
        if let Some(secret) = changes.secret {
            provider.secret = secret;
        }
        if let Some(enabled) = changes.enabled {
            provider.enabled = enabled;
        }
        if let Some(use_id_token) = changes.use_id_token {
            provider.use_id_token = use_id_token;
        }
        if let Some(key) = changes.email_attr_key {
            provider.email_attr_key = key;
        }
        if let Some(key) = changes.first_name_attr_key {
            provider.first_name_attr_key = key;
        }
        if let Some(key) = changes.last_name_attr_key {
            provider.last_name_attr_key = key;
        }
        validate(&provider)?;

        if !self.store.update(&provider).await? {
            return Err(ProviderError::NotFound(id));
        }
        tracing::info!(provider_id = id, provider_type = %provider.kind, "Updated OAuth provider");

        Ok(provider)
    }

    async fn rediscover(&self, provider: &mut ProviderConfig) -> Result<(), ProviderError> {
        let base_url = provider.base_url.as_deref().unwrap_or_default();
        let urls = discover(&self.http, base_url, self.discovery_timeout).await?;
        provider.apply_well_known(urls);
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<ProviderConfig, ProviderError> {
        self.store
            .get(id)
            .await?
            .ok_or(ProviderError::NotFound(id))
    }

    /// Provider `id` if it exists and is enabled.
    pub async fn get_enabled(&self, id: i64) -> Result<ProviderConfig, ProviderError> {
        let provider = self.get(id).await?;
        if !provider.enabled {
            return Err(ProviderError::NotFound(id));
        }
        Ok(provider)
    }

    pub async fn list(&self) -> Result<Vec<ProviderConfig>, ProviderError> {
        Ok(self.store.list().await?)
    }

    pub async fn list_enabled(&self, kind: ProviderKind) -> Result<Vec<ProviderConfig>, ProviderError> {
        Ok(self.store.list_enabled(kind).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProviderError> {
        if !self.store.delete(id).await? {
            return Err(ProviderError::NotFound(id));
        }
        tracing::info!(provider_id = id, "Deleted OAuth provider");
        Ok(())
    }

    /// Login options of every provider type with at least one enabled
    /// provider, keyed by type.
    pub async fn login_options(
        &self,
        public_backend_url: &str,
    ) -> Result<BTreeMap<ProviderKind, LoginOptions>, ProviderError> {
        let mut options = BTreeMap::new();
        for kind in ProviderKind::ALL {
            let providers = self.list_enabled(kind).await?;
            if let Some(option) = login_options(kind, &providers, public_backend_url) {
                options.insert(kind, option);
            }
        }
        Ok(options)
    }
}

fn validate(provider: &ProviderConfig) -> Result<(), ProviderError> {
    for (field, value) in [
        ("name", &provider.name),
        ("client_id", &provider.client_id),
        ("secret", &provider.secret),
        ("email_attr_key", &provider.email_attr_key),
    ] {
        if value.trim().is_empty() {
            return Err(ProviderError::Invalid(format!("{field} must not be empty")));
        }
    }

    if provider.use_id_token && (provider.jwks_url.is_none() || provider.issuer.is_none()) {
        return Err(ProviderError::Invalid(
            "use_id_token requires a provider with a JWKS URL and issuer".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn service() -> ProviderService {
        ProviderService::new(Arc::new(MemoryProviderStore::new()), reqwest::Client::new())
            .with_discovery_timeout(Duration::from_secs(5))
    }

    fn discovery_document(host: &str) -> String {
        serde_json::json!({
            "authorization_endpoint": format!("{host}/authorization"),
            "token_endpoint": format!("{host}/accesstoken"),
            "userinfo_endpoint": format!("{host}/userinfo"),
            "jwks_uri": format!("{host}/jwks"),
            "issuer": host,
        })
        .to_string()
    }

    async fn mock_discovery(server: &mut Server, host: &str) -> mockito::Mock {
        server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(discovery_document(host))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_create_oidc_runs_discovery() {
        let mut server = Server::new_async().await;
        let mock = mock_discovery(&mut server, "https://id.example.com").await;
        let service = service();

        let provider = service
            .create(NewProvider::new(ProviderKind::OpenIdConnect, "OIDC", "c", "s").with_base_url(server.url()))
            .await
            .expect("provider should be created");

        assert_eq!(provider.id, 1);
        assert_eq!(provider.authorization_url, "https://id.example.com/authorization");
        assert_eq!(provider.access_token_url, "https://id.example.com/accesstoken");
        assert_eq!(provider.user_info_url, "https://id.example.com/userinfo");
        assert_eq!(provider.jwks_url.as_deref(), Some("https://id.example.com/jwks"));
        assert_eq!(provider.issuer.as_deref(), Some("https://id.example.com"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_oidc_with_bad_base_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(404)
            .create_async()
            .await;
        let service = service();

        let result = service
            .create(NewProvider::new(ProviderKind::OpenIdConnect, "OIDC", "c", "s").with_base_url(server.url()))
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidProviderUrl(_))));
        assert!(service.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_failed_rediscovery_leaves_provider_unchanged() {
        let mut good = Server::new_async().await;
        let _mock = mock_discovery(&mut good, "https://id.example.com").await;
        let mut bad = Server::new_async().await;
        let _bad_mock = bad
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(500)
            .create_async()
            .await;
        let service = service();
        let created = service
            .create(NewProvider::new(ProviderKind::OpenIdConnect, "OIDC", "c", "s").with_base_url(good.url()))
            .await
            .expect("provider should be created");

        let result = service
            .update(
                created.id,
                ProviderUpdate {
                    base_url: Some(bad.url()),
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidProviderUrl(_))));
        let stored = service.get(created.id).await.expect("provider exists");
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn test_update_without_base_url_change_skips_discovery() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/.well-known/openid-configuration")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(discovery_document("https://id.example.com"))
            .expect(1)
            .create_async()
            .await;
        let service = service();
        let created = service
            .create(NewProvider::new(ProviderKind::OpenIdConnect, "OIDC", "c", "s").with_base_url(server.url()))
            .await
            .expect("provider should be created");

        let updated = service
            .update(
                created.id,
                ProviderUpdate {
                    base_url: Some(format!("{}/", server.url())),
                    use_id_token: Some(true),
                    ..Default::default()
                },
            )
            .await
            .expect("update should succeed");

        assert!(updated.use_id_token);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gitlab_endpoints_follow_base_url() {
        let service = service();
        let created = service
            .create(
                NewProvider::new(ProviderKind::GitLab, "GitLab", "c", "s")
                    .with_base_url("https://gitlab.example.com"),
            )
            .await
            .expect("provider should be created");

        let updated = service
            .update(
                created.id,
                ProviderUpdate {
                    base_url: Some("https://git.acme.test/".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update should succeed");

        assert_eq!(updated.authorization_url, "https://git.acme.test/oauth/authorize");
        assert_eq!(updated.user_info_url, "https://git.acme.test/api/v4/user");
    }

    #[tokio::test]
    async fn test_id_token_requires_jwks() {
        let service = service();
        let mut new = NewProvider::new(ProviderKind::Google, "Google", "c", "s");
        new.use_id_token = true;

        let result = service.create(new).await;

        assert!(matches!(result, Err(ProviderError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_disabled_provider_is_not_enabled() {
        let service = service();
        let mut new = NewProvider::new(ProviderKind::GitHub, "GitHub", "c", "s");
        new.enabled = false;
        let created = service.create(new).await.expect("provider should be created");

        assert!(service.get(created.id).await.is_ok());
        assert!(matches!(
            service.get_enabled(created.id).await,
            Err(ProviderError::NotFound(_))
        ));
        assert!(matches!(
            service.get_enabled(999).await,
            Err(ProviderError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_provider() {
        let service = service();

        assert!(matches!(
            service.update(42, ProviderUpdate::default()).await,
            Err(ProviderError::NotFound(42))
        ));
        assert!(matches!(
            service.delete(42).await,
            Err(ProviderError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_login_options_by_type() {
        let service = service();
        service
            .create(NewProvider::new(ProviderKind::Google, "Google", "c", "s"))
            .await
            .expect("google");
        service
            .create(NewProvider::new(ProviderKind::GitHub, "GitHub A", "c", "s"))
            .await
            .expect("github a");
        service
            .create(NewProvider::new(ProviderKind::GitHub, "GitHub B", "c", "s"))
            .await
            .expect("github b");

        let options = service
            .login_options("https://api.example.com")
            .await
            .expect("login options");

        assert_eq!(options.len(), 2);
        assert_eq!(
            options[&ProviderKind::Google].default_redirect_url.as_deref(),
            Some("https://api.example.com/api/sso/oauth2/login/1")
        );
        assert_eq!(options[&ProviderKind::GitHub].items.len(), 2);
        assert!(options[&ProviderKind::GitHub].default_redirect_url.is_none());
    }
}

//! Postgres-backed provider storage.

use anyhow::Context;
use async_trait::async_trait;
use bsso_db::{
    models::{ProviderFields, ProviderRecord},
    repositories::provider,
};
use bsso_oauth::{ProviderConfig, ProviderKind, ProviderStore};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct PgProviderStore {
    pool: PgPool,
}

impl PgProviderStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn fields(config: &ProviderConfig) -> ProviderFields<'_> {
    ProviderFields {
        provider_type: config.kind.as_str(),
        name: &config.name,
        enabled: config.enabled,
        client_id: &config.client_id,
        secret: &config.secret,
        base_url: config.base_url.as_deref(),
        authorization_url: &config.authorization_url,
        access_token_url: &config.access_token_url,
        user_info_url: &config.user_info_url,
        jwks_url: config.jwks_url.as_deref(),
        issuer: config.issuer.as_deref(),
        use_id_token: config.use_id_token,
        email_attr_key: &config.email_attr_key,
        first_name_attr_key: &config.first_name_attr_key,
        last_name_attr_key: &config.last_name_attr_key,
        scope: &config.scope,
    }
}

fn into_config(record: ProviderRecord) -> anyhow::Result<ProviderConfig> {
    let kind: ProviderKind = record
        .provider_type
        .parse()
        .with_context(|| format!("provider {} has an unknown type", record.id))?;

    Ok(ProviderConfig {
        id: record.id,
        kind,
        name: record.name,
        enabled: record.enabled,
        client_id: record.client_id,
        secret: record.secret,
        base_url: record.base_url,
        authorization_url: record.authorization_url,
        access_token_url: record.access_token_url,
        user_info_url: record.user_info_url,
        jwks_url: record.jwks_url,
        issuer: record.issuer,
        use_id_token: record.use_id_token,
        email_attr_key: record.email_attr_key,
        first_name_attr_key: record.first_name_attr_key,
        last_name_attr_key: record.last_name_attr_key,
        scope: record.scope,
    })
}

#[async_trait]
impl ProviderStore for PgProviderStore {
    async fn get(&self, id: i64) -> anyhow::Result<Option<ProviderConfig>> {
        provider::find_by_id(&self.pool, id)
            .await
            .context("failed to load provider")?
            .map(into_config)
            .transpose()
    }

    async fn list(&self) -> anyhow::Result<Vec<ProviderConfig>> {
        provider::list(&self.pool)
            .await
            .context("failed to list providers")?
            .into_iter()
            .map(into_config)
            .collect()
    }

    async fn insert(&self, config: ProviderConfig) -> anyhow::Result<ProviderConfig> {
        let record = provider::insert(&self.pool, &fields(&config))
            .await
            .context("failed to insert provider")?;

        into_config(record)
    }

    async fn update(&self, config: &ProviderConfig) -> anyhow::Result<bool> {
        provider::update(&self.pool, config.id, &fields(config))
            .await
            .context("failed to update provider")
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        provider::delete(&self.pool, id)
            .await
            .context("failed to delete provider")
    }

    async fn list_enabled(&self, kind: ProviderKind) -> anyhow::Result<Vec<ProviderConfig>> {
        provider::list_enabled_by_type(&self.pool, kind.as_str())
            .await
            .context("failed to list enabled providers")?
            .into_iter()
            .map(into_config)
            .collect()
    }
}

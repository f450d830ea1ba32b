use sqlx::{Executor, Postgres};

use crate::models::{ProviderFields, ProviderRecord};

const PROVIDER_COLUMNS: &str = r#"
    id, provider_type, name, enabled, client_id, secret, base_url,
    authorization_url, access_token_url, user_info_url, jwks_url, issuer,
    use_id_token, email_attr_key, first_name_attr_key, last_name_attr_key,
    scope, created_at, updated_at
"#;

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<ProviderRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {PROVIDER_COLUMNS} FROM oauth_providers WHERE id = $1");

    sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<ProviderRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!("SELECT {PROVIDER_COLUMNS} FROM oauth_providers ORDER BY id");

    sqlx::query_as(&query).fetch_all(executor).await
}

pub async fn list_enabled_by_type<'e, E>(
    executor: E,
    provider_type: &str,
) -> Result<Vec<ProviderRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        "SELECT {PROVIDER_COLUMNS} FROM oauth_providers \
         WHERE provider_type = $1 AND enabled ORDER BY id"
    );

    sqlx::query_as(&query)
        .bind(provider_type)
        .fetch_all(executor)
        .await
}

pub async fn insert<'e, E>(
    executor: E,
    fields: &ProviderFields<'_>,
) -> Result<ProviderRecord, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
            INSERT INTO oauth_providers (
                provider_type, name, enabled, client_id, secret, base_url,
                authorization_url, access_token_url, user_info_url, jwks_url, issuer,
                use_id_token, email_attr_key, first_name_attr_key, last_name_attr_key,
                scope
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PROVIDER_COLUMNS}
        "#
    );

    sqlx::query_as(&query)
        .bind(fields.provider_type)
        .bind(fields.name)
        .bind(fields.enabled)
        .bind(fields.client_id)
        .bind(fields.secret)
        .bind(fields.base_url)
        .bind(fields.authorization_url)
        .bind(fields.access_token_url)
        .bind(fields.user_info_url)
        .bind(fields.jwks_url)
        .bind(fields.issuer)
        .bind(fields.use_id_token)
        .bind(fields.email_attr_key)
        .bind(fields.first_name_attr_key)
        .bind(fields.last_name_attr_key)
        .bind(fields.scope)
        .fetch_one(executor)
        .await
}

/// Overwrite every column of provider `id`. Returns `false` if no row matched.
pub async fn update<'e, E>(
    executor: E,
    id: i64,
    fields: &ProviderFields<'_>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE oauth_providers SET
                provider_type = $2,
                name = $3,
                enabled = $4,
                client_id = $5,
                secret = $6,
                base_url = $7,
                authorization_url = $8,
                access_token_url = $9,
                user_info_url = $10,
                jwks_url = $11,
                issuer = $12,
                use_id_token = $13,
                email_attr_key = $14,
                first_name_attr_key = $15,
                last_name_attr_key = $16,
                scope = $17,
                updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(fields.provider_type)
    .bind(fields.name)
    .bind(fields.enabled)
    .bind(fields.client_id)
    .bind(fields.secret)
    .bind(fields.base_url)
    .bind(fields.authorization_url)
    .bind(fields.access_token_url)
    .bind(fields.user_info_url)
    .bind(fields.jwks_url)
    .bind(fields.issuer)
    .bind(fields.use_id_token)
    .bind(fields.email_attr_key)
    .bind(fields.first_name_attr_key)
    .bind(fields.last_name_attr_key)
    .bind(fields.scope)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM oauth_providers WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use bsso_oauth::{NewProvider, ProviderUpdate};

use super::{admin::Admin, models::ProviderResponse};
use crate::{ApiState, error::ApiError};

/// Provider configuration endpoints, guarded by the admin token.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/api/sso/oauth2/providers",
            get(list_providers).post(create_provider),
        )
        .route(
            "/api/sso/oauth2/providers/{id}",
            get(get_provider)
                .patch(update_provider)
                .delete(delete_provider),
        )
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

async fn list_providers(
    _: Admin,
    State(state): State<ApiState>,
) -> Result<Json<Vec<ProviderResponse>>, ApiError> {
    let providers = state.providers.list().await?;

    Ok(Json(providers.into_iter().map(Into::into).collect()))
}

async fn create_provider(
    _: Admin,
    State(state): State<ApiState>,
    payload: Result<Json<NewProvider>, JsonRejection>,
) -> Result<(StatusCode, Json<ProviderResponse>), ApiError> {
    let provider = state.providers.create(body(payload)?).await?;

    Ok((StatusCode::CREATED, Json(provider.into())))
}

async fn get_provider(
    _: Admin,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let provider = state.providers.get(id).await?;

    Ok(Json(provider.into()))
}

async fn update_provider(
    _: Admin,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    payload: Result<Json<ProviderUpdate>, JsonRejection>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let provider = state.providers.update(id, body(payload)?).await?;

    Ok(Json(provider.into()))
}

async fn delete_provider(
    _: Admin,
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.providers.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

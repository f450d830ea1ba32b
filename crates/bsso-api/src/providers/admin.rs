use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::{ApiState, error::ApiError};

/// Settings of the provider admin API.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// Bearer token expected on admin requests. Every request is rejected
    /// when unset.
    pub token: Option<String>,
}

impl FromRef<ApiState> for AdminConfig {
    fn from_ref(state: &ApiState) -> Self {
        Self {
            token: state.admin_token.clone(),
        }
    }
}

/// Extractor guarding the admin routes with `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl<S> FromRequestParts<S> for Admin
where
    AdminConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AdminConfig::from_ref(state);
        let Some(expected) = config.token.as_deref() else {
            tracing::warn!("Admin request rejected: no admin token configured");
            return Err(ApiError::Unauthorized);
        };

        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let matches: bool = provided.trim().as_bytes().ct_eq(expected.as_bytes()).into();
        if !matches {
            return Err(ApiError::Unauthorized);
        }

        Ok(Self)
    }
}

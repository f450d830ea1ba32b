use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bsso_oauth::ProviderError;
use serde_json::json;
use thiserror::Error;

/// Errors returned as JSON by the API endpoints.
///
/// Login and callback failures never surface here: those endpoints always
/// redirect back to the frontend with an error code instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The requested provider does not exist.")]
    ProviderDoesNotExist,
    #[error("The provided base URL does not expose a valid OpenID Connect discovery document.")]
    InvalidProviderUrl,
    #[error("{0}")]
    Validation(String),
    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProviderDoesNotExist => "ERROR_PROVIDER_DOES_NOT_EXIST",
            Self::InvalidProviderUrl => "ERROR_INVALID_PROVIDER_URL",
            Self::Validation(_) => "ERROR_REQUEST_BODY_VALIDATION",
            Self::Unauthorized => "ERROR_UNAUTHORIZED",
            Self::Internal(_) => "ERROR_INTERNAL",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ProviderDoesNotExist => StatusCode::NOT_FOUND,
            Self::InvalidProviderUrl | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(_) => Self::ProviderDoesNotExist,
            ProviderError::InvalidProviderUrl(_) => Self::InvalidProviderUrl,
            ProviderError::Invalid(detail) => Self::Validation(detail),
            ProviderError::Storage(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            tracing::error!("Internal error: {e:#}");
        }

        let body = Json(json!({
            "error": self.code(),
            "detail": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

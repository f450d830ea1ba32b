use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
};
use axum_extra::extract::PrivateCookieJar;
use bsso_oauth::{LoginOptions, PendingRequest, ProviderConfig, ProviderError, ProviderKind};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::session::{clear_session, load_session, store_session};
use crate::{ApiState, error::ApiError, identity::SsoErrorCode, metrics::record_auth_event};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/sso/oauth2/login/{provider_id}", get(login))
        .route(
            "/api/sso/oauth2/callback/{provider_id}",
            get(callback).post(callback),
        )
        .route("/api/sso/oauth2/login-options", get(login_options))
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    original: Option<String>,
    workspace_invitation_token: Option<String>,
    language: Option<String>,
}

impl From<LoginQuery> for PendingRequest {
    fn from(query: LoginQuery) -> Self {
        Self {
            workspace_invitation_token: query.workspace_invitation_token,
            language: query.language,
            original_url: query.original,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Redirect to the default frontend URL carrying `code` as the error.
fn error_redirect(state: &ApiState, code: SsoErrorCode) -> Redirect {
    let url = state
        .frontend_urls
        .resolve(None, &[(SsoErrorCode::QUERY_PARAM, code.as_str())], true);
    Redirect::to(&url)
}

/// Look up an enabled provider. `Ok(None)` when it does not exist or is
/// disabled.
async fn enabled_provider(
    state: &ApiState,
    provider_id: i64,
) -> Result<Option<ProviderConfig>, ApiError> {
    match state.providers.get_enabled(provider_id).await {
        Ok(provider) => Ok(Some(provider)),
        Err(ProviderError::NotFound(_)) => {
            tracing::debug!(provider_id, "Login requested for unknown or disabled provider");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn login(
    State(state): State<ApiState>,
    Path(provider_id): Path<i64>,
    Query(query): Query<LoginQuery>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    let Some(provider) = enabled_provider(&state, provider_id).await? else {
        return Ok((jar, error_redirect(&state, SsoErrorCode::ProviderDoesNotExist)));
    };

    let mut session = load_session(&jar);
    let url = match state
        .flow
        .authorization_url(&provider, &mut session, query.into())
    {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(provider_id, kind = e.kind(), "Failed to build authorization URL: {e}");
            record_auth_event("login", provider.kind.as_str(), Some(e.kind()));
            return Ok((jar, error_redirect(&state, SsoErrorCode::AuthFlowError)));
        }
    };

    let jar = store_session(jar, &session, &state.cookie_config)?;
    record_auth_event("login", provider.kind.as_str(), None);

    Ok((jar, Redirect::to(&url)))
}

async fn callback(
    State(state): State<ApiState>,
    Path(provider_id): Path<i64>,
    Query(query): Query<CallbackQuery>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    // The login state is single use: the cookie goes away whatever happens next.
    let mut session = load_session(&jar);
    let jar = clear_session(jar, &state.cookie_config);

    let Some(provider) = enabled_provider(&state, provider_id).await? else {
        return Ok((jar, error_redirect(&state, SsoErrorCode::ProviderDoesNotExist)));
    };
    let provider_type = provider.kind.as_str();

    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        tracing::warn!(provider_id, "OAuth callback without code or state");
        record_auth_event("callback", provider_type, Some("missing_parameters"));
        return Ok((jar, error_redirect(&state, SsoErrorCode::AuthFlowError)));
    };

    let completed = match state
        .flow
        .complete(&provider, &code, &returned_state, &mut session)
        .await
    {
        Ok(completed) => completed,
        Err(e) => {
            tracing::warn!(provider_id, kind = e.kind(), "OAuth login failed: {e}");
            record_auth_event("callback", provider_type, Some(e.kind()));
            return Ok((jar, error_redirect(&state, SsoErrorCode::AuthFlowError)));
        }
    };

    let sign_in = match state.identity.resolve(&provider, &completed.user_info).await {
        Ok(sign_in) => sign_in,
        Err(e) => {
            tracing::warn!(provider_id, "Could not sign in user: {e}");
            record_auth_event("callback", provider_type, Some(e.code().as_str()));
            return Ok((jar, error_redirect(&state, e.code())));
        }
    };

    let params: Vec<(&str, &str)> = sign_in
        .redirect_params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let url = state
        .frontend_urls
        .resolve(completed.original_url.as_deref(), &params, true);
    record_auth_event("callback", provider_type, None);

    Ok((jar, Redirect::to(&url)))
}

async fn login_options(
    State(state): State<ApiState>,
) -> Result<Json<BTreeMap<ProviderKind, LoginOptions>>, ApiError> {
    let options = state
        .providers
        .login_options(state.flow.public_backend_url())
        .await?;

    Ok(Json(options))
}

//! The OAuth2 login flow: authorization redirect and callback completion.

use std::time::Duration;

use oauth2::{AccessToken, CsrfToken, Scope};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use crate::{
    error::AuthFlowError,
    jwks::{DEFAULT_JWKS_FETCH_TIMEOUT, DEFAULT_JWKS_TTL, JwksVerifier},
    provider::{ProviderConfig, ProviderKind, callback_url},
    session::{OAuthSessionState, PendingRequest, SessionStore},
    token::{ProviderTokens, exchange_code, oauth_client},
    user_info::{UserInfo, extract_identity, select_github_email},
};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Settings of an [`AuthFlow`].
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Public base URL of this service, used to build callback URLs.
    pub public_backend_url: String,
    pub http_timeout: Duration,
    pub jwks_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
}

impl FlowConfig {
    pub fn new(public_backend_url: impl Into<String>) -> Self {
        Self {
            public_backend_url: public_backend_url.into(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            jwks_ttl: DEFAULT_JWKS_TTL,
            jwks_fetch_timeout: DEFAULT_JWKS_FETCH_TIMEOUT,
        }
    }
}

/// HTTP client for provider calls. Redirects are not followed.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Outcome of a successful callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedLogin {
    pub user_info: UserInfo,
    /// Frontend URL the user was on before logging in, unvalidated.
    pub original_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthFlow {
    http: reqwest::Client,
    jwks: JwksVerifier,
    public_backend_url: String,
}

impl AuthFlow {
    pub fn new(config: &FlowConfig) -> reqwest::Result<Self> {
        let http = http_client(config.http_timeout)?;
        Ok(Self::with_http_client(http, config))
    }

    pub fn with_http_client(http: reqwest::Client, config: &FlowConfig) -> Self {
        let jwks = JwksVerifier::new(http.clone(), config.jwks_ttl, config.jwks_fetch_timeout);

        Self {
            http,
            jwks,
            public_backend_url: config.public_backend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn jwks(&self) -> &JwksVerifier {
        &self.jwks
    }

    pub fn public_backend_url(&self) -> &str {
        &self.public_backend_url
    }

    /// Build the provider's authorization URL and remember the CSRF state
    /// and `pending` request in `session`. No network call is made.
    pub fn authorization_url(
        &self,
        provider: &ProviderConfig,
        session: &mut impl SessionStore,
        pending: PendingRequest,
    ) -> Result<String, AuthFlowError> {
        let client = oauth_client(provider, callback_url(&self.public_backend_url, provider.id))?;

        let (url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(provider.scope.iter().cloned().map(Scope::new))
            .url();

        OAuthSessionState {
            csrf_state: csrf_state.secret().clone(),
            pending_request: pending,
        }
        .store(session);

        tracing::debug!(
            provider_id = provider.id,
            provider_type = %provider.kind,
            "Redirecting to provider"
        );

        Ok(url.to_string())
    }

    /// Validate the callback state, exchange `code` and resolve the user.
    ///
    /// The session's login state is consumed whether or not this succeeds.
    pub async fn complete(
        &self,
        provider: &ProviderConfig,
        code: &str,
        returned_state: &str,
        session: &mut impl SessionStore,
    ) -> Result<CompletedLogin, AuthFlowError> {
        let login = OAuthSessionState::take(session)?;
        if login.csrf_state != returned_state {
            tracing::warn!(provider_id = provider.id, "OAuth state mismatch");
            return Err(AuthFlowError::StateMismatch);
        }

        let client = oauth_client(provider, callback_url(&self.public_backend_url, provider.id))?;
        let tokens = exchange_code(&self.http, provider, &client, code.to_string()).await?;

        let claims = if provider.use_id_token {
            self.id_token_claims(provider, &tokens).await?
        } else {
            self.user_info_claims(provider, &tokens.access_token).await?
        };

        let identity = extract_identity(provider, &claims)?;
        let user_info = UserInfo::new(identity, &login.pending_request);

        tracing::info!(
            provider_id = provider.id,
            provider_type = %provider.kind,
            "OAuth login completed"
        );

        Ok(CompletedLogin {
            user_info,
            original_url: login.pending_request.original_url,
        })
    }

    async fn id_token_claims(
        &self,
        provider: &ProviderConfig,
        tokens: &ProviderTokens,
    ) -> Result<Map<String, Value>, AuthFlowError> {
        let id_token = tokens.id_token.as_deref().ok_or_else(|| {
            tracing::error!(provider_id = provider.id, "Token response has no id_token");
            AuthFlowError::MissingIdToken
        })?;

        let (Some(jwks_url), Some(issuer)) = (provider.jwks_url.as_deref(), provider.issuer.as_deref())
        else {
            tracing::error!(provider_id = provider.id, "Provider has no JWKS URL or issuer");
            return Err(AuthFlowError::InvalidEndpoint);
        };

        self.jwks
            .verify_id_token(id_token, jwks_url, &provider.client_id, issuer)
            .await
    }

    async fn user_info_claims(
        &self,
        provider: &ProviderConfig,
        access_token: &AccessToken,
    ) -> Result<Map<String, Value>, AuthFlowError> {
        let mut claims: Map<String, Value> = self
            .http
            .get(&provider.user_info_url)
            .bearer_auth(access_token.secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::error!(provider_id = provider.id, error = %e, "User info request failed");
                AuthFlowError::UserInfoRequest
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::error!(provider_id = provider.id, error = %e, "User info response is not a JSON object");
                AuthFlowError::UserInfoRequest
            })?;

        if provider.kind == ProviderKind::GitHub {
            let email = self.github_email(provider, access_token).await?;
            claims.insert(
                provider.email_attr_key.clone(),
                email.map_or(Value::Null, Value::String),
            );
        }

        Ok(claims)
    }

    async fn github_email(
        &self,
        provider: &ProviderConfig,
        access_token: &AccessToken,
    ) -> Result<Option<String>, AuthFlowError> {
        let emails: Vec<Value> = self
            .http
            .get(provider.github_emails_url())
            .header(AUTHORIZATION, format!("token {}", access_token.secret()))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::error!(provider_id = provider.id, error = %e, "GitHub email request failed");
                AuthFlowError::EmailRequest
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::error!(provider_id = provider.id, error = %e, "GitHub email response is malformed");
                AuthFlowError::EmailRequest
            })?;

        Ok(select_github_email(&emails))
    }
}

//! OAuth2 client construction and the authorization code exchange.

use oauth2::{
    AccessToken, AsyncHttpClient, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret,
    EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError, HttpRequest, HttpResponse,
    RedirectUrl, StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
    http::{HeaderValue, header::CONTENT_TYPE},
    url::form_urlencoded,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::AuthFlowError,
    provider::{ProviderConfig, ProviderKind},
};

/// Token endpoint fields beyond the OAuth2 standard ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for ProviderTokenFields {}

pub type ProviderTokenResponse = StandardTokenResponse<ProviderTokenFields, BasicTokenType>;

pub type ProviderClient<HasAuthUrl = EndpointSet, HasTokenUrl = EndpointSet> = Client<
    BasicErrorResponse,
    ProviderTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    HasAuthUrl,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    HasTokenUrl,
>;

/// Tokens obtained from the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: AccessToken,
    pub id_token: Option<String>,
}

/// Build the OAuth2 client of a provider, redirecting back to `redirect_url`.
pub fn oauth_client(
    provider: &ProviderConfig,
    redirect_url: String,
) -> Result<ProviderClient, AuthFlowError> {
    let auth_url = AuthUrl::new(provider.authorization_url.clone()).map_err(|e| {
        tracing::error!(provider_id = provider.id, error = %e, "Invalid authorization URL");
        AuthFlowError::InvalidEndpoint
    })?;
    let token_url = TokenUrl::new(provider.access_token_url.clone()).map_err(|e| {
        tracing::error!(provider_id = provider.id, error = %e, "Invalid access token URL");
        AuthFlowError::InvalidEndpoint
    })?;
    let redirect_url = RedirectUrl::new(redirect_url).map_err(|e| {
        tracing::error!(provider_id = provider.id, error = %e, "Invalid callback URL");
        AuthFlowError::InvalidEndpoint
    })?;

    let client = ProviderClient::<EndpointNotSet, EndpointNotSet>::new(ClientId::new(
        provider.client_id.clone(),
    ))
    .set_client_secret(ClientSecret::new(provider.secret.clone()))
    .set_auth_uri(auth_url)
    .set_token_uri(token_url)
    .set_redirect_uri(redirect_url)
    .set_auth_type(provider.kind.client_auth());

    Ok(client)
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    client: &ProviderClient,
    code: String,
) -> Result<ProviderTokens, AuthFlowError> {
    let request = client.exchange_code(AuthorizationCode::new(code));

    let response = if provider.kind == ProviderKind::Facebook {
        let http = http.clone();
        let facebook_client = move |request: HttpRequest| {
            let http = http.clone();
            async move { facebook_request(&http, request).await }
        };
        request.request_async(&facebook_client).await
    } else {
        request.request_async(http).await
    };

    let response = response.map_err(|e| {
        tracing::error!(
            provider_id = provider.id,
            provider_type = %provider.kind,
            error = %e,
            "Token exchange failed"
        );
        AuthFlowError::TokenExchange
    })?;

    Ok(ProviderTokens {
        access_token: response.access_token().clone(),
        id_token: response.extra_fields().id_token.clone(),
    })
}

/// Send a token request and rewrite Facebook's legacy response body.
async fn facebook_request(
    http: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, HttpClientError<reqwest::Error>> {
    let mut response = AsyncHttpClient::call(http, request).await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    if let Some(body) = facebook_token_body(content_type, response.body()) {
        *response.body_mut() = body;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(response)
}

/// Convert a `text/plain` form-encoded token body into the JSON shape OAuth2
/// clients expect. Returns `None` when the body needs no rewriting.
pub(crate) fn facebook_token_body(content_type: Option<&str>, body: &[u8]) -> Option<Vec<u8>> {
    if !content_type.is_some_and(|ct| ct.starts_with("text/plain")) {
        return None;
    }

    let mut token: Map<String, Value> = form_urlencoded::parse(body)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();

    if let Some(expires) = token.get("expires").and_then(Value::as_str) {
        let expires_in = expires
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(expires.to_string()));
        token.insert("expires_in".to_string(), expires_in);
    }
    token.insert("token_type".to_string(), Value::String("Bearer".to_string()));

    serde_json::to_vec(&token).ok()
}

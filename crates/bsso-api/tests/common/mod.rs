#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use bsso_api::{
    ApiConfig, ApiState, SignIn,
    identity::{IdentityError, IdentityResolver},
    router,
};
use bsso_oauth::{MemoryProviderStore, NewProvider, ProviderConfig, ProviderKind, UserInfo};
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test_admin_token";
pub const FRONTEND_URL: &str = "http://localhost:3000/dashboard";
pub const PUBLIC_BACKEND_URL: &str = "http://localhost:8000";

/// Test configuration
pub struct TestConfig {
    pub cookie_secret: String,
    pub frontend_urls: String,
    pub admin_token: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            cookie_secret: "test_cookie_secret_minimum_64_characters_long_for_secure_encryption"
                .to_string(),
            frontend_urls: format!("{FRONTEND_URL},http://localhost:3001"),
            admin_token: Some(ADMIN_TOKEN.to_string()),
        }
    }
}

/// How the test identity resolver answers.
#[derive(Debug, Clone, Copy, Default)]
pub enum ResolverOutcome {
    #[default]
    SignIn,
    Deactivated,
    DifferentProvider,
}

/// Identity resolver that remembers every identity it was handed.
#[derive(Debug, Default)]
pub struct RecordingIdentityResolver {
    outcome: ResolverOutcome,
    seen: Mutex<Vec<UserInfo>>,
}

impl RecordingIdentityResolver {
    pub fn seen(&self) -> Vec<UserInfo> {
        self.seen.lock().expect("resolver lock").clone()
    }
}

#[async_trait]
impl IdentityResolver for RecordingIdentityResolver {
    async fn resolve(
        &self,
        _provider: &ProviderConfig,
        user_info: &UserInfo,
    ) -> Result<SignIn, IdentityError> {
        self.seen.lock().expect("resolver lock").push(user_info.clone());

        match self.outcome {
            ResolverOutcome::SignIn => Ok(SignIn {
                redirect_params: vec![("token".to_string(), "refresh-token".to_string())],
            }),
            ResolverOutcome::Deactivated => Err(IdentityError::Deactivated),
            ResolverOutcome::DifferentProvider => Err(IdentityError::DifferentProvider),
        }
    }
}

/// Test state builder for creating an in-memory ApiState
pub struct TestStateBuilder {
    config: TestConfig,
    outcome: ResolverOutcome,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            config: TestConfig::default(),
            outcome: ResolverOutcome::default(),
        }
    }

    pub fn without_admin_token(mut self) -> Self {
        self.config.admin_token = None;
        self
    }

    pub fn with_resolver_outcome(mut self, outcome: ResolverOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn build(self) -> TestApp {
        let mut vars = vec![
            ("PUBLIC_BACKEND_URL".to_string(), PUBLIC_BACKEND_URL.to_string()),
            ("FRONTEND_URLS".to_string(), self.config.frontend_urls),
            ("COOKIE_SECRET".to_string(), self.config.cookie_secret),
            ("DISCOVERY_TIMEOUT_SECS".to_string(), "5".to_string()),
            ("HTTP_TIMEOUT_SECS".to_string(), "5".to_string()),
        ];
        if let Some(token) = self.config.admin_token {
            vars.push(("ADMIN_TOKEN".to_string(), token));
        }
        let config: ApiConfig = envy::from_iter(vars).expect("test config should parse");
        config.validate().expect("test config should be valid");

        let resolver = Arc::new(RecordingIdentityResolver {
            outcome: self.outcome,
            ..Default::default()
        });
        let state = ApiState::new(&config, Arc::new(MemoryProviderStore::new()), resolver.clone())
            .expect("test state should build");

        TestApp { state, resolver }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State plus handles the tests inspect.
pub struct TestApp {
    pub state: ApiState,
    pub resolver: Arc<RecordingIdentityResolver>,
}

impl TestApp {
    pub fn client(&self) -> TestClient {
        TestClient::new(router::router().with_state(self.state.clone()))
    }

    pub fn cookie_key(&self) -> &Key {
        &self.state.cookie_key
    }

    /// Create a provider directly through the service.
    pub async fn create_provider(&self, new: NewProvider) -> ProviderConfig {
        self.state
            .providers
            .create(new)
            .await
            .expect("provider should be created")
    }

    /// A GitLab provider whose endpoints live on `base_url`.
    pub async fn create_gitlab(&self, base_url: &str) -> ProviderConfig {
        self.create_provider(
            NewProvider::new(ProviderKind::GitLab, "GitLab", "client_id", "client_secret")
                .with_base_url(base_url),
        )
        .await
    }
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a request carrying a raw `Cookie` header
    pub async fn with_cookie(&self, method: &str, uri: &str, cookie: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a GET request with `name=value` encrypted into a private cookie
    pub async fn get_with_private_cookie(
        &self,
        uri: &str,
        name: &str,
        value: &str,
        cookie_key: &Key,
    ) -> TestResponse {
        use cookie::{CookieJar as RawCookieJar, Key as RawKey};

        let raw_key = RawKey::try_from(cookie_key.master()).expect("Invalid key");
        let mut raw_jar = RawCookieJar::new();
        raw_jar
            .private_mut(&raw_key)
            .add(cookie::Cookie::new(name.to_string(), value.to_string()));

        let encrypted = raw_jar.get(name).expect("Cookie should exist");

        self.with_cookie(
            "GET",
            uri,
            &format!("{}={}", encrypted.name(), encrypted.value()),
        )
        .await
    }

    /// Send an admin request, with the bearer token when `token` is set
    pub async fn admin(
        &self,
        method: &str,
        uri: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.request(builder.body(body).expect("Failed to build request"))
            .await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }

    /// `Location` header of a redirect
    pub fn location(&self) -> String {
        self.headers
            .get(header::LOCATION)
            .expect("response should redirect")
            .to_str()
            .expect("Location is not valid UTF-8")
            .to_string()
    }

    /// Extract cookie value by name
    pub fn get_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(cookie_name, _)| *cookie_name == name)
            .map(|(_, value)| value.to_string())
    }

    /// Full `Set-Cookie` header for `name`
    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|cookie| cookie.starts_with(&format!("{name}=")))
            .map(str::to_string)
    }
}

/// Value of query parameter `name` in `url`.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).expect("valid URL");
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Signing helpers for ID tokens, mirroring a provider's JWKS.
pub mod jwt {
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::{Value, json};

    const RSA_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_private.pem");
    const RSA_MODULUS: &str = "vl-hbwHefM8aThBVIafGIP01oUhia9KLfl6j8XkirqEyeq4-28UxtYmqSx9gDgwJp6gK-Kp0V-x_YB9gusNv571cjU9Sz89zYXUJ5x6l8r3T4i64d8_78gzEIOeMfdvNryXXY5D0XyAzRTLiFZB1PwIouSBHWIEeZeS8f3xv3U_urgP9aGDn7pb7mM1SO4MeDYq7M06T_mtXmiPNPs_TJGUtYehafCmqUf45UCBjUPhQIjqwUPP98KZfWQXHmk5YVSotUCpZhKIHgJe-xSbO_fxbaGm0Y11rVsymaHR3USDMIZUzerK9SMSNeFcZIvl_14OW-iBoIKdU165uEO4UcQ";

    pub fn jwks_body(kid: &str) -> String {
        json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": kid,
                "n": RSA_MODULUS,
                "e": "AQAB",
            }]
        })
        .to_string()
    }

    pub fn sign_id_token(issuer: &str, audience: &str, kid: &str) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock before epoch")
            .as_secs();
        let claims: Value = json!({
            "iss": issuer,
            "aud": audience,
            "sub": "42",
            "iat": now,
            "exp": now + 3600,
            "email": "oidc.user@example.com",
            "given_name": "Oidc",
            "family_name": "User",
        });

        let key = EncodingKey::from_rsa_pem(RSA_PRIVATE_PEM.as_bytes()).expect("test key should load");
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());

        jsonwebtoken::encode(&header, &claims, &key).expect("test token should sign")
    }
}

/// A GitLab token response.
pub fn token_body() -> String {
    json!({
        "access_token": "provider-access-token",
        "token_type": "Bearer",
        "expires_in": 7200,
    })
    .to_string()
}

//! Provider descriptors: per-type endpoints, scopes and client credentials.

use std::{fmt, str::FromStr};

use oauth2::AuthType;
use serde::{Deserialize, Serialize};

use crate::{discovery::WellKnownUrls, error::ProviderError};

const GOOGLE_AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_ACCESS_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";
const GOOGLE_USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

const FACEBOOK_AUTHORIZATION_URL: &str = "https://www.facebook.com/dialog/oauth";
const FACEBOOK_ACCESS_TOKEN_URL: &str = "https://graph.facebook.com/oauth/access_token";
const FACEBOOK_USER_INFO_URL: &str = "https://graph.facebook.com/me?fields=id,email,name";

const GITHUB_AUTHORIZATION_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_INFO_URL: &str = "https://api.github.com/user";

const GITLAB_AUTHORIZATION_PATH: &str = "/oauth/authorize";
const GITLAB_ACCESS_TOKEN_PATH: &str = "/oauth/token";
const GITLAB_USER_INFO_PATH: &str = "/api/v4/user";

pub const DEFAULT_EMAIL_ATTR_KEY: &str = "email";
pub const DEFAULT_FIRST_NAME_ATTR_KEY: &str = "name";

/// Supported OAuth2 provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "facebook")]
    Facebook,
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
    #[serde(rename = "openid_connect")]
    OpenIdConnect,
}

impl ProviderKind {
    pub const ALL: [Self; 5] = [
        Self::Google,
        Self::Facebook,
        Self::GitHub,
        Self::GitLab,
        Self::OpenIdConnect,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::OpenIdConnect => "openid_connect",
        }
    }

    /// Scopes requested in the authorization redirect.
    pub fn default_scopes(self) -> Vec<String> {
        let scopes: &[&str] = match self {
            Self::Google => &[
                "openid",
                "https://www.googleapis.com/auth/userinfo.email",
                "https://www.googleapis.com/auth/userinfo.profile",
            ],
            Self::Facebook => &["email"],
            Self::GitHub => &["read:user", "user:email"],
            Self::GitLab => &["read_user"],
            Self::OpenIdConnect => &["openid", "email", "profile"],
        };
        scopes.iter().map(|s| s.to_string()).collect()
    }

    /// Whether the provider needs a tenant-supplied `base_url`.
    pub const fn requires_base_url(self) -> bool {
        matches!(self, Self::GitLab | Self::OpenIdConnect)
    }

    /// How the client secret is presented to the token endpoint.
    ///
    /// GitHub, GitLab and Facebook document credentials in the form body;
    /// Google and generic OIDC providers default to HTTP basic auth.
    pub(crate) const fn client_auth(self) -> AuthType {
        match self {
            Self::GitHub | Self::GitLab | Self::Facebook => AuthType::RequestBody,
            Self::Google | Self::OpenIdConnect => AuthType::BasicAuth,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProviderError::Invalid(format!("unknown provider type '{s}'")))
    }
}

/// Configuration of one provider instance. Immutable for the duration of a
/// login flow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: String,
    pub enabled: bool,
    pub client_id: String,
    pub secret: String,
    pub base_url: Option<String>,
    pub authorization_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub use_id_token: bool,
    pub email_attr_key: String,
    pub first_name_attr_key: String,
    pub last_name_attr_key: String,
    pub scope: Vec<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("client_id", &self.client_id)
            .field("secret", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("authorization_url", &self.authorization_url)
            .field("access_token_url", &self.access_token_url)
            .field("user_info_url", &self.user_info_url)
            .field("jwks_url", &self.jwks_url)
            .field("issuer", &self.issuer)
            .field("use_id_token", &self.use_id_token)
            .field("email_attr_key", &self.email_attr_key)
            .field("first_name_attr_key", &self.first_name_attr_key)
            .field("last_name_attr_key", &self.last_name_attr_key)
            .field("scope", &self.scope)
            .finish()
    }
}

impl ProviderConfig {
    /// Build a provider with the fixed endpoints of its type.
    ///
    /// GitLab endpoints are templated from `base_url`. OpenID Connect
    /// endpoints are left empty until discovery fills them in through
    /// [`ProviderConfig::apply_well_known`].
    pub fn new(
        kind: ProviderKind,
        name: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        if kind.requires_base_url() && base_url.is_none() {
            return Err(ProviderError::Invalid(format!(
                "a base_url is required for {kind} providers"
            )));
        }

        let mut provider = Self {
            id: 0,
            kind,
            name: name.into(),
            enabled: true,
            client_id: client_id.into(),
            secret: secret.into(),
            base_url,
            authorization_url: String::new(),
            access_token_url: String::new(),
            user_info_url: String::new(),
            jwks_url: None,
            issuer: None,
            use_id_token: false,
            email_attr_key: DEFAULT_EMAIL_ATTR_KEY.to_string(),
            first_name_attr_key: DEFAULT_FIRST_NAME_ATTR_KEY.to_string(),
            last_name_attr_key: String::new(),
            scope: kind.default_scopes(),
        };
        provider.apply_type_endpoints();

        Ok(provider)
    }

    /// Reset the endpoints owned by the provider type.
    ///
    /// No-op for OpenID Connect, whose endpoints come from discovery.
    pub fn apply_type_endpoints(&mut self) {
        let (authorization, token, user_info) = match self.kind {
            ProviderKind::Google => (
                GOOGLE_AUTHORIZATION_URL.to_string(),
                GOOGLE_ACCESS_TOKEN_URL.to_string(),
                GOOGLE_USER_INFO_URL.to_string(),
            ),
            ProviderKind::Facebook => (
                FACEBOOK_AUTHORIZATION_URL.to_string(),
                FACEBOOK_ACCESS_TOKEN_URL.to_string(),
                FACEBOOK_USER_INFO_URL.to_string(),
            ),
            ProviderKind::GitHub => (
                GITHUB_AUTHORIZATION_URL.to_string(),
                GITHUB_ACCESS_TOKEN_URL.to_string(),
                GITHUB_USER_INFO_URL.to_string(),
            ),
            ProviderKind::GitLab => {
                let base = self.base_url.as_deref().unwrap_or_default();
                (
                    format!("{base}{GITLAB_AUTHORIZATION_PATH}"),
                    format!("{base}{GITLAB_ACCESS_TOKEN_PATH}"),
                    format!("{base}{GITLAB_USER_INFO_PATH}"),
                )
            }
            ProviderKind::OpenIdConnect => return,
        };

        self.authorization_url = authorization;
        self.access_token_url = token;
        self.user_info_url = user_info;
    }

    /// Store the endpoints found in the provider's discovery document.
    pub fn apply_well_known(&mut self, urls: WellKnownUrls) {
        self.authorization_url = urls.authorization_url;
        self.access_token_url = urls.access_token_url;
        self.user_info_url = urls.user_info_url;
        self.jwks_url = Some(urls.jwks_url);
        self.issuer = Some(urls.issuer);
    }

    /// GitHub only returns the email through a dedicated endpoint below the
    /// user endpoint.
    pub fn github_emails_url(&self) -> String {
        format!("{}/emails", self.user_info_url.trim_end_matches('/'))
    }
}

/// Input for creating a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProvider {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: String,
    pub client_id: String,
    pub secret: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub use_id_token: bool,
    #[serde(default)]
    pub email_attr_key: Option<String>,
    #[serde(default)]
    pub first_name_attr_key: Option<String>,
    #[serde(default)]
    pub last_name_attr_key: Option<String>,
}

const fn default_enabled() -> bool {
    true
}

impl NewProvider {
    pub fn new(
        kind: ProviderKind,
        name: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            client_id: client_id.into(),
            secret: secret.into(),
            base_url: None,
            enabled: true,
            use_id_token: false,
            email_attr_key: None,
            first_name_attr_key: None,
            last_name_attr_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Partial update of a provider. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub base_url: Option<String>,
    pub enabled: Option<bool>,
    pub use_id_token: Option<bool>,
    pub email_attr_key: Option<String>,
    pub first_name_attr_key: Option<String>,
    pub last_name_attr_key: Option<String>,
}

/// URL that starts the login flow for a provider.
pub fn login_url(public_backend_url: &str, provider_id: i64) -> String {
    format!(
        "{}/api/sso/oauth2/login/{provider_id}",
        public_backend_url.trim_end_matches('/')
    )
}

/// URL the provider redirects back to with the authorization code.
pub fn callback_url(public_backend_url: &str, provider_id: i64) -> String {
    format!(
        "{}/api/sso/oauth2/callback/{provider_id}",
        public_backend_url.trim_end_matches('/')
    )
}

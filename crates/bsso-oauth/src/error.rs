use thiserror::Error;

/// Failure of an OAuth2 / OpenID Connect login flow.
///
/// Every failure site has its own variant so logs and metrics can tell them
/// apart, but the messages stay generic: upstream details (HTTP bodies, JWT
/// errors) are logged where they happen and never carried in the error.
#[derive(Error, Debug)]
pub enum AuthFlowError {
    #[error("No OAuth state found in session")]
    MissingState,
    #[error("OAuth state does not match")]
    StateMismatch,
    #[error("Provider endpoint is not a valid URL")]
    InvalidEndpoint,
    #[error("Token exchange failed")]
    TokenExchange,
    #[error("User info request failed")]
    UserInfoRequest,
    #[error("Email request failed")]
    EmailRequest,
    #[error("Id token is missing")]
    MissingIdToken,
    #[error("Id token is malformed")]
    MalformedIdToken,
    #[error("Failed to call JWK endpoint with URL {0}")]
    JwksRequest(String),
    #[error("Matching JWK not found for kid: {kid}")]
    KeyNotFound { kid: String },
    #[error("Signing key is not a valid RSA key")]
    InvalidSigningKey,
    #[error("Id token verification failed")]
    IdTokenVerification,
    #[error("Provider did not return an email address")]
    MissingEmail,
}

impl AuthFlowError {
    /// Stable identifier of the failure site, used as a metrics label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingState => "missing_state",
            Self::StateMismatch => "state_mismatch",
            Self::InvalidEndpoint => "invalid_endpoint",
            Self::TokenExchange => "token_exchange",
            Self::UserInfoRequest => "user_info_request",
            Self::EmailRequest => "email_request",
            Self::MissingIdToken => "missing_id_token",
            Self::MalformedIdToken => "malformed_id_token",
            Self::JwksRequest(_) => "jwks_request",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::InvalidSigningKey => "invalid_signing_key",
            Self::IdTokenVerification => "id_token_verification",
            Self::MissingEmail => "missing_email",
        }
    }
}

/// The OpenID Connect discovery document of a provider could not be used.
///
/// Only raised while creating or updating a provider, never during login.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Provider 'Wellknown URL endpoint' invalid")]
pub struct InvalidProviderUrl;

/// Errors of the provider configuration service.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider {0} does not exist")]
    NotFound(i64),
    #[error(transparent)]
    InvalidProviderUrl(#[from] InvalidProviderUrl),
    #[error("Invalid provider configuration: {0}")]
    Invalid(String),
    #[error("Provider storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

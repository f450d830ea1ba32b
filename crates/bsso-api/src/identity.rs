//! Hand-off of authenticated identities to the account system.

use std::fmt;

use async_trait::async_trait;
use bsso_oauth::{ProviderConfig, UserInfo};
use thiserror::Error;

/// Error codes appended to the frontend URL when a login cannot complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoErrorCode {
    ProviderDoesNotExist,
    AuthFlowError,
    UserDeactivated,
    DifferentProvider,
}

impl SsoErrorCode {
    pub const QUERY_PARAM: &'static str = "error";

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderDoesNotExist => "errorProviderDoesNotExist",
            Self::AuthFlowError => "errorAuthFlowError",
            Self::UserDeactivated => "errorUserDeactivated",
            Self::DifferentProvider => "errorDifferentProvider",
        }
    }
}

impl fmt::Display for SsoErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of signing a user in: extra query parameters for the redirect back
/// to the frontend, typically session tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignIn {
    pub redirect_params: Vec<(String, String)>,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User account is deactivated")]
    Deactivated,
    #[error("User is registered with a different authentication provider")]
    DifferentProvider,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IdentityError {
    pub const fn code(&self) -> SsoErrorCode {
        match self {
            Self::Deactivated => SsoErrorCode::UserDeactivated,
            Self::DifferentProvider => SsoErrorCode::DifferentProvider,
            Self::Other(_) => SsoErrorCode::AuthFlowError,
        }
    }
}

/// Finds or creates the account behind a verified identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync + fmt::Debug {
    async fn resolve(
        &self,
        provider: &ProviderConfig,
        user_info: &UserInfo,
    ) -> Result<SignIn, IdentityError>;
}

/// Resolver that only records the login in the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingIdentityResolver;

#[async_trait]
impl IdentityResolver for LoggingIdentityResolver {
    async fn resolve(
        &self,
        provider: &ProviderConfig,
        user_info: &UserInfo,
    ) -> Result<SignIn, IdentityError> {
        tracing::info!(
            provider_id = provider.id,
            provider_type = %provider.kind,
            email = %user_info.email,
            name = %user_info.name,
            has_invitation = user_info.workspace_invitation_token.is_some(),
            language = user_info.language.as_deref().unwrap_or_default(),
            "User signed in through SSO"
        );

        Ok(SignIn::default())
    }
}

//! OAuth2 / OpenID Connect single sign-on against Google, Facebook, GitHub,
//! GitLab and generic OpenID Connect providers.

pub mod cache;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod frontend;
pub mod jwks;
pub mod login_options;
pub mod provider;
pub mod session;
pub mod store;
pub mod token;
pub mod user_info;

#[cfg(test)]
mod test_support;

pub use discovery::WellKnownUrls;
pub use error::{AuthFlowError, InvalidProviderUrl, ProviderError};
pub use flow::{AuthFlow, CompletedLogin, FlowConfig};
pub use frontend::{FrontendUrlError, FrontendUrls};
pub use jwks::JwksVerifier;
pub use login_options::{LoginOptionItem, LoginOptions};
pub use provider::{NewProvider, ProviderConfig, ProviderKind, ProviderUpdate};
pub use session::{MemorySession, OAuthSessionState, PendingRequest, SessionStore};
pub use store::{MemoryProviderStore, ProviderService, ProviderStore};
pub use user_info::UserInfo;

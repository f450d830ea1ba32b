//! HTTP surface of the SSO service: login redirect, provider callback, login
//! options and the provider admin API.

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod providers;
pub mod router;
pub mod state;
pub mod tracing;

pub use config::ApiConfig;
pub use identity::{IdentityResolver, LoggingIdentityResolver, SignIn};
pub use state::ApiState;

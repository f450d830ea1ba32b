use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Environment;

/// Name of the encrypted cookie holding the in-flight login state.
pub const OAUTH_SESSION_COOKIE: &str = "oauth_session";

/// Attributes shared by the cookies this service sets.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub environment: Environment,
    /// Optional `Domain` attribute, e.g. `.example.com` when the API and the
    /// frontend live on sibling subdomains.
    pub domain: Option<String>,
    pub expiry_minutes: i64,
}

/// Create the login session cookie.
///
/// Cookies are secure (HTTPS-only) outside development. `SameSite=Lax` is
/// required: the provider sends the user back with a top-level cross-site
/// navigation, and `Strict` would drop the cookie on that request.
pub fn create_oauth_session_cookie(value: String, config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((OAUTH_SESSION_COOKIE, value))
        .path("/")
        .max_age(time::Duration::seconds(
            config.expiry_minutes.saturating_mul(60),
        ))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.environment.is_development())
        .build();

    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Cookie to hand to `PrivateCookieJar::remove`. Path and domain must match
/// the ones the session cookie was set with.
pub fn oauth_session_removal_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(OAUTH_SESSION_COOKIE).path("/").build();

    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

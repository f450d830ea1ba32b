//! Login session state carried in the encrypted `oauth_session` cookie.

use anyhow::Context;
use axum_extra::extract::PrivateCookieJar;
use bsso_oauth::MemorySession;

use super::cookies::{
    CookieConfig, OAUTH_SESSION_COOKIE, create_oauth_session_cookie,
    oauth_session_removal_cookie,
};
use crate::error::ApiError;

/// Read the session from the jar. A missing or undecodable cookie yields an
/// empty session.
pub fn load_session(jar: &PrivateCookieJar) -> MemorySession {
    jar.get(OAUTH_SESSION_COOKIE)
        .and_then(|cookie| match serde_json::from_str(cookie.value()) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Ignoring undecodable OAuth session cookie: {e}");
                None
            }
        })
        .unwrap_or_default()
}

/// Write `session` back into the jar.
pub fn store_session(
    jar: PrivateCookieJar,
    session: &MemorySession,
    config: &CookieConfig,
) -> Result<PrivateCookieJar, ApiError> {
    let value = serde_json::to_string(session).context("failed to serialize OAuth session")?;

    Ok(jar.add(create_oauth_session_cookie(value, config)))
}

pub fn clear_session(jar: PrivateCookieJar, config: &CookieConfig) -> PrivateCookieJar {
    jar.remove(oauth_session_removal_cookie(config))
}

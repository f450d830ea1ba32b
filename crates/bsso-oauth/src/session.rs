//! Short-lived login state kept in the user's browser session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AuthFlowError;

pub const OAUTH_STATE_KEY: &str = "oauth_state";
pub const OAUTH_REQUEST_DATA_KEY: &str = "oauth_request_data";

/// String key-value storage scoped to one browser session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn pop(&mut self, key: &str) -> Option<String>;
}

/// In-memory session values.
///
/// Serializable so the HTTP layer can carry it in an encrypted cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemorySession {
    values: BTreeMap<String, String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn pop(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Parameters of the request that started the login, replayed at callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_invitation_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "original", default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
}

pub fn push_request_data(session: &mut impl SessionStore, request: &PendingRequest) {
    match serde_json::to_string(request) {
        Ok(json) => session.set(OAUTH_REQUEST_DATA_KEY, json),
        Err(e) => tracing::warn!("Failed to serialize OAuth request data: {e}"),
    }
}

/// Remove the pending request from the session. Missing or undecodable data
/// yields an empty request.
pub fn pop_request_data(session: &mut impl SessionStore) -> PendingRequest {
    let Some(raw) = session.pop(OAUTH_REQUEST_DATA_KEY) else {
        return PendingRequest::default();
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::debug!("Ignoring undecodable OAuth request data: {e}");
        PendingRequest::default()
    })
}

/// State of one in-flight login: the CSRF token sent to the provider and the
/// request that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSessionState {
    pub csrf_state: String,
    pub pending_request: PendingRequest,
}

impl OAuthSessionState {
    pub fn store(&self, session: &mut impl SessionStore) {
        session.set(OAUTH_STATE_KEY, self.csrf_state.clone());
        push_request_data(session, &self.pending_request);
    }

    /// Consume the login state. Both keys are removed even when the CSRF
    /// state is missing, so a failed callback leaves nothing behind.
    pub fn take(session: &mut impl SessionStore) -> Result<Self, AuthFlowError> {
        let csrf_state = session.pop(OAUTH_STATE_KEY);
        let pending_request = pop_request_data(session);

        let csrf_state = csrf_state
            .filter(|state| !state.is_empty())
            .ok_or(AuthFlowError::MissingState)?;

        Ok(Self {
            csrf_state,
            pending_request,
        })
    }
}

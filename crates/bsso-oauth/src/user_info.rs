//! Identity extraction from provider responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::AuthFlowError, provider::ProviderConfig, session::PendingRequest};

/// Identity of an authenticated user, ready for account lookup or creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub workspace_invitation_token: Option<String>,
    pub language: Option<String>,
}

impl UserInfo {
    /// Combine extracted claims with the request that started the login.
    pub fn new(claims: ClaimIdentity, pending: &PendingRequest) -> Self {
        Self {
            name: claims.name,
            email: claims.email,
            workspace_invitation_token: pending.workspace_invitation_token.clone(),
            language: pending.language.clone(),
        }
    }
}

/// Email and display name read from a provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimIdentity {
    pub email: String,
    pub name: String,
}

/// `"first last"` trimmed, or `email` when both parts are blank.
pub fn display_name(first: &str, last: &str, email: &str) -> String {
    let name = format!("{} {}", first.trim(), last.trim());
    let name = name.trim();

    if name.is_empty() {
        email.to_string()
    } else {
        name.to_string()
    }
}

fn claim_str<'a>(claims: &'a Map<String, Value>, key: &str) -> &'a str {
    if key.is_empty() {
        return "";
    }
    claims.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Read email and name from user-info or ID token claims using the
/// provider's attribute keys.
pub fn extract_identity(
    provider: &ProviderConfig,
    claims: &Map<String, Value>,
) -> Result<ClaimIdentity, AuthFlowError> {
    let email = claim_str(claims, &provider.email_attr_key).trim();
    if email.is_empty() {
        tracing::error!(
            provider_id = provider.id,
            email_attr_key = %provider.email_attr_key,
            "Provider response has no email"
        );
        return Err(AuthFlowError::MissingEmail);
    }

    let first = claim_str(claims, &provider.first_name_attr_key);
    let last = claim_str(claims, &provider.last_name_attr_key);

    Ok(ClaimIdentity {
        email: email.to_string(),
        name: display_name(first, last, email),
    })
}

/// Pick the address to use from GitHub's `/user/emails` response: the first
/// entry flagged primary (or given as a bare string), else the first entry.
pub fn select_github_email(emails: &[Value]) -> Option<String> {
    let chosen = emails
        .iter()
        .find(|entry| {
            !entry.is_object()
                || entry
                    .get("primary")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
        })
        .or_else(|| emails.first())?;

    let email = match chosen {
        Value::String(email) => Some(email.clone()),
        Value::Object(entry) => entry
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    email.filter(|email| !email.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    fn oidc_provider() -> ProviderConfig {
        ProviderConfig::new(
            ProviderKind::OpenIdConnect,
            "OIDC",
            "c",
            "s",
            Some("https://id.example.com".to_string()),
        )
        .expect("oidc provider")
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("", "", "a@b.c"), "a@b.c");
        assert_eq!(display_name("  ", "", "a@b.c"), "a@b.c");
        assert_eq!(display_name(" Ada ", "", "a@b.c"), "Ada");
        assert_eq!(display_name("", "Lovelace", "a@b.c"), "Lovelace");
        assert_eq!(display_name("Ada", "Lovelace", "a@b.c"), "Ada Lovelace");
    }

    #[test]
    fn test_extract_identity_default_keys() {
        let provider = oidc_provider();
        let identity = extract_identity(
            &provider,
            &claims(json!({"email": "test@example.com", "name": "Test User"})),
        )
        .expect("identity");

        assert_eq!(identity.email, "test@example.com");
        assert_eq!(identity.name, "Test User");
    }

    #[test]
    fn test_extract_identity_custom_keys() {
        let mut provider = oidc_provider();
        provider.email_attr_key = "mail".to_string();
        provider.first_name_attr_key = "given_name".to_string();
        provider.last_name_attr_key = "family_name".to_string();

        let identity = extract_identity(
            &provider,
            &claims(json!({
                "mail": "ada@example.com",
                "given_name": "Ada",
                "family_name": "Lovelace",
                "name": "ignored"
            })),
        )
        .expect("identity");

        assert_eq!(identity.name, "Ada Lovelace");
    }

    #[test]
    fn test_extract_identity_falls_back_to_email() {
        let provider = oidc_provider();
        let identity = extract_identity(
            &provider,
            &claims(json!({"email": "test@example.com", "name": "   ", "picture": 1})),
        )
        .expect("identity");

        assert_eq!(identity.name, "test@example.com");
    }

    #[test]
    fn test_extract_identity_requires_email() {
        let provider = oidc_provider();
        let result = extract_identity(&provider, &claims(json!({"name": "Nobody"})));

        assert!(matches!(result, Err(AuthFlowError::MissingEmail)));
    }

    #[test]
    fn test_select_github_email_prefers_primary() {
        let emails = [
            json!({"email": "secondary@example.com", "primary": false, "verified": true}),
            json!({"email": "primary@example.com", "primary": true, "verified": true}),
        ];
        assert_eq!(
            select_github_email(&emails).as_deref(),
            Some("primary@example.com")
        );
    }

    #[test]
    fn test_select_github_email_falls_back_to_first() {
        let emails = [
            json!({"email": "first@example.com", "primary": false}),
            json!({"email": "second@example.com"}),
        ];
        assert_eq!(
            select_github_email(&emails).as_deref(),
            Some("first@example.com")
        );
        assert_eq!(select_github_email(&[]), None);
    }

    #[test]
    fn test_select_github_email_accepts_plain_strings() {
        let emails = [json!("plain@example.com")];
        assert_eq!(
            select_github_email(&emails).as_deref(),
            Some("plain@example.com")
        );
    }

    #[test]
    fn test_user_info_takes_pending_request() {
        let pending = PendingRequest {
            workspace_invitation_token: Some("invite".to_string()),
            language: Some("fr".to_string()),
            original_url: None,
        };
        let info = UserInfo::new(
            ClaimIdentity {
                email: "a@b.c".to_string(),
                name: "A".to_string(),
            },
            &pending,
        );

        assert_eq!(info.workspace_invitation_token.as_deref(), Some("invite"));
        assert_eq!(info.language.as_deref(), Some("fr"));
    }
}

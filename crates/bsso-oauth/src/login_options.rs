use serde::Serialize;

use crate::provider::{ProviderConfig, ProviderKind, login_url};

/// One provider button on the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOptionItem {
    pub redirect_url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
}

/// Login entries of one provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOptions {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub items: Vec<LoginOptionItem>,
    /// Set when exactly one provider of the type is enabled, so the frontend
    /// can redirect without showing a choice.
    pub default_redirect_url: Option<String>,
}

/// Build the login options of `kind` from `providers`, skipping disabled ones
/// and those of another type. `None` when nothing is left.
pub fn login_options(
    kind: ProviderKind,
    providers: &[ProviderConfig],
    public_backend_url: &str,
) -> Option<LoginOptions> {
    let items: Vec<LoginOptionItem> = providers
        .iter()
        .filter(|provider| provider.enabled && provider.kind == kind)
        .map(|provider| LoginOptionItem {
            redirect_url: login_url(public_backend_url, provider.id),
            name: provider.name.clone(),
            kind,
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    let default_redirect_url = match items.as_slice() {
        [only] => Some(only.redirect_url.clone()),
        _ => None,
    };

    Some(LoginOptions {
        kind,
        items,
        default_redirect_url,
    })
}

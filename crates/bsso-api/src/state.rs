use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use bsso_oauth::{AuthFlow, FrontendUrls, ProviderService, ProviderStore};

use crate::{
    ApiConfig,
    auth::cookies::CookieConfig,
    config::Environment,
    identity::IdentityResolver,
};

#[derive(Clone)]
pub struct ApiState {
    pub providers: ProviderService,
    pub flow: AuthFlow,
    pub frontend_urls: FrontendUrls,
    pub cookie_key: Key,
    pub cookie_config: CookieConfig,
    pub admin_token: Option<String>,
    pub identity: Arc<dyn IdentityResolver>,
    pub environment: Environment,
}

impl ApiState {
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn ProviderStore>,
        identity: Arc<dyn IdentityResolver>,
    ) -> anyhow::Result<Self> {
        let cookie_key = Key::try_from(config.cookie_secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid COOKIE_SECRET: {e:?}"))?;

        let flow = AuthFlow::new(&config.flow_config())?;
        let providers = ProviderService::new(store, flow.http().clone())
            .with_discovery_timeout(config.discovery_timeout());

        Ok(Self {
            providers,
            flow,
            frontend_urls: config.parsed_frontend_urls()?,
            cookie_key,
            cookie_config: CookieConfig {
                environment: config.env,
                domain: config.cookie_domain.clone(),
                expiry_minutes: config.oauth_session_expiry_minutes,
            },
            admin_token: config.admin_token.clone().filter(|token| !token.is_empty()),
            identity,
            environment: config.env,
        })
    }
}

impl FromRef<ApiState> for Key {
    fn from_ref(state: &ApiState) -> Self {
        state.cookie_key.clone()
    }
}

//! Validation of post-login redirect targets.

use oauth2::url::Url;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrontendUrlError {
    #[error("At least one frontend URL must be configured")]
    Empty,
    #[error("Invalid frontend URL '{0}'")]
    Invalid(String),
}

/// Frontend URLs the service may redirect users to. The first one is the
/// default target.
#[derive(Debug, Clone)]
pub struct FrontendUrls {
    urls: Vec<Url>,
}

impl FrontendUrls {
    pub fn parse<S: AsRef<str>>(urls: &[S]) -> Result<Self, FrontendUrlError> {
        let urls = urls
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| Url::parse(url).map_err(|_| FrontendUrlError::Invalid(url.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        if urls.is_empty() {
            return Err(FrontendUrlError::Empty);
        }

        Ok(Self { urls })
    }

    pub fn default_url(&self) -> &Url {
        &self.urls[0]
    }

    /// Resolve where to send the user.
    ///
    /// `requested` is kept when it has the scheme, host and port of one of the
    /// configured URLs and, unless `allow_any_path` is set, lives below that
    /// URL's path. A bare origin resolves to the matching configured URL.
    /// Anything else falls back to the default URL. `query_params` are
    /// appended to the result.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        query_params: &[(&str, &str)],
        allow_any_path: bool,
    ) -> String {
        let mut target = requested
            .and_then(|requested| Url::parse(requested).ok())
            .and_then(|requested| self.match_configured(requested, allow_any_path))
            .unwrap_or_else(|| self.default_url().clone());

        if !query_params.is_empty() {
            target.query_pairs_mut().extend_pairs(query_params);
        }

        target.to_string()
    }

    fn match_configured(&self, requested: Url, allow_any_path: bool) -> Option<Url> {
        for configured in &self.urls {
            if configured.scheme() != requested.scheme()
                || configured.host_str() != requested.host_str()
                || configured.port_or_known_default() != requested.port_or_known_default()
            {
                continue;
            }

            if matches!(requested.path(), "" | "/") {
                return Some(configured.clone());
            }
            if allow_any_path || path_is_within(requested.path(), configured.path()) {
                return Some(requested);
            }
        }
        None
    }
}

/// Whether `path` equals `base` or lies below it, segment-wise: `/toto/x`
/// is within `/toto`, `/totoevil` is not.
fn path_is_within(path: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    base.is_empty()
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::Method;
use sync_core::CookieJar;
use sync_logging::{sync_debug, sync_warn};

use crate::{FetchError, FetchFailureKind, FetchRequest, FetchResult, SiteSettings};

#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

/// reqwest-backed access to the external site.
///
/// Holds two clients: `pages` follows redirects like a browser would, while
/// `login` never does, because a 3xx is the success signal of a login POST.
#[derive(Debug, Clone)]
pub struct SiteClient {
    settings: SiteSettings,
    pub(crate) pages: reqwest::Client,
    pub(crate) login: reqwest::Client,
}

impl SiteClient {
    pub fn new(settings: SiteSettings) -> Result<Self, FetchError> {
        let pages = build_client(&settings, reqwest::redirect::Policy::limited(5))?;
        let login = build_client(&settings, reqwest::redirect::Policy::none())?;
        Ok(Self {
            settings,
            pages,
            login,
        })
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }
}

fn build_client(
    settings: &SiteSettings,
    policy: reqwest::redirect::Policy,
) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.as_str())
        .redirect(policy)
        .build()
        .map_err(|err| FetchError::new(FetchFailureKind::Client, err.to_string()))
}

#[async_trait::async_trait]
impl ContentFetcher for SiteClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let url = self
            .settings
            .resolve(&request.target)
            .map_err(|err| FetchError::new(FetchFailureKind::InvalidUrl, err.to_string()))?;
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                FetchError::new(
                    FetchFailureKind::InvalidMethod,
                    format!("Unsupported method: {}", request.method),
                )
            })?;

        sync_debug!("fetch {} {}", method, url.path());
        let mut builder = self.pages.request(method, url);
        if let Some(cookies) = request.cookies.as_deref() {
            builder = builder.header(COOKIE, cookies);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let cookies = CookieJar::from_set_cookies(set_cookie_values(response.headers())).to_header();
        let html = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            sync_warn!("fetch {} returned status {}", request.target, status.as_u16());
        }
        Ok(FetchResult::new(status, html, cookies))
    }
}

pub(crate) fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .collect()
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FetchFailureKind::Timeout, err.to_string());
    }
    FetchError::new(FetchFailureKind::Network, err.to_string())
}

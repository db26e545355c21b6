use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://agirlandyourdog.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; DogBoardingSync/2.0)";

/// Where the external site lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub base_url: Url,
    pub login_path: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Treat a login redirect that points back at the login page as a
    /// failure. Off by default: any 3xx counts as success.
    pub reject_login_redirects: bool,
}

impl SiteSettings {
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/login".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            reject_login_redirects: false,
        }
    }

    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(&self.login_path)
    }

    /// Absolute inputs are used as-is, anything else is joined onto the base.
    pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
        if target.starts_with("http") {
            Url::parse(target)
        } else {
            self.base_url.join(target)
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self::for_base_url(Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"))
    }
}

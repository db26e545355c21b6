use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, LOCATION};
use sync_core::{
    build_login_submission, encode_form, extract_csrf_token, extract_form_fields, CookieJar,
    Credentials,
};
use sync_logging::{sync_debug, sync_info, sync_warn};
use url::Url;

use crate::fetch::set_cookie_values;
use crate::{AuthFailure, AuthFailureKind, AuthSession, AuthStage, SiteClient};

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession, AuthFailure>;
}

#[async_trait::async_trait]
impl Authenticator for SiteClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession, AuthFailure> {
        let result = self.login_flow(credentials).await;
        match &result {
            Ok(_) => sync_info!("auth stage={}", AuthStage::Authenticated),
            Err(failure) => sync_warn!(
                "auth stage={} category={} message={}",
                AuthStage::Failed,
                failure.category,
                failure.message
            ),
        }
        result
    }
}

impl SiteClient {
    async fn login_flow(&self, credentials: &Credentials) -> Result<AuthSession, AuthFailure> {
        if !credentials.is_complete() {
            return Err(AuthFailure::new(
                AuthFailureKind::MissingCredentials,
                "Username and password are required",
            ));
        }
        let login_url = self
            .settings()
            .login_url()
            .map_err(|err| AuthFailure::new(AuthFailureKind::InvalidUrl, err.to_string()))?;

        sync_debug!("auth stage={}", AuthStage::FetchingLoginPage);
        let page = self
            .pages
            .get(login_url.clone())
            .send()
            .await
            .map_err(transport_failure)?;
        let status = page.status();
        if !status.is_success() {
            return Err(AuthFailure::new(
                AuthFailureKind::LoginPageUnavailable {
                    status: status.as_u16(),
                },
                format!("Failed to load login page: {}", status.as_u16()),
            ));
        }

        let mut jar = CookieJar::from_set_cookies(set_cookie_values(page.headers()));
        let html = page.text().await.map_err(transport_failure)?;
        let fields = extract_form_fields(&html);
        let token = extract_csrf_token(&html);
        let body = encode_form(&build_login_submission(
            &fields,
            token.as_deref(),
            credentials,
        ));
        sync_debug!(
            "login page: {} form fields, {} cookies",
            fields.len(),
            jar.len()
        );

        sync_debug!("auth stage={}", AuthStage::SubmittingCredentials);
        let mut submit = self
            .login
            .post(login_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        if !jar.is_empty() {
            submit = submit.header(COOKIE, jar.to_header());
        }
        let response = submit.send().await.map_err(transport_failure)?;
        let status = response.status();

        if status.is_redirection() {
            if self.settings().reject_login_redirects
                && redirects_to(&login_url, response.headers())
            {
                return Err(AuthFailure::new(
                    AuthFailureKind::RedirectedToLogin,
                    "Login redirected back to the login page",
                ));
            }
            jar.merge(&CookieJar::from_set_cookies(set_cookie_values(
                response.headers(),
            )));
            return Ok(AuthSession {
                cookies: jar.to_header(),
            });
        }

        let text = response.text().await.map_err(transport_failure)?;
        if text.contains("invalid") || text.contains("incorrect") {
            return Err(AuthFailure::new(
                AuthFailureKind::InvalidCredentials,
                "Invalid credentials",
            ));
        }
        Err(AuthFailure::new(
            AuthFailureKind::LoginRejected {
                status: status.as_u16(),
            },
            format!("Login failed with status {}", status.as_u16()),
        ))
    }
}

fn redirects_to(login_url: &Url, headers: &HeaderMap) -> bool {
    headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| login_url.join(location).ok())
        .is_some_and(|target| target.path() == login_url.path())
}

fn transport_failure(err: reqwest::Error) -> AuthFailure {
    let kind = if err.is_timeout() {
        AuthFailureKind::Timeout
    } else {
        AuthFailureKind::Network
    };
    AuthFailure::new(kind, format!("Authentication error: {err}"))
}

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use sync_core::ErrorCategory;

/// Serialized `Cookie` header of a logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub cookies: String,
}

/// Steps of one login attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    FetchingLoginPage,
    SubmittingCredentials,
    Authenticated,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailureKind {
    MissingCredentials,
    InvalidUrl,
    LoginPageUnavailable { status: u16 },
    InvalidCredentials,
    LoginRejected { status: u16 },
    RedirectedToLogin,
    Timeout,
    Network,
}

impl AuthFailureKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LoginPageUnavailable { .. } | Self::Network => ErrorCategory::NetworkError,
            Self::Timeout => ErrorCategory::Timeout,
            Self::InvalidUrl => ErrorCategory::Unknown,
            Self::MissingCredentials
            | Self::InvalidCredentials
            | Self::LoginRejected { .. }
            | Self::RedirectedToLogin => ErrorCategory::AuthError,
        }
    }
}

/// A failed login. `message` is already sanitized and safe to return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: AuthFailureKind,
    pub category: ErrorCategory,
    pub message: String,
}

impl AuthFailure {
    pub(crate) fn new(kind: AuthFailureKind, message: impl Into<String>) -> Self {
        Self {
            category: kind.category(),
            kind,
            message: sync_core::sanitize_error(&message.into()),
        }
    }
}

/// One request against the external site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub target: String,
    pub method: String,
    pub cookies: Option<String>,
}

impl FetchRequest {
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: "GET".to_string(),
            cookies: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        let cookies = cookies.into();
        self.cookies = (!cookies.is_empty()).then_some(cookies);
        self
    }
}

/// Raw page as the site returned it. A non-2xx status is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub success: bool,
    pub status: u16,
    pub html: String,
    /// `Set-Cookie` values of this response only, serialized as a `Cookie` header.
    pub cookies: String,
}

impl FetchResult {
    pub(crate) fn new(status: StatusCode, html: String, cookies: String) -> Self {
        Self {
            success: status.is_success(),
            status: status.as_u16(),
            html,
            cookies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailureKind {
    InvalidUrl,
    InvalidMethod,
    Client,
    Timeout,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchFailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: sync_core::sanitize_error(&message.into()),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind {
            FetchFailureKind::Timeout => ErrorCategory::Timeout,
            FetchFailureKind::Network | FetchFailureKind::Client => ErrorCategory::NetworkError,
            FetchFailureKind::InvalidUrl | FetchFailureKind::InvalidMethod => {
                ErrorCategory::Unknown
            }
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthStage::FetchingLoginPage => "fetching login page",
            AuthStage::SubmittingCredentials => "submitting credentials",
            AuthStage::Authenticated => "authenticated",
            AuthStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

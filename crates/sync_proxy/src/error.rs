use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sync_core::{sanitize_error, ErrorCategory};
use sync_engine::{AuthFailure, AuthFailureKind, FetchError};

/// Everything a proxy request can fail with. The rendered body always goes
/// through the sanitizer.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("URL is required")]
    MissingUrl,
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("{0}")]
    Auth(#[from] AuthFailure),
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("Invalid request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
            Self::Auth(failure) => match failure.kind {
                AuthFailureKind::MissingCredentials => StatusCode::BAD_REQUEST,
                AuthFailureKind::LoginPageUnavailable { .. } => StatusCode::BAD_GATEWAY,
                AuthFailureKind::InvalidCredentials
                | AuthFailureKind::LoginRejected { .. }
                | AuthFailureKind::RedirectedToLogin => StatusCode::UNAUTHORIZED,
                AuthFailureKind::InvalidUrl
                | AuthFailureKind::Timeout
                | AuthFailureKind::Network => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Fetch(_) | Self::MalformedBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(failure) => failure.category,
            Self::Fetch(err) => err.category(),
            Self::MalformedBody(_) => ErrorCategory::ParseError,
            Self::MissingUrl | Self::UnknownAction(_) => ErrorCategory::Unknown,
        }
    }

    pub fn public_message(&self) -> String {
        sanitize_error(&self.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.public_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

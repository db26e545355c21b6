//! Sync core: pure helpers for talking to the external booking site.
//!
//! Nothing in here performs IO. Cookie handling, login-form scraping, error
//! classification and redaction are plain functions over strings so the
//! engine and the proxy can share them.
mod categorize;
mod cookie;
mod credentials;
mod form;
mod sanitize;

pub use categorize::{analyze_errors, categorize, ErrorCategory, SyncBatchSummary};
pub use cookie::CookieJar;
pub use credentials::Credentials;
pub use form::{
    build_login_submission, encode_form, extract_csrf_token, extract_form_fields, FieldType,
    FormField, FormFields, CSRF_FIELD,
};
pub use sanitize::sanitize_error;

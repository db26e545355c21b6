//! Sync engine: network side of the external-site pipeline.
mod auth;
mod fetch;
mod schedule;
mod settings;
mod types;

pub use auth::Authenticator;
pub use fetch::{ContentFetcher, SiteClient};
pub use schedule::{
    filter_boarding, looks_like_login_page, parse_next_page, parse_schedule_page, schedule_path,
    AppointmentLink, ScheduleError, SchedulePage, ScheduleWalker, WalkSettings,
};
pub use settings::{SiteSettings, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use types::{
    AuthFailure, AuthFailureKind, AuthSession, AuthStage, FetchError, FetchFailureKind,
    FetchRequest, FetchResult,
};

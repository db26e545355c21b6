//! Sync proxy: HTTP front end for the external-site sync engine.
pub mod config;
mod error;
pub mod logging;
mod server;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use server::{router, serve, AppState, ExternalSite};

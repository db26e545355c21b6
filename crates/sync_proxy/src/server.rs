//! The same-origin proxy: `POST /api/sync-proxy` and `GET /api/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sync_core::Credentials;
use sync_engine::{Authenticator, ContentFetcher, FetchRequest};
use sync_logging::{sync_error, sync_info, sync_warn, EventSink, SyncLogRecord};

use crate::error::ProxyError;

/// What the proxy needs from the external site.
pub trait ExternalSite: Authenticator + ContentFetcher {}

impl<T: Authenticator + ContentFetcher> ExternalSite for T {}

#[derive(Clone)]
pub struct AppState {
    site: Arc<dyn ExternalSite>,
    events: Arc<EventSink>,
    site_host: Arc<str>,
}

impl AppState {
    pub fn new(site: Arc<dyn ExternalSite>, events: Arc<EventSink>, site_host: &str) -> Self {
        Self {
            site,
            events,
            site_host: Arc::from(site_host),
        }
    }
}

/// Body of `POST /api/sync-proxy`. Every field is optional on the wire;
/// each action checks what it needs.
#[derive(Debug, Default, Deserialize)]
struct ProxyRequest {
    action: Option<String>,
    username: Option<String>,
    password: Option<String>,
    url: Option<String>,
    cookies: Option<String>,
    method: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/sync-proxy",
            post(sync_proxy).fallback(method_not_allowed),
        )
        .route("/api/health", get(health))
        .with_state(state)
}

/// Serves until Ctrl-C, then drains queued event records.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let events = state.events.clone();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    sync_info!("sync proxy listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sync_info!("sync proxy stopped");
    match Arc::try_unwrap(events) {
        Ok(events) => events.shutdown(),
        Err(_) => sync_warn!("event log still referenced at shutdown, flushing when released"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        sync_warn!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn sync_proxy(State(state): State<AppState>, body: Bytes) -> Response {
    let outcome = match serde_json::from_slice::<ProxyRequest>(&body) {
        Ok(request) => dispatch(&state, request).await,
        Err(err) => Err(ProxyError::from(err)),
    };

    match outcome {
        Ok(response) => response,
        Err(err) => {
            let message = err.public_message();
            if err.status().is_server_error() {
                sync_error!(
                    "proxy request failed status={} category={} error={}",
                    err.status().as_u16(),
                    err.category(),
                    message
                );
            } else {
                sync_warn!(
                    "proxy request rejected status={} error={}",
                    err.status().as_u16(),
                    message
                );
            }
            state.events.record(
                SyncLogRecord::new("error", "proxy", message).with_context(json!({
                    "status": err.status().as_u16(),
                    "category": err.category(),
                })),
            );
            err.into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: ProxyRequest) -> Result<Response, ProxyError> {
    let action = request.action.clone().unwrap_or_default();
    sync_info!("proxy action={}", action);
    match action.as_str() {
        "authenticate" => authenticate(state, request).await,
        "fetch" => fetch(state, request).await,
        _ => Err(ProxyError::UnknownAction(action)),
    }
}

async fn authenticate(state: &AppState, request: ProxyRequest) -> Result<Response, ProxyError> {
    let credentials = Credentials::new(
        request.username.unwrap_or_default(),
        request.password.unwrap_or_default(),
    );
    let session = state.site.authenticate(&credentials).await?;
    state.events.info("proxy", "authenticate succeeded");
    Ok(Json(json!({ "success": true, "cookies": session.cookies })).into_response())
}

async fn fetch(state: &AppState, request: ProxyRequest) -> Result<Response, ProxyError> {
    let target = request
        .url
        .filter(|url| !url.is_empty())
        .ok_or(ProxyError::MissingUrl)?;
    let mut fetch_request = FetchRequest::get(target);
    if let Some(method) = request.method.filter(|m| !m.is_empty()) {
        fetch_request = fetch_request.with_method(method);
    }
    if let Some(cookies) = request.cookies {
        fetch_request = fetch_request.with_cookies(cookies);
    }

    let result = state.site.fetch(&fetch_request).await?;
    state.events.record(
        SyncLogRecord::new("info", "proxy", "fetch completed")
            .with_context(json!({ "status": result.status, "bytes": result.html.len() })),
    );
    Ok(Json(result).into_response())
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "external_site": &*state.site_host,
    }))
}

use std::sync::Arc;

use anyhow::Context;
use sync_engine::SiteClient;
use sync_logging::{sync_info, EventSink};
use sync_proxy::config::config_path;
use sync_proxy::{logging, serve, AppState, ProxyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file = config_path(|key| std::env::var(key).ok());
    let config = ProxyConfig::load()?;
    logging::initialize(
        config.log_destination,
        config.level_filter()?,
        &config.log_file,
    );
    if config_file.exists() {
        sync_info!("Loaded config from {:?}", config_file);
    } else {
        sync_info!("No config at {:?}, using defaults", config_file);
    }

    let settings = config.site_settings()?;
    let site_host = settings.base_url.host_str().unwrap_or_default().to_string();
    sync_info!("external site: {}", site_host);
    let site = SiteClient::new(settings).context("failed to build HTTP client")?;

    let events = match &config.event_log {
        Some(path) => EventSink::to_file(path),
        None => EventSink::disabled(),
    };

    let state = AppState::new(Arc::new(site), Arc::new(events), &site_host);
    serve(config.bind, state).await
}

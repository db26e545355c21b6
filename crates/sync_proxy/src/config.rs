use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use sync_engine::{SiteSettings, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use url::Url;

use crate::logging::LogDestination;

pub const CONFIG_PATH_VAR: &str = "SYNC_PROXY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "sync_proxy.ron";

/// Config file location: `SYNC_PROXY_CONFIG` or [`DEFAULT_CONFIG_PATH`].
pub fn config_path(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(env(CONFIG_PATH_VAR).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()))
}

/// Startup configuration, read from RON and then overridden from the
/// environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub external_site_url: String,
    pub login_path: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub reject_login_redirects: bool,
    pub event_log: Option<PathBuf>,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            external_site_url: DEFAULT_BASE_URL.to_string(),
            login_path: "/login".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            reject_login_redirects: false,
            event_log: None,
            log_destination: LogDestination::Terminal,
            log_file: PathBuf::from("./sync_proxy.log"),
            log_level: "info".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Loads from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Loads using `env` as the variable source.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let path = config_path(&env);
        let mut config = Self::from_file(&path)?;
        config.apply_env(env)?;
        Ok(config)
    }

    /// Reads a RON file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {path:?}"));
            }
        };
        ron::from_str(&text).with_context(|| format!("failed to parse config {path:?}"))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(bind) = env("SYNC_PROXY_BIND") {
            self.bind = bind
                .parse()
                .with_context(|| format!("SYNC_PROXY_BIND is not a socket address: {bind}"))?;
        }
        if let Some(url) = env("EXTERNAL_SITE_URL") {
            self.external_site_url = url;
        }
        if let Some(path) = env("SYNC_PROXY_EVENT_LOG") {
            self.event_log = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> anyhow::Result<LevelFilter> {
        self.log_level
            .parse()
            .with_context(|| format!("unknown log level {:?}", self.log_level))
    }

    pub fn site_settings(&self) -> anyhow::Result<SiteSettings> {
        let base_url = Url::parse(&self.external_site_url)
            .with_context(|| format!("invalid external site url {:?}", self.external_site_url))?;
        Ok(SiteSettings {
            login_path: self.login_path.clone(),
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            reject_login_redirects: self.reject_login_redirects,
            ..SiteSettings::for_base_url(base_url)
        })
    }
}

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use sync_proxy::logging::LogDestination;
use sync_proxy::ProxyConfig;

fn env_from(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.ron");
    let config = ProxyConfig::from_file(&path).unwrap();
    assert_eq!(config, ProxyConfig::default());
}

#[test]
fn ron_file_is_read_and_env_overrides_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proxy.ron");
    std::fs::write(
        &path,
        r#"(
            bind: "0.0.0.0:8080",
            external_site_url: "https://staging.example",
            reject_login_redirects: true,
            log_destination: Both,
            log_level: "debug",
        )"#,
    )
    .unwrap();

    let config = ProxyConfig::load_with(env_from(&[
        ("SYNC_PROXY_CONFIG", path.display().to_string()),
        ("EXTERNAL_SITE_URL", "http://127.0.0.1:4000".to_string()),
        ("SYNC_PROXY_EVENT_LOG", "/tmp/events.jsonl".to_string()),
    ]))
    .unwrap();

    assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    assert_eq!(config.external_site_url, "http://127.0.0.1:4000");
    assert_eq!(config.event_log, Some(PathBuf::from("/tmp/events.jsonl")));
    assert_eq!(config.log_destination, LogDestination::Both);
    assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Debug);

    let settings = config.site_settings().unwrap();
    assert!(settings.reject_login_redirects);
    assert_eq!(settings.login_url().unwrap().as_str(), "http://127.0.0.1:4000/login");
}

#[test]
fn bad_bind_override_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ProxyConfig::load_with(env_from(&[
        (
            "SYNC_PROXY_CONFIG",
            dir.path().join("none.ron").display().to_string(),
        ),
        ("SYNC_PROXY_BIND", "not-an-address".to_string()),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("SYNC_PROXY_BIND"));
}

#[test]
fn malformed_ron_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(bind: 42").unwrap();
    assert!(ProxyConfig::from_file(&path).is_err());
}

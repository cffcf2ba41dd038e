//! Common test utilities and fixtures

#![allow(dead_code)]

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use taskfabric::config::FabricConfig;
use taskfabric::protocol::Framing;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Loopback config with the task source off and a short reconnect interval
pub fn loopback_config(framing: Framing) -> FabricConfig {
    let mut config = FabricConfig::default();
    config.coordinator.listen_addr = "127.0.0.1:0".to_string();
    config.worker.listen_addr = "127.0.0.1:0".to_string();
    config.connection.reconnect_interval_ms = 100;
    config.connection.framing = framing;
    config.task_source.enabled = false;
    config
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

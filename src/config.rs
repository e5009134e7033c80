use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Runtime settings, read from `DUBVIEW_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// CORS-bypass relay; the encoded target URL is appended verbatim.
    #[serde(default = "default_proxy_endpoint")]
    pub proxy_endpoint: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Total attempts per fetch, including the first one.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Maximum number of entries kept in the watch history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How often the playback position is saved while a video plays.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,

    /// External player binary. Must speak mpv's JSON IPC protocol.
    #[serde(default = "default_player_bin")]
    pub player_bin: String,
}

fn default_proxy_endpoint() -> String {
    "https://api.codetabs.com/v1/proxy/?quest=".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_read_timeout_secs() -> u64 {
    20
}
fn default_fetch_attempts() -> usize {
    3
}
fn default_retry_delay_ms() -> u64 {
    750
}
fn default_history_limit() -> usize {
    20
}
fn default_save_interval_secs() -> u64 {
    5
}
fn default_seek_step_secs() -> f64 {
    60.0
}
fn default_player_bin() -> String {
    "mpv".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: default_proxy_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            history_limit: default_history_limit(),
            save_interval_secs: default_save_interval_secs(),
            seek_step_secs: default_seek_step_secs(),
            player_bin: default_player_bin(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is the common case.
        let _ = dotenvy::dotenv();

        envy::prefixed("DUBVIEW_")
            .from_env::<AppConfig>()
            .context("failed to load config from environment")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs.max(1))
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "chatsync.toml",
    "config/chatsync.toml",
    "crates/config/chatsync.toml",
    "../chatsync.toml",
    "../config/chatsync.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where the authoritative REST source lives and how long to wait for it.
///
/// ```
/// use chatsync_config::ApiConfig;
///
/// let api = ApiConfig::default();
/// assert_eq!(api.base_url, "http://127.0.0.1:5000");
/// assert_eq!(api.request_timeout_seconds, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:5000".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Tuning for the synchronizer actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a typing indicator stays up without a refresh.
    #[serde(default = "SyncConfig::default_typing_window")]
    pub typing_window_ms: u64,
    /// Per-chat window of recently seen message ids used for dedupe.
    #[serde(default = "SyncConfig::default_recent_message_ids")]
    pub recent_message_ids: usize,
    #[serde(default = "SyncConfig::default_command_buffer")]
    pub command_buffer: usize,
    #[serde(default = "SyncConfig::default_notice_buffer")]
    pub notice_buffer: usize,
}

impl SyncConfig {
    const fn default_typing_window() -> u64 {
        2_000
    }

    const fn default_recent_message_ids() -> usize {
        256
    }

    const fn default_command_buffer() -> usize {
        64
    }

    const fn default_notice_buffer() -> usize {
        32
    }

    pub fn typing_window(&self) -> Duration {
        Duration::from_millis(self.typing_window_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            typing_window_ms: Self::default_typing_window(),
            recent_message_ids: Self::default_recent_message_ids(),
            command_buffer: Self::default_command_buffer(),
            notice_buffer: Self::default_notice_buffer(),
        }
    }
}

fn as_config_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use chatsync_config::load;
///
/// std::env::remove_var("CHATSYNC_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.api.base_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("api.base_url", defaults.api.base_url.clone())?
        .set_default(
            "api.request_timeout_seconds",
            as_config_int(defaults.api.request_timeout_seconds),
        )?
        .set_default(
            "sync.typing_window_ms",
            as_config_int(defaults.sync.typing_window_ms),
        )?
        .set_default(
            "sync.recent_message_ids",
            as_config_int(defaults.sync.recent_message_ids as u64),
        )?
        .set_default(
            "sync.command_buffer",
            as_config_int(defaults.sync.command_buffer as u64),
        )?
        .set_default(
            "sync.notice_buffer",
            as_config_int(defaults.sync.notice_buffer as u64),
        )?;

    let environment_overrides = config::Environment::with_prefix("CHATSYNC").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CHATSYNC_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CHATSYNC_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    // A zero-sized buffer would make the actor channels panic on construction.
    config.sync.command_buffer = config.sync.command_buffer.max(1);
    config.sync.notice_buffer = config.sync.notice_buffer.max(1);
    config.sync.recent_message_ids = config.sync.recent_message_ids.max(1);

    debug!(?config, "loaded chatsync configuration");
    Ok(config)
}

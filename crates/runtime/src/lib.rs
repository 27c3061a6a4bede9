//! Process-level wiring for chatsync: tracing setup, configuration-driven
//! bootstrap and the [`SyncHandle`] actor that owns the conversation state.

mod synchronizer;

use std::sync::Arc;

use anyhow::{Context, Result};
use chatsync_config::AppConfig;
use chatsync_gateway::{EventChannel, HttpChatApi};
use tracing::info;

pub use synchronizer::{SyncHandle, SyncNotice, SyncOperation};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Build the HTTP client from configuration and connect a synchronizer
/// over `channel`.
///
/// `token` is the bearer token obtained by the embedder's login flow.
pub async fn connect(
    config: &AppConfig,
    token: Option<String>,
    channel: Arc<dyn EventChannel>,
) -> Result<SyncHandle> {
    let mut api = HttpChatApi::new(&config.api).context("failed to build http client")?;
    if let Some(token) = token {
        api = api.with_token(token);
    }
    info!(base_url = api.base_url(), "connecting synchronizer");

    SyncHandle::connect(Arc::new(api), channel, &config.sync)
        .await
        .context("failed to connect synchronizer")
}

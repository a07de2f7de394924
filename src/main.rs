mod bot;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use fx_signal_bot::broker::MetaApiClient;
use fx_signal_bot::config::Config;
use fx_signal_bot::dispatch::{LogMessenger, SignalDispatcher};
use fx_signal_bot::news::{ForexFactoryCalendar, JsonHeadlineFeed};
use fx_signal_bot::store::MemoryUserStore;

use crate::bot::{SignalBot, SignalRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let broker = Arc::new(MetaApiClient::new(&cfg));
    let store = Arc::new(MemoryUserStore::new());
    let calendar = Arc::new(ForexFactoryCalendar::new(&cfg));
    let headlines = Arc::new(JsonHeadlineFeed::new(&cfg));
    let dispatcher = SignalDispatcher::new(Arc::new(LogMessenger), None);

    // The chat integration feeds requests through this sender
    let (_request_tx, request_rx) = mpsc::channel::<SignalRequest>(64);

    let mut bot = SignalBot::new(cfg.shared(), broker, store, dispatcher, calendar, headlines).await;
    bot.run(request_rx).await?;

    Ok(())
}

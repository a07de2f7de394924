use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::broker::{Broker, OrderRequest, OrderResult};
use crate::core::risk::{size_lots, RiskTier};
use crate::models::{Direction, Signal, Timeframe};

pub const SLOGAN: &str = "PATIENCE ✰ DISCIPLINE ✰ RISK MANAGEMENT";
const DISCLAIMER: &str = "Disclaimer: Trade at your own risk. Signals are not financial advice.";

/// Outbound chat seam. The production impl talks to the Telegram Bot API;
/// tests substitute a recorder.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
    async fn send_photo(&self, chat_id: i64, image: &Path, caption: &str) -> Result<()>;
}

/// Chart rendering seam. Strictly best-effort: a failure here never blocks
/// the text signal.
#[async_trait]
pub trait ChartSource: Send + Sync {
    async fn chart_image(&self, symbol: &str, timeframe: Timeframe) -> Result<PathBuf>;
}

/// Deterministic signal text: same Signal, same string.
pub fn format_signal(signal: &Signal) -> String {
    let side = signal.direction.to_string().to_uppercase();
    let badge = match signal.direction {
        Direction::Buy => "🟢",
        Direction::Sell => "🔴",
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{badge} READY SIGNAL: {side} {} {badge}\n\n",
        signal.symbol
    ));
    out.push_str(DISCLAIMER);
    out.push_str("\n\n");
    out.push_str(&format!("{side} At: {}\n", signal.entry));
    for (i, target) in signal.targets.iter().enumerate() {
        out.push_str(&format!(
            "Target {}: {} ({} pips)\n",
            i + 1,
            target.price,
            target.pips
        ));
    }
    out.push_str(&format!(
        "🛑 Stop-Loss: {} ({} pips)\n\n",
        signal.stop_loss, signal.stop_pips
    ));
    out.push_str(SLOGAN);
    out
}

/// Default transport: writes outbound messages to the log. The chat
/// integration supplies a real Messenger in its place.
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        info!("-> chat {}:\n{}", chat_id, text);
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, image: &Path, caption: &str) -> Result<()> {
        info!("-> chat {}: photo {} ({})", chat_id, image.display(), caption);
        Ok(())
    }
}

pub struct SignalDispatcher {
    messenger: Arc<dyn Messenger>,
    charts: Option<Arc<dyn ChartSource>>,
}

impl SignalDispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, charts: Option<Arc<dyn ChartSource>>) -> Self {
        Self { messenger, charts }
    }

    /// Deliver a confirmed signal: chart first when available, then the
    /// formatted text. Only a failed text send is an error.
    pub async fn dispatch(&self, chat_id: i64, signal: &Signal) -> Result<()> {
        if let Some(charts) = &self.charts {
            match charts.chart_image(&signal.symbol, Timeframe::M15).await {
                Ok(path) => {
                    if let Err(e) = self
                        .messenger
                        .send_photo(chat_id, &path, &signal.symbol)
                        .await
                    {
                        warn!("{}: chart send failed: {}", signal.symbol, e);
                    }
                }
                Err(e) => warn!("{}: chart render failed: {}", signal.symbol, e),
            }
        }
        self.messenger
            .send_text(chat_id, &format_signal(signal))
            .await
    }

    /// Plain text passthrough for non-signal notices (block reasons,
    /// headlines).
    pub async fn notify(&self, chat_id: i64, text: &str) -> Result<()> {
        self.messenger.send_text(chat_id, text).await
    }

    /// Place a market order at the balance tier's minimum lot, stop at the
    /// signal stop, take-profit at the first target. Any failure leaves no
    /// order behind and tells the user so.
    pub async fn auto_execute(
        &self,
        broker: &dyn Broker,
        tiers: &[RiskTier],
        chat_id: i64,
        signal: &Signal,
    ) -> Option<OrderResult> {
        let outcome = self.try_execute(broker, tiers, signal).await;
        match outcome {
            Ok(result) => {
                info!(
                    "{}: auto order {} placed ({})",
                    signal.symbol, result.order_id, signal.direction
                );
                Some(result)
            }
            Err(e) => {
                warn!("{}: auto order not placed: {}", signal.symbol, e);
                if let Err(send_err) = self
                    .messenger
                    .send_text(chat_id, &format!("⚠️ Order not placed: {}", e))
                    .await
                {
                    warn!("order failure notice undelivered: {}", send_err);
                }
                None
            }
        }
    }

    async fn try_execute(
        &self,
        broker: &dyn Broker,
        tiers: &[RiskTier],
        signal: &Signal,
    ) -> Result<OrderResult> {
        let balance = broker.account_balance().await?;
        let tier = size_lots(tiers, balance);
        let order = OrderRequest {
            symbol: signal.symbol.clone(),
            side: signal.direction,
            volume: tier.min_lot,
            stop_loss: signal.stop_loss,
            take_profit: signal.targets[0].price,
        };
        Ok(broker.place_market_order(&order).await?)
    }
}

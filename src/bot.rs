use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fx_signal_bot::broker::Broker;
use fx_signal_bot::config::SharedConfig;
use fx_signal_bot::core::entitlement::{Access, BlockReason, EntitlementGate, LockdownMonitor};
use fx_signal_bot::core::evaluator::SetupEvaluator;
use fx_signal_bot::dispatch::SignalDispatcher;
use fx_signal_bot::models::Tier;
use fx_signal_bot::news::{active_lockdown_event, fresh_headlines, CalendarFeed, HeadlineFeed};
use fx_signal_bot::store::UserStore;

/// One on-demand signal request, as forwarded by the chat integration.
#[derive(Debug, Clone)]
pub struct SignalRequest {
    pub user_id: i64,
    pub chat_id: i64,
    pub symbol: String,
}

pub struct SignalBot {
    config: SharedConfig,
    broker: Arc<dyn Broker>,
    evaluator: SetupEvaluator,
    gate: EntitlementGate,
    lockdown: Arc<LockdownMonitor>,
    store: Arc<dyn UserStore>,
    dispatcher: SignalDispatcher,
    calendar: Arc<dyn CalendarFeed>,
    headlines: Arc<dyn HeadlineFeed>,

    last_lockdown_refresh: Instant,
    last_headline_push: Instant,
    pushed_titles: HashSet<String>,
}

impl SignalBot {
    pub async fn new(
        config: SharedConfig,
        broker: Arc<dyn Broker>,
        store: Arc<dyn UserStore>,
        dispatcher: SignalDispatcher,
        calendar: Arc<dyn CalendarFeed>,
        headlines: Arc<dyn HeadlineFeed>,
    ) -> Self {
        let cfg = config.read().await.clone();

        info!("{}", "=".repeat(60));
        info!("FX Signal Bot starting up");
        info!(
            "Auto-execute: {}",
            if cfg.auto_execute { "ON" } else { "OFF" }
        );
        info!("Day boundary timezone: {}", cfg.app_tz);
        info!(
            "News lockdown: +/-{}m around high-impact events, refresh {}s",
            cfg.news_lock_window_minutes, cfg.lockdown_refresh_secs
        );
        info!("{}", "=".repeat(60));

        let lockdown = Arc::new(LockdownMonitor::new());
        let evaluator = SetupEvaluator::new(&cfg);
        let gate = EntitlementGate::new(
            lockdown.clone(),
            store.clone(),
            cfg.tz(),
            cfg.max_daily_losses,
        );

        let now = Instant::now();
        Self {
            config,
            broker,
            evaluator,
            gate,
            lockdown,
            store,
            dispatcher,
            calendar,
            headlines,
            last_lockdown_refresh: now,
            last_headline_push: now,
            pushed_titles: HashSet::new(),
        }
    }

    pub async fn run(&mut self, mut requests: mpsc::Receiver<SignalRequest>) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");
        self.refresh_lockdown().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down...");
                    return Ok(());
                }
                req = requests.recv() => {
                    match req {
                        Some(req) => self.handle_request(req).await,
                        None => {
                            info!("Request channel closed, stopping.");
                            return Ok(());
                        }
                    }
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(1)) => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&mut self) {
        let cfg = self.config.read().await.clone();

        if self.last_lockdown_refresh.elapsed().as_secs() >= cfg.lockdown_refresh_secs {
            self.refresh_lockdown().await;
            self.last_lockdown_refresh = Instant::now();
        }

        if self.last_headline_push.elapsed().as_secs() >= cfg.headline_push_secs {
            self.push_headlines().await;
            self.last_headline_push = Instant::now();
        }
    }

    /// Recompute the global lockdown from the economic calendar. Feed
    /// failures clear the lockdown rather than leaving it stale.
    async fn refresh_lockdown(&self) {
        let window = self.config.read().await.news_lock_window_minutes;
        let events = self.calendar.events().await;
        let before = self.lockdown.snapshot().await;

        match active_lockdown_event(&events, Utc::now(), window) {
            Some(event) => {
                let reason = event.lockdown_reason();
                if !before.active || before.reason != reason {
                    info!("Lockdown ON: {}", reason);
                }
                self.lockdown.replace(true, reason).await;
            }
            None => {
                if before.active {
                    info!("Lockdown OFF");
                }
                self.lockdown.replace(false, "").await;
            }
        }
    }

    /// Push fresh categorized headlines to subscribed users. Titles delivered
    /// in the previous cycle are skipped; the dedup set holds one fetch.
    async fn push_headlines(&mut self) {
        let subscribers = self.store.news_subscribers().await;
        if subscribers.is_empty() {
            return;
        }

        let (fresh, seen) = fresh_headlines(&self.pushed_titles, self.headlines.latest().await);
        self.pushed_titles = seen;

        for headline in fresh {
            let text = format!("📰 {}: {}", headline.category, headline.title);
            for &(user_id, prefs) in &subscribers {
                if !prefs.wants(headline.category) {
                    continue;
                }
                if let Err(e) = self.dispatcher.notify(user_id, &text).await {
                    warn!("headline push to {} failed: {}", user_id, e);
                }
            }
        }
    }

    async fn handle_request(&mut self, req: SignalRequest) {
        debug!("request from {}: {}", req.user_id, req.symbol);

        match self.gate.check(req.user_id).await {
            Access::Block(reason) => {
                info!("user {} blocked: {}", req.user_id, reason);
                let text = self.block_message(reason).await;
                if let Err(e) = self.dispatcher.notify(req.chat_id, &text).await {
                    warn!("block notice to {} failed: {}", req.chat_id, e);
                }
            }
            Access::Allow => self.evaluate_and_send(&req).await,
        }
    }

    async fn evaluate_and_send(&self, req: &SignalRequest) {
        let cfg = self.config.read().await.clone();

        let signal = match self
            .evaluator
            .evaluate(self.broker.as_ref(), &req.symbol)
            .await
        {
            Some(signal) => signal,
            None => {
                let text = format!("No valid setup on {} right now. Patience.", req.symbol);
                if let Err(e) = self.dispatcher.notify(req.chat_id, &text).await {
                    warn!("no-setup notice to {} failed: {}", req.chat_id, e);
                }
                return;
            }
        };

        if let Err(e) = self.dispatcher.dispatch(req.chat_id, &signal).await {
            warn!("signal delivery to {} failed: {}", req.chat_id, e);
            return;
        }

        // Quota is committed only after delivery succeeded
        let user = self.store.get_or_create(req.user_id).await;
        if user.tier == Tier::Free {
            self.gate
                .commit_free_quota(req.user_id, self.gate.today())
                .await;
        }

        if cfg.auto_execute {
            self.dispatcher
                .auto_execute(self.broker.as_ref(), &cfg.risk_tiers, req.chat_id, &signal)
                .await;
        }
    }

    async fn block_message(&self, reason: BlockReason) -> String {
        match reason {
            BlockReason::NewsLockdown => {
                let state = self.lockdown.snapshot().await;
                format!("🚫 Signals paused: {}", state.reason)
            }
            BlockReason::LossCooldown => {
                "🚫 Trading paused until end of day after repeated losses. \
                 Protect your capital."
                    .to_string()
            }
            BlockReason::DailyQuota => {
                "🚫 Free signal already used today. Upgrade to premium for \
                 unlimited signals."
                    .to_string()
            }
        }
    }
}

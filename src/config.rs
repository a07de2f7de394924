use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::risk::{default_risk_tiers, RiskTier};

pub type SharedConfig = Arc<RwLock<Config>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Broker (MetaApi REST)
    pub metaapi_base_url: String,
    pub metaapi_token: String,
    pub metaapi_account_id: String,
    pub auto_execute: bool,

    // Setup detection
    pub trend_lookback: usize,
    pub breakout_window: usize,
    pub breakout_tolerance: f64,
    pub structure_lookback: usize,
    pub swing_window: usize,
    pub alignment_threshold: f64,
    pub trigger_scan_candles: usize,

    // Price levels (pips)
    pub stop_pips: f64,
    pub target_pips: [f64; 3],

    // Risk
    pub risk_tiers: Vec<RiskTier>,
    pub max_daily_losses: u32,

    // News / lockdown
    pub calendar_url: String,
    pub headlines_url: String,
    pub news_lock_window_minutes: i64,
    pub lockdown_refresh_secs: u64,
    pub headline_push_secs: u64,

    // Timeouts
    pub fetch_timeout_secs: u64,

    // Timezone used for free-quota and cooldown day boundaries
    pub app_tz: String,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        Config {
            metaapi_base_url: env(
                "METAAPI_BASE_URL",
                "https://mt-client-api-v1.london.agiliumtrade.ai",
            ),
            metaapi_token: env("METAAPI_TOKEN", ""),
            metaapi_account_id: env("METAAPI_ACCOUNT_ID", ""),
            auto_execute: env("AUTO_EXECUTE", "false").to_lowercase() == "true",
            trend_lookback: env("TREND_LOOKBACK", "50").parse().unwrap_or(50),
            breakout_window: env("BREAKOUT_WINDOW", "40").parse().unwrap_or(40),
            breakout_tolerance: env("BREAKOUT_TOLERANCE", "0.001")
                .parse()
                .unwrap_or(0.001), // 0.1%
            structure_lookback: env("STRUCTURE_LOOKBACK", "150").parse().unwrap_or(150),
            swing_window: env("SWING_WINDOW", "5").parse().unwrap_or(5),
            alignment_threshold: env("ALIGNMENT_THRESHOLD", "0.004")
                .parse()
                .unwrap_or(0.004), // 0.4%
            trigger_scan_candles: env("TRIGGER_SCAN_CANDLES", "10").parse().unwrap_or(10),
            stop_pips: env("STOP_PIPS", "40").parse().unwrap_or(40.0),
            target_pips: [
                env("TP1_PIPS", "30").parse().unwrap_or(30.0),
                env("TP2_PIPS", "60").parse().unwrap_or(60.0),
                env("TP3_PIPS", "90").parse().unwrap_or(90.0),
            ],
            risk_tiers: default_risk_tiers(),
            max_daily_losses: env("MAX_DAILY_LOSSES", "3").parse().unwrap_or(3),
            calendar_url: env(
                "CALENDAR_URL",
                "https://nfs.faireconomy.media/ff_calendar_thisweek.json",
            ),
            headlines_url: env("HEADLINES_URL", ""),
            news_lock_window_minutes: env("NEWS_LOCK_WINDOW_MINUTES", "30")
                .parse()
                .unwrap_or(30),
            lockdown_refresh_secs: env("LOCKDOWN_REFRESH_SECS", "300").parse().unwrap_or(300),
            headline_push_secs: env("HEADLINE_PUSH_SECS", "900").parse().unwrap_or(900),
            fetch_timeout_secs: env("FETCH_TIMEOUT_SECS", "15").parse().unwrap_or(15),
            app_tz: env("APP_TZ", "Africa/Nairobi"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    /// Configured timezone; falls back to UTC on a bad name.
    pub fn tz(&self) -> Tz {
        self.app_tz.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

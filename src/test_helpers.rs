use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::core::risk::default_risk_tiers;
use crate::models::{Candle, CandleSeries, Direction};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing
/// 15m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(15 * i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
        })
        .collect();
    CandleSeries::new(candles)
}

pub fn single_candle(o: f64, h: f64, l: f64, c: f64) -> Candle {
    Candle {
        timestamp: base_time(),
        open: o,
        high: h,
        low: l,
        close: c,
    }
}

/// Bar fixtures that confirm a setup in the given direction: a clean daily
/// trend, a quiet 4h envelope, and a 15m series ending in a pin bar.
pub fn trigger_scenario(direction: Direction) -> (CandleSeries, CandleSeries, CandleSeries) {
    match direction {
        Direction::Buy => {
            let daily: Vec<(f64, f64, f64, f64)> = (0..160)
                .map(|i| {
                    let v = 1.00 + i as f64 * 0.0005;
                    (v, v + 0.0004, v - 0.0004, v + 0.0003)
                })
                .collect();
            let h4: Vec<(f64, f64, f64, f64)> =
                (0..45).map(|_| (1.10, 1.11, 1.09, 1.10)).collect();
            let mut m15: Vec<(f64, f64, f64, f64)> =
                (0..11).map(|_| (1.1000, 1.1101, 1.0999, 1.1100)).collect();
            m15.push((1.1050, 1.1100, 1.0950, 1.1080)); // bullish pin
            (make_candles(&daily), make_candles(&h4), make_candles(&m15))
        }
        Direction::Sell => {
            let daily: Vec<(f64, f64, f64, f64)> = (0..160)
                .map(|i| {
                    let v = 1.30 - i as f64 * 0.0005;
                    (v, v + 0.0004, v - 0.0004, v - 0.0003)
                })
                .collect();
            let h4: Vec<(f64, f64, f64, f64)> =
                (0..45).map(|_| (1.25, 1.26, 1.24, 1.25)).collect();
            let mut m15: Vec<(f64, f64, f64, f64)> =
                (0..11).map(|_| (1.1100, 1.1101, 1.0999, 1.1000)).collect();
            m15.push((1.1050, 1.1150, 1.1000, 1.1020)); // bearish pin
            (make_candles(&daily), make_candles(&h4), make_candles(&m15))
        }
    }
}

/// A Config suitable for testing — no tokens, UTC day boundaries.
pub fn default_test_config() -> Config {
    Config {
        metaapi_base_url: "http://localhost:0".to_string(),
        metaapi_token: String::new(),
        metaapi_account_id: String::new(),
        auto_execute: false,
        trend_lookback: 50,
        breakout_window: 40,
        breakout_tolerance: 0.001,
        structure_lookback: 150,
        swing_window: 5,
        alignment_threshold: 0.004,
        trigger_scan_candles: 10,
        stop_pips: 40.0,
        target_pips: [30.0, 60.0, 90.0],
        risk_tiers: default_risk_tiers(),
        max_daily_losses: 3,
        calendar_url: String::new(),
        headlines_url: String::new(),
        news_lock_window_minutes: 30,
        lockdown_refresh_secs: 300,
        headline_push_secs: 900,
        fetch_timeout_secs: 2,
        app_tz: "UTC".to_string(),
        log_level: "ERROR".to_string(),
    }
}

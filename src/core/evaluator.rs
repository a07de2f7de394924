use std::time::Duration;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::config::Config;
use crate::core::patterns;
use crate::error::FetchError;
use crate::models::{Breakout, CandleSeries, Direction, Signal, TargetLevel, Timeframe, Trend};

/// Multi-timeframe setup confirmation: daily trend context, 4h breakout,
/// daily swing-level alignment, 15m pin-bar trigger. Stateless between
/// invocations; every call recomputes from fresh bars.
pub struct SetupEvaluator {
    trend_lookback: usize,
    breakout_window: usize,
    breakout_tolerance: f64,
    structure_lookback: usize,
    swing_window: usize,
    alignment_threshold: f64,
    trigger_scan_candles: usize,
    stop_pips: f64,
    target_pips: [f64; 3],
    fetch_timeout: Duration,
}

impl SetupEvaluator {
    pub fn new(cfg: &Config) -> Self {
        Self {
            trend_lookback: cfg.trend_lookback,
            breakout_window: cfg.breakout_window,
            breakout_tolerance: cfg.breakout_tolerance,
            structure_lookback: cfg.structure_lookback,
            swing_window: cfg.swing_window,
            alignment_threshold: cfg.alignment_threshold,
            trigger_scan_candles: cfg.trigger_scan_candles,
            stop_pips: cfg.stop_pips,
            target_pips: cfg.target_pips,
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
        }
    }

    /// Fetch bars for all three timeframes concurrently and evaluate.
    /// Any fetch failure or timeout degrades to no signal.
    pub async fn evaluate(&self, broker: &dyn Broker, symbol: &str) -> Option<Signal> {
        let symbol = normalize_symbol(symbol);
        let daily_count = self.structure_lookback.max(self.trend_lookback + 1);

        let (daily, h4, m15) = tokio::join!(
            self.fetch(broker, &symbol, Timeframe::D1, daily_count),
            self.fetch(broker, &symbol, Timeframe::H4, self.breakout_window + 1),
            self.fetch(broker, &symbol, Timeframe::M15, self.trigger_scan_candles),
        );
        let (daily, h4, m15) = match (daily, h4, m15) {
            (Some(d), Some(h), Some(m)) => (d, h, m),
            _ => return None,
        };

        self.evaluate_bars(&symbol, &daily, &h4, &m15)
    }

    async fn fetch(
        &self,
        broker: &dyn Broker,
        symbol: &str,
        tf: Timeframe,
        count: usize,
    ) -> Option<CandleSeries> {
        let result = tokio::time::timeout(self.fetch_timeout, broker.fetch_bars(symbol, tf, count))
            .await
            .unwrap_or(Err(FetchError::Timeout(self.fetch_timeout)));
        match result {
            Ok(bars) => Some(bars),
            Err(e) => {
                debug!("bar fetch {} {}: {}", symbol, tf, e);
                None
            }
        }
    }

    /// Pure confirmation cascade over already-fetched bars. Expects a
    /// normalized symbol.
    pub fn evaluate_bars(
        &self,
        symbol: &str,
        daily: &CandleSeries,
        h4: &CandleSeries,
        m15: &CandleSeries,
    ) -> Option<Signal> {
        if daily.len() <= self.trend_lookback || h4.len() <= self.breakout_window || m15.is_empty()
        {
            debug!(
                "{}: insufficient history (d1={} h4={} m15={})",
                symbol,
                daily.len(),
                h4.len(),
                m15.len()
            );
            return None;
        }

        let daily_trend = patterns::trend(daily, self.trend_lookback);
        let h4_breakout = patterns::breakout(h4, self.breakout_window, self.breakout_tolerance);
        let levels = patterns::swing_levels(daily, self.structure_lookback, self.swing_window);

        let entry = m15.last()?.close;
        let aligned = patterns::structure_aligned(entry, &levels, self.alignment_threshold);

        // Newest-first scan: the most recent pin bar wins.
        let trigger = m15
            .as_slice()
            .iter()
            .rev()
            .take(self.trigger_scan_candles)
            .find_map(patterns::pin_bar)?;

        let confirmed = match trigger {
            Direction::Buy => daily_trend == Trend::Up || h4_breakout == Breakout::Up || aligned,
            Direction::Sell => {
                daily_trend == Trend::Down || h4_breakout == Breakout::Down || aligned
            }
        };
        if !confirmed {
            debug!(
                "{}: {} trigger rejected (trend={} breakout={} aligned={})",
                symbol, trigger, daily_trend, h4_breakout, aligned
            );
            return None;
        }

        let signal = self.build_signal(symbol, trigger, entry);
        info!(
            "{}: {} setup confirmed (trend={} breakout={} aligned={})",
            symbol, trigger, daily_trend, h4_breakout, aligned
        );
        Some(signal)
    }

    fn build_signal(&self, symbol: &str, direction: Direction, entry: f64) -> Signal {
        let pip = 1.0 / pip_factor(symbol);
        let dp = price_precision(symbol);
        let side = match direction {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        };

        let entry = round_to(entry, dp);
        let stop_loss = round_to(entry - side * self.stop_pips * pip, dp);
        let targets = self.target_pips.map(|pips| {
            let price = round_to(entry + side * pips * pip, dp);
            TargetLevel {
                price,
                pips: pip_distance(entry, price, symbol),
            }
        });

        Signal {
            symbol: symbol.to_string(),
            direction,
            entry,
            stop_loss,
            stop_pips: pip_distance(entry, stop_loss, symbol),
            targets,
        }
    }
}

/// Collapse notation variants once at the pipeline entry:
/// "EUR/USD", "eur-usd", "EUR_USD" all become "EURUSD".
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Pips per unit of price for the instrument. JPY crosses quote two decimals
/// coarser than other FX pairs; metals and crypto are approximated.
pub fn pip_factor(symbol: &str) -> f64 {
    if symbol.ends_with("JPY") {
        100.0
    } else if symbol.starts_with("XAU") || symbol.starts_with("XAG") {
        10.0
    } else if symbol.starts_with("BTC") || symbol.starts_with("ETH") {
        1.0
    } else {
        10_000.0
    }
}

fn price_precision(symbol: &str) -> u32 {
    if symbol.ends_with("JPY") {
        3
    } else if symbol.starts_with("XAU") || symbol.starts_with("XAG") {
        2
    } else if symbol.starts_with("BTC") || symbol.starts_with("ETH") {
        2
    } else {
        5
    }
}

/// Distance between two prices in instrument pips, rounded to 0.1 pip.
pub fn pip_distance(a: f64, b: f64, symbol: &str) -> f64 {
    ((a - b).abs() * pip_factor(symbol) * 10.0).round() / 10.0
}

fn round_to(x: f64, dp: u32) -> f64 {
    let scale = 10_f64.powi(dp as i32);
    (x * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{OrderRequest, OrderResult};
    use crate::error::OrderError;
    use crate::test_helpers::{default_test_config, make_candles, trigger_scenario};
    use async_trait::async_trait;

    fn evaluator() -> SetupEvaluator {
        SetupEvaluator::new(&default_test_config())
    }

    struct StalledBroker;

    #[async_trait]
    impl Broker for StalledBroker {
        async fn fetch_bars(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _count: usize,
        ) -> Result<CandleSeries, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(CandleSeries::default())
        }

        async fn account_balance(&self) -> Result<f64, FetchError> {
            Ok(0.0)
        }

        async fn place_market_order(
            &self,
            _order: &OrderRequest,
        ) -> Result<OrderResult, OrderError> {
            Err(OrderError::Rejected("no orders here".to_string()))
        }
    }

    #[test]
    fn normalizes_symbol_variants() {
        assert_eq!(normalize_symbol("EUR/USD"), "EURUSD");
        assert_eq!(normalize_symbol("eur-usd"), "EURUSD");
        assert_eq!(normalize_symbol("GBP_JPY "), "GBPJPY");
    }

    #[test]
    fn pip_factors_by_instrument() {
        assert!((pip_factor("EURUSD") - 10_000.0).abs() < 1e-9);
        assert!((pip_factor("USDJPY") - 100.0).abs() < 1e-9);
        assert!((pip_factor("XAUUSD") - 10.0).abs() < 1e-9);
        assert!((pip_factor("BTCUSD") - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_fetch_times_out_to_no_signal() {
        let ev = evaluator();
        assert!(ev.evaluate(&StalledBroker, "EURUSD").await.is_none());
    }

    #[test]
    fn timeout_error_names_the_deadline() {
        let e = FetchError::Timeout(Duration::from_secs(2));
        assert!(e.to_string().contains("timed out"));
    }

    #[test]
    fn short_history_returns_none() {
        let ev = evaluator();
        let few = make_candles(&[(1.10, 1.11, 1.09, 1.10); 5]);
        assert!(ev.evaluate_bars("EURUSD", &few, &few, &few).is_none());
    }

    #[test]
    fn confirmed_buy_builds_price_levels() {
        let ev = evaluator();
        let (daily, h4, m15) = trigger_scenario(Direction::Buy);
        let sig = ev
            .evaluate_bars("EURUSD", &daily, &h4, &m15)
            .expect("buy setup should confirm");

        assert_eq!(sig.direction, Direction::Buy);
        assert!((sig.stop_pips - 40.0).abs() < 0.1);
        assert!((sig.targets[0].pips - 30.0).abs() < 0.1);
        assert!((sig.targets[1].pips - 60.0).abs() < 0.1);
        assert!((sig.targets[2].pips - 90.0).abs() < 0.1);
        assert!(sig.stop_loss < sig.entry);
        assert!(sig.targets.iter().all(|t| t.price > sig.entry));
    }

    #[test]
    fn confirmed_sell_is_symmetric() {
        let ev = evaluator();
        let (daily, h4, m15) = trigger_scenario(Direction::Sell);
        let sig = ev
            .evaluate_bars("EURUSD", &daily, &h4, &m15)
            .expect("sell setup should confirm");

        assert_eq!(sig.direction, Direction::Sell);
        assert!(sig.stop_loss > sig.entry);
        assert!(sig.targets.iter().all(|t| t.price < sig.entry));
    }

    #[test]
    fn trigger_against_context_is_rejected() {
        let ev = evaluator();
        // Bearish daily/4h context with a bullish 15m pin, price away from
        // any swing level: no override applies.
        let (daily, h4, _) = trigger_scenario(Direction::Sell);
        let (_, _, m15_buy) = trigger_scenario(Direction::Buy);
        assert!(ev.evaluate_bars("EURUSD", &daily, &h4, &m15_buy).is_none());
    }

    #[test]
    fn no_pin_bar_means_no_signal() {
        let ev = evaluator();
        let (daily, h4, _) = trigger_scenario(Direction::Buy);
        // Full-body candles only in the trigger window
        let m15 = make_candles(&[(1.1000, 1.1101, 1.0999, 1.1100); 12]);
        assert!(ev.evaluate_bars("EURUSD", &daily, &h4, &m15).is_none());
    }

    #[test]
    fn jpy_precision_and_pips() {
        let ev = evaluator();
        let sig = ev.build_signal("USDJPY", Direction::Buy, 154.321);
        // 40 pips at x100 = 0.400
        assert!((sig.entry - sig.stop_loss - 0.400).abs() < 1e-9);
        assert!((sig.stop_pips - 40.0).abs() < 0.1);
        assert!((sig.targets[2].price - (sig.entry + 0.900)).abs() < 1e-9);
    }

    #[test]
    fn pip_round_trip_matches_configuration() {
        let ev = evaluator();
        let sig = ev.build_signal("EURUSD", Direction::Buy, 1.07500);
        for (lvl, want) in sig.targets.iter().zip([30.0, 60.0, 90.0]) {
            let back = pip_distance(sig.entry, lvl.price, "EURUSD");
            assert!((back - want).abs() < 0.1);
        }
        assert!((pip_distance(sig.entry, sig.stop_loss, "EURUSD") - 40.0).abs() < 0.1);
    }
}

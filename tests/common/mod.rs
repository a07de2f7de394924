use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fx_signal_bot::broker::{Broker, OrderRequest, OrderResult};
use fx_signal_bot::dispatch::Messenger;
use fx_signal_bot::error::{FetchError, OrderError};
use fx_signal_bot::models::{Candle, CandleSeries, Timeframe};

/// Create candles from (open, high, low, close) tuples with auto-incrementing
/// 15m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

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

/// Canned bars that confirm a buy setup: rising daily trend, quiet 4h
/// envelope, 15m series ending in a bullish pin bar.
pub fn buy_scenario() -> HashMap<Timeframe, CandleSeries> {
    let daily: Vec<(f64, f64, f64, f64)> = (0..160)
        .map(|i| {
            let v = 1.00 + i as f64 * 0.0005;
            (v, v + 0.0004, v - 0.0004, v + 0.0003)
        })
        .collect();
    let h4: Vec<(f64, f64, f64, f64)> = (0..45).map(|_| (1.10, 1.11, 1.09, 1.10)).collect();
    let mut m15: Vec<(f64, f64, f64, f64)> =
        (0..11).map(|_| (1.1000, 1.1101, 1.0999, 1.1100)).collect();
    m15.push((1.1050, 1.1100, 1.0950, 1.1080)); // bullish pin

    let mut data = HashMap::new();
    data.insert(Timeframe::D1, make_candles(&daily));
    data.insert(Timeframe::H4, make_candles(&h4));
    data.insert(Timeframe::M15, make_candles(&m15));
    data
}

/// A mock broker serving canned bars and recording placed orders.
pub struct MockBroker {
    pub data: HashMap<Timeframe, CandleSeries>,
    pub balance: f64,
    pub reject_orders: bool,
    pub orders: Mutex<Vec<OrderRequest>>,
}

impl MockBroker {
    pub fn new(data: HashMap<Timeframe, CandleSeries>, balance: f64) -> Self {
        Self {
            data,
            balance,
            reject_orders: false,
            orders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn fetch_bars(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        _count: usize,
    ) -> Result<CandleSeries, FetchError> {
        Ok(self.data.get(&timeframe).cloned().unwrap_or_default())
    }

    async fn account_balance(&self) -> Result<f64, FetchError> {
        Ok(self.balance)
    }

    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderResult, OrderError> {
        if self.reject_orders {
            return Err(OrderError::Rejected("TRADE_RETCODE_NO_MONEY".to_string()));
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(OrderResult {
            order_id: "1".to_string(),
        })
    }
}

/// A messenger that records every outbound text.
#[derive(Default)]
pub struct RecordingMessenger {
    pub texts: Mutex<Vec<(i64, String)>>,
    pub photos: Mutex<Vec<(i64, PathBuf)>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, image: &Path, _caption: &str) -> Result<()> {
        self.photos
            .lock()
            .unwrap()
            .push((chat_id, image.to_path_buf()));
        Ok(())
    }
}

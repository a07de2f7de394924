pub mod metaapi;

pub use metaapi::MetaApiClient;

use async_trait::async_trait;

use crate::error::{FetchError, OrderError};
use crate::models::{CandleSeries, Direction, Timeframe};

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Direction,
    pub volume: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone)]
pub struct OrderResult {
    pub order_id: String,
}

/// Market-data and order seam. Methods take `&self` so multi-timeframe
/// fetches can run concurrently over one client.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Most recent `count` bars, oldest first.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, FetchError>;

    async fn account_balance(&self) -> Result<f64, FetchError>;

    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderResult, OrderError>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::broker::{Broker, OrderRequest, OrderResult};
use crate::config::Config;
use crate::error::{FetchError, OrderError};
use crate::models::{Candle, CandleSeries, Direction, Timeframe};

#[derive(Debug, Deserialize)]
struct RawCandle {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInformation {
    balance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeRequest {
    action_type: &'static str,
    symbol: String,
    volume: f64,
    stop_loss: f64,
    take_profit: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeResponse {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    string_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// MetaApi REST client. Auth is a static token header; the account id is
/// part of every path.
pub struct MetaApiClient {
    client: Client,
    base_url: String,
    token: String,
    account_id: String,
}

impl MetaApiClient {
    pub fn new(cfg: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: cfg.metaapi_base_url.trim_end_matches('/').to_string(),
            token: cfg.metaapi_token.clone(),
            account_id: cfg.metaapi_account_id.clone(),
        }
    }

    fn account_url(&self, suffix: &str) -> String {
        format!(
            "{}/users/current/accounts/{}/{}",
            self.base_url, self.account_id, suffix
        )
    }
}

#[async_trait]
impl Broker for MetaApiClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, FetchError> {
        let url = self.account_url(&format!(
            "historical-market-data/symbols/{}/timeframes/{}/candles",
            symbol,
            timeframe.metaapi_timeframe()
        ));

        let resp = self
            .client
            .get(&url)
            .query(&[("limit", count.to_string())])
            .header("auth-token", &self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: Vec<RawCandle> = resp.json().await?;
        let mut candles: Vec<Candle> = raw
            .into_iter()
            .filter_map(|rc| {
                let timestamp = DateTime::parse_from_rfc3339(&rc.time)
                    .ok()?
                    .with_timezone(&Utc);
                Some(Candle {
                    timestamp,
                    open: rc.open,
                    high: rc.high,
                    low: rc.low,
                    close: rc.close,
                })
            })
            .collect();

        // Evaluation assumes oldest first
        candles.sort_by_key(|c| c.timestamp);
        debug!("{} {}: {} bars", symbol, timeframe, candles.len());
        Ok(CandleSeries::new(candles))
    }

    async fn account_balance(&self) -> Result<f64, FetchError> {
        let url = self.account_url("account-information");
        let resp = self
            .client
            .get(&url)
            .header("auth-token", &self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let info: AccountInformation = resp.json().await?;
        Ok(info.balance)
    }

    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderResult, OrderError> {
        let action_type = match order.side {
            Direction::Buy => "ORDER_TYPE_BUY",
            Direction::Sell => "ORDER_TYPE_SELL",
        };
        let body = TradeRequest {
            action_type,
            symbol: order.symbol.clone(),
            volume: order.volume,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
        };

        let resp = self
            .client
            .post(self.account_url("trade"))
            .header("auth-token", &self.token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OrderError::Rejected(format!("{}: {}", status, body)));
        }

        let trade: TradeResponse = resp.json().await.map_err(FetchError::Http)?;
        match trade.order_id {
            Some(order_id) => Ok(OrderResult { order_id }),
            None => Err(OrderError::Rejected(
                trade
                    .message
                    .or(trade.string_code)
                    .unwrap_or_else(|| "no order id in response".to_string()),
            )),
        }
    }
}

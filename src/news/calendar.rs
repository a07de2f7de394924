use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Impact {
    High,
    Medium,
    Low,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
pub struct NewsEvent {
    pub title: String,
    pub country: String,
    pub time: DateTime<Utc>,
    pub impact: Impact,
}

impl NewsEvent {
    pub fn lockdown_reason(&self) -> String {
        format!("High-impact event: {} ({})", self.title, self.country)
    }
}

/// Weekly economic-calendar source. Failures degrade to an empty list;
/// lockdown state then clears rather than sticking stale.
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    async fn events(&self) -> Vec<NewsEvent>;
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    title: String,
    country: String,
    date: String,
    impact: Impact,
}

/// ForexFactory weekly JSON feed (ff_calendar_thisweek.json). Event dates
/// carry an explicit offset; everything is normalized to UTC on parse.
pub struct ForexFactoryCalendar {
    client: Client,
    url: String,
}

impl ForexFactoryCalendar {
    pub fn new(cfg: &Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: cfg.calendar_url.clone(),
        }
    }

    async fn fetch_week(&self) -> Result<Vec<NewsEvent>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: Vec<RawEvent> = resp.json().await?;
        let events = raw
            .into_iter()
            .filter_map(|e| {
                let time = DateTime::parse_from_rfc3339(&e.date).ok()?.with_timezone(&Utc);
                Some(NewsEvent {
                    title: e.title,
                    country: e.country,
                    time,
                    impact: e.impact,
                })
            })
            .collect();
        Ok(events)
    }
}

#[async_trait]
impl CalendarFeed for ForexFactoryCalendar {
    async fn events(&self) -> Vec<NewsEvent> {
        if self.url.is_empty() {
            debug!("calendar feed disabled (no url)");
            return Vec::new();
        }
        match self.fetch_week().await {
            Ok(events) => events,
            Err(e) => {
                warn!("calendar fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// The high-impact event nearest to `now` within +/- `window_minutes`,
/// if any. Drives the global news lockdown.
pub fn active_lockdown_event(
    events: &[NewsEvent],
    now: DateTime<Utc>,
    window_minutes: i64,
) -> Option<&NewsEvent> {
    let window = Duration::minutes(window_minutes);
    events
        .iter()
        .filter(|e| e.impact == Impact::High)
        .filter(|e| {
            let delta = e.time - now;
            delta.abs() <= window
        })
        .min_by_key(|e| (e.time - now).abs())
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    #[serde(rename = "central_bank")]
    CentralBank,
    Inflation,
    Geopolitics,
    Other,
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsCategory::CentralBank => write!(f, "Central Banks"),
            NewsCategory::Inflation => write!(f, "Inflation & Economy"),
            NewsCategory::Geopolitics => write!(f, "Geopolitics"),
            NewsCategory::Other => write!(f, "Markets"),
        }
    }
}

/// Keyword bucketing for headline routing. First match wins, checked in
/// central-bank, inflation, geopolitics order.
pub fn categorize(headline: &str) -> NewsCategory {
    let text = headline.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if hit(&["fed", "ecb", "boe", "boj", "central bank", "rate decision", "rate hike", "rate cut"])
    {
        NewsCategory::CentralBank
    } else if hit(&["inflation", "cpi", "gdp", "jobs", "employment", "payroll"]) {
        NewsCategory::Inflation
    } else if hit(&["war", "election", "sanction", "geopolit", "conflict"]) {
        NewsCategory::Geopolitics
    } else {
        NewsCategory::Other
    }
}

/// Per-user headline subscription toggles. All off by default; `Other`
/// headlines are never pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPrefs {
    pub central_bank: bool,
    pub inflation: bool,
    pub geopolitics: bool,
}

impl NewsPrefs {
    pub fn all() -> Self {
        Self {
            central_bank: true,
            inflation: true,
            geopolitics: true,
        }
    }

    pub fn any(&self) -> bool {
        self.central_bank || self.inflation || self.geopolitics
    }

    pub fn wants(&self, category: NewsCategory) -> bool {
        match category {
            NewsCategory::CentralBank => self.central_bank,
            NewsCategory::Inflation => self.inflation,
            NewsCategory::Geopolitics => self.geopolitics,
            NewsCategory::Other => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Headline {
    pub title: String,
    pub category: NewsCategory,
}

/// Split the latest fetch into headlines not delivered last cycle, plus the
/// title set to carry into the next cycle. Only the current fetch's titles
/// are carried, so the dedup set stays bounded by the feed size.
pub fn fresh_headlines(
    previous: &HashSet<String>,
    latest: Vec<Headline>,
) -> (Vec<Headline>, HashSet<String>) {
    let seen: HashSet<String> = latest.iter().map(|h| h.title.clone()).collect();
    let fresh = latest
        .into_iter()
        .filter(|h| !previous.contains(&h.title))
        .collect();
    (fresh, seen)
}

#[async_trait]
pub trait HeadlineFeed: Send + Sync {
    /// Latest headlines, already categorized. Failures degrade to empty.
    async fn latest(&self) -> Vec<Headline>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHeadline {
    Plain(String),
    Titled { title: String },
}

impl RawHeadline {
    fn into_title(self) -> String {
        match self {
            RawHeadline::Plain(t) => t,
            RawHeadline::Titled { title } => title,
        }
    }
}

/// Headline source over a JSON endpoint returning either plain strings or
/// `{"title": ...}` objects. An empty url disables the feed.
pub struct JsonHeadlineFeed {
    client: Client,
    url: String,
}

impl JsonHeadlineFeed {
    pub fn new(cfg: &Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: cfg.headlines_url.clone(),
        }
    }

    async fn fetch(&self) -> Result<Vec<Headline>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let raw: Vec<RawHeadline> = resp.json().await?;
        Ok(raw
            .into_iter()
            .map(|r| {
                let title = r.into_title();
                let category = categorize(&title);
                Headline { title, category }
            })
            .collect())
    }
}

#[async_trait]
impl HeadlineFeed for JsonHeadlineFeed {
    async fn latest(&self) -> Vec<Headline> {
        if self.url.is_empty() {
            debug!("headline feed disabled (no url)");
            return Vec::new();
        }
        match self.fetch().await {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!("headline fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

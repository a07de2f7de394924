use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::core::entitlement::UserEntitlement;
use crate::models::Tier;
use crate::news::NewsPrefs;

/// CRUD-style accessors over user records, keyed by user id. Persistence is
/// a collaborator concern; implementations must serialize updates per record
/// (last-committed-wins is acceptable at daily granularity).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_or_create(&self, user_id: i64) -> UserEntitlement;
    async fn set_tier(&self, user_id: i64, tier: Tier);
    async fn set_free_signal_date(&self, user_id: i64, date: NaiveDate);
    /// Sets the cooldown and resets the daily loss count in the same update.
    async fn set_cooldown(&self, user_id: i64, until: DateTime<Utc>);
    async fn increment_daily_loss(&self, user_id: i64) -> u32;
    async fn set_news_prefs(&self, user_id: i64, prefs: NewsPrefs);
    async fn news_subscribers(&self) -> Vec<(i64, NewsPrefs)>;
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<i64, UserEntitlement>>,
    prefs: Mutex<HashMap<i64, NewsPrefs>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_or_create(&self, user_id: i64) -> UserEntitlement {
        self.users
            .lock()
            .await
            .entry(user_id)
            .or_insert_with(|| UserEntitlement::new(user_id))
            .clone()
    }

    async fn set_tier(&self, user_id: i64, tier: Tier) {
        let mut users = self.users.lock().await;
        users
            .entry(user_id)
            .or_insert_with(|| UserEntitlement::new(user_id))
            .tier = tier;
    }

    async fn set_free_signal_date(&self, user_id: i64, date: NaiveDate) {
        let mut users = self.users.lock().await;
        users
            .entry(user_id)
            .or_insert_with(|| UserEntitlement::new(user_id))
            .last_free_signal_date = Some(date);
    }

    async fn set_cooldown(&self, user_id: i64, until: DateTime<Utc>) {
        let mut users = self.users.lock().await;
        let user = users
            .entry(user_id)
            .or_insert_with(|| UserEntitlement::new(user_id));
        user.cooldown_until = Some(until);
        user.daily_loss_count = 0;
    }

    async fn increment_daily_loss(&self, user_id: i64) -> u32 {
        let mut users = self.users.lock().await;
        let user = users
            .entry(user_id)
            .or_insert_with(|| UserEntitlement::new(user_id));
        user.daily_loss_count += 1;
        user.daily_loss_count
    }

    async fn set_news_prefs(&self, user_id: i64, prefs: NewsPrefs) {
        self.prefs.lock().await.insert(user_id, prefs);
    }

    async fn news_subscribers(&self) -> Vec<(i64, NewsPrefs)> {
        self.prefs
            .lock()
            .await
            .iter()
            .filter(|(_, p)| p.any())
            .map(|(&id, &p)| (id, p))
            .collect()
    }
}

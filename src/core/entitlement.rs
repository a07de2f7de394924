use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::Tier;
use crate::store::UserStore;

/// News-lockdown snapshot. Replaced wholesale by the periodic calendar
/// check; readers never observe a torn active/reason pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockdownState {
    pub active: bool,
    pub reason: String,
}

impl LockdownState {
    pub fn clear() -> Self {
        Self {
            active: false,
            reason: String::new(),
        }
    }
}

#[derive(Default)]
pub struct LockdownMonitor {
    state: RwLock<Arc<LockdownState>>,
}

impl LockdownMonitor {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(LockdownState::clear())),
        }
    }

    pub async fn snapshot(&self) -> Arc<LockdownState> {
        self.state.read().await.clone()
    }

    pub async fn replace(&self, active: bool, reason: impl Into<String>) {
        let next = Arc::new(LockdownState {
            active,
            reason: reason.into(),
        });
        *self.state.write().await = next;
    }
}

/// Per-user gating record. Quota resets implicitly by date comparison;
/// cooldown is set explicitly by the loss protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntitlement {
    pub user_id: i64,
    pub tier: Tier,
    pub last_free_signal_date: Option<NaiveDate>,
    pub daily_loss_count: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl UserEntitlement {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            tier: Tier::Free,
            last_free_signal_date: None,
            daily_loss_count: 0,
            cooldown_until: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    NewsLockdown,
    LossCooldown,
    DailyQuota,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NewsLockdown => write!(f, "news lockdown"),
            BlockReason::LossCooldown => write!(f, "loss cooldown"),
            BlockReason::DailyQuota => write!(f, "daily quota exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Block(BlockReason),
}

/// Decides whether a signal may be evaluated/delivered for a user.
/// Check order: global lockdown, loss cooldown, free daily quota.
pub struct EntitlementGate {
    lockdown: Arc<LockdownMonitor>,
    store: Arc<dyn UserStore>,
    tz: Tz,
    max_daily_losses: u32,
}

impl EntitlementGate {
    pub fn new(
        lockdown: Arc<LockdownMonitor>,
        store: Arc<dyn UserStore>,
        tz: Tz,
        max_daily_losses: u32,
    ) -> Self {
        Self {
            lockdown,
            store,
            tz,
            max_daily_losses,
        }
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    pub async fn check(&self, user_id: i64) -> Access {
        let lock = self.lockdown.snapshot().await;
        if lock.active {
            return Access::Block(BlockReason::NewsLockdown);
        }

        let user = self.store.get_or_create(user_id).await;

        if let Some(until) = user.cooldown_until {
            if until > Utc::now() {
                return Access::Block(BlockReason::LossCooldown);
            }
        }

        if user.tier == Tier::Free && user.last_free_signal_date == Some(self.today()) {
            return Access::Block(BlockReason::DailyQuota);
        }

        Access::Allow
    }

    /// Second half of the check-then-commit protocol: mark the free daily
    /// quota consumed. Idempotent within a day.
    pub async fn commit_free_quota(&self, user_id: i64, date: NaiveDate) {
        self.store.set_free_signal_date(user_id, date).await;
    }

    /// Post-trade-loss protocol: at the configured loss count, freeze the
    /// user until end of day (configured timezone) and reset the count in
    /// the same update.
    pub async fn record_trade_outcome(&self, user_id: i64, is_loss: bool) {
        if !is_loss {
            return;
        }
        let count = self.store.increment_daily_loss(user_id).await;
        if count >= self.max_daily_losses {
            let until = end_of_day_utc(self.tz, Utc::now());
            self.store.set_cooldown(user_id, until).await;
            info!("user {} in loss cooldown until {}", user_id, until);
        }
    }
}

/// 23:59:59 of `now`'s calendar day in `tz`, expressed in UTC.
pub(crate) fn end_of_day_utc(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&tz)
        .date_naive()
        .and_hms_opt(23, 59, 59)
        .and_then(|naive| tz.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

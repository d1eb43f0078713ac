//! Monthly character quota tracking.
//!
//! Invocations in this process reserve characters before spending them and
//! settle the reservation when they commit, so a batch, a priority drain and
//! a product translation running at the same time share one budget.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::error::PipelineResult;
use super::job_store::QuotaStore;
use crate::models::quota::{current_month_key, MonthlyQuota};

/// Reads and updates the monthly character budget.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    monthly_limit: i64,
    /// Characters claimed by running invocations but not yet committed.
    reserved: Arc<Mutex<i64>>,
}

/// Exclusive view of the budget. Holding it keeps other invocations from
/// reserving until it is dropped.
pub struct BudgetGuard<'a> {
    reserved: MutexGuard<'a, i64>,
    stored_remaining: i64,
}

impl BudgetGuard<'_> {
    /// Characters left after every outstanding reservation.
    pub fn available(&self) -> i64 {
        (self.stored_remaining - *self.reserved).max(0)
    }

    /// Like [`available`](Self::available) but ignoring `own` characters the
    /// caller reserved earlier.
    pub fn available_excluding(&self, own: i64) -> i64 {
        (self.stored_remaining - (*self.reserved - own)).max(0)
    }

    pub fn reserve(&mut self, characters: i64) {
        *self.reserved += characters.max(0);
    }
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn QuotaStore>, monthly_limit: i64) -> Self {
        Self {
            store,
            monthly_limit,
            reserved: Arc::new(Mutex::new(0)),
        }
    }

    pub fn monthly_limit(&self) -> i64 {
        self.monthly_limit
    }

    /// True while the current month still has budget left.
    pub async fn check_monthly_limit(&self) -> PipelineResult<bool> {
        Ok(!self.usage(None).await?.is_exhausted())
    }

    /// Budget left for new work: the stored remainder minus reservations.
    pub async fn remaining_characters(&self) -> PipelineResult<i64> {
        Ok(self.budget().await?.available())
    }

    /// Locks the reservation ledger and reads the stored remainder.
    pub async fn budget(&self) -> PipelineResult<BudgetGuard<'_>> {
        let reserved = self.reserved.lock().await;
        let stored_remaining = self.usage(None).await?.remaining();
        Ok(BudgetGuard {
            reserved,
            stored_remaining,
        })
    }

    /// Characters currently reserved by running invocations.
    #[cfg(test)]
    pub(crate) async fn reserved_characters(&self) -> i64 {
        *self.reserved.lock().await
    }

    /// Usage of `month` (`YYYY-MM`), defaulting to the current month. A month
    /// without a row reports zero usage against the configured limit.
    pub async fn usage(&self, month: Option<&str>) -> PipelineResult<MonthlyQuota> {
        let month = month.map(str::to_string).unwrap_or_else(current_month_key);
        let quota = self.store.find(&month).await?;
        Ok(quota.unwrap_or_else(|| MonthlyQuota::empty(month, self.monthly_limit)))
    }

    /// Commits `used` characters and releases a `reserved` amount in one step.
    /// The reservation is released even when the commit fails.
    pub async fn settle(
        &self,
        reserved: i64,
        used: i64,
    ) -> PipelineResult<Option<MonthlyQuota>> {
        let mut ledger = self.reserved.lock().await;
        let result = self.record_usage(used).await;
        *ledger = (*ledger - reserved.max(0)).max(0);
        result
    }

    /// Commits one invocation's characters. Zero characters touch nothing.
    pub async fn record_usage(&self, characters: i64) -> PipelineResult<Option<MonthlyQuota>> {
        if characters <= 0 {
            return Ok(None);
        }

        let month = current_month_key();
        let quota = self
            .store
            .record_usage(&month, characters, self.monthly_limit)
            .await?;

        tracing::debug!(
            month = %month,
            characters = characters,
            characters_used = quota.characters_used,
            characters_limit = quota.characters_limit,
            "Recorded translation usage"
        );

        Ok(Some(quota))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::InMemoryTranslationStore;

    fn tracker(limit: i64) -> (Arc<InMemoryTranslationStore>, QuotaTracker) {
        let store = Arc::new(InMemoryTranslationStore::new());
        let tracker = QuotaTracker::new(store.clone(), limit);
        (store, tracker)
    }

    #[tokio::test]
    async fn test_missing_row_means_full_budget() {
        let (store, tracker) = tracker(1000);
        assert!(tracker.check_monthly_limit().await.unwrap());
        assert_eq!(tracker.remaining_characters().await.unwrap(), 1000);
        assert!(store.find(&current_month_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_usage_is_monotonic() {
        let (_, tracker) = tracker(1000);
        let before = tracker.usage(None).await.unwrap().characters_used;

        tracker.record_usage(300).await.unwrap();
        let after = tracker.usage(None).await.unwrap();
        assert_eq!(after.characters_used, before + 300);
        assert_eq!(after.api_calls, 1);

        tracker.record_usage(700).await.unwrap();
        let after = tracker.usage(None).await.unwrap();
        assert_eq!(after.characters_used, 1000);
        assert_eq!(after.api_calls, 2);
        assert!(!tracker.check_monthly_limit().await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_usage_touches_nothing() {
        let (store, tracker) = tracker(1000);
        assert!(tracker.record_usage(0).await.unwrap().is_none());
        assert!(store.find(&current_month_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reservations_shrink_shared_budget() {
        let (_, tracker) = tracker(1000);
        let other = tracker.clone();

        {
            let mut budget = tracker.budget().await.unwrap();
            assert_eq!(budget.available(), 1000);
            budget.reserve(600);
        }
        assert_eq!(other.remaining_characters().await.unwrap(), 400);
        assert_eq!(
            other.budget().await.unwrap().available_excluding(600),
            1000
        );

        // 500 of the 600 reserved were actually spent
        let quota = tracker.settle(600, 500).await.unwrap().unwrap();
        assert_eq!(quota.characters_used, 500);
        assert_eq!(quota.api_calls, 1);
        assert_eq!(other.reserved_characters().await, 0);
        assert_eq!(other.remaining_characters().await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_settle_without_usage_only_releases() {
        let (store, tracker) = tracker(1000);
        tracker.budget().await.unwrap().reserve(200);

        assert!(tracker.settle(200, 0).await.unwrap().is_none());
        assert_eq!(tracker.reserved_characters().await, 0);
        assert!(store.find(&current_month_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_usage_for_other_month() {
        let (store, tracker) = tracker(1000);
        let mut old = MonthlyQuota::empty("2025-01", 1000);
        old.characters_used = 42;
        store.seed_quota(old);

        let usage = tracker.usage(Some("2025-01")).await.unwrap();
        assert_eq!(usage.characters_used, 42);
        let usage = tracker.usage(Some("2025-02")).await.unwrap();
        assert_eq!(usage.characters_used, 0);
    }
}

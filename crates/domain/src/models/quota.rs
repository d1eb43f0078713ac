//! Monthly character quota models.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Default monthly character budget for the translation API.
pub const DEFAULT_MONTHLY_CHARACTER_LIMIT: i64 = 500_000;

/// Aggregate usage for one calendar month (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyQuota {
    pub month_year: String,
    pub characters_used: i64,
    pub characters_limit: i64,
    pub api_calls: i64,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyQuota {
    /// A zeroed quota for a month with no recorded usage yet.
    pub fn empty(month_year: impl Into<String>, characters_limit: i64) -> Self {
        Self {
            month_year: month_year.into(),
            characters_used: 0,
            characters_limit,
            api_calls: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.characters_used >= self.characters_limit
    }

    pub fn remaining(&self) -> i64 {
        (self.characters_limit - self.characters_used).max(0)
    }

    /// Share of the budget used, in percent (0-100, may exceed 100 on overrun).
    pub fn percent_used(&self) -> f64 {
        if self.characters_limit <= 0 {
            return 100.0;
        }
        (self.characters_used as f64 / self.characters_limit as f64) * 100.0
    }
}

/// Response body for the quota usage endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct QuotaUsageResponse {
    pub month_year: String,
    pub characters_used: i64,
    pub characters_limit: i64,
    pub characters_remaining: i64,
    pub api_calls: i64,
    pub percent_used: f64,
    pub limit_exceeded: bool,
}

impl From<MonthlyQuota> for QuotaUsageResponse {
    fn from(quota: MonthlyQuota) -> Self {
        Self {
            characters_remaining: quota.remaining(),
            percent_used: (quota.percent_used() * 100.0).round() / 100.0,
            limit_exceeded: quota.is_exhausted(),
            month_year: quota.month_year,
            characters_used: quota.characters_used,
            characters_limit: quota.characters_limit,
            api_calls: quota.api_calls,
        }
    }
}

/// Calendar month key (`YYYY-MM`) used by the quota table.
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// Month key for the current instant.
pub fn current_month_key() -> String {
    month_key(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_key_pads_month() {
        let at = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(month_key(at), "2026-03");
    }

    #[test]
    fn test_month_key_december() {
        let at = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(month_key(at), "2025-12");
    }

    #[test]
    fn test_quota_exhaustion() {
        let mut quota = MonthlyQuota::empty("2026-10", 1000);
        assert!(!quota.is_exhausted());
        assert_eq!(quota.remaining(), 1000);

        quota.characters_used = 999;
        assert!(!quota.is_exhausted());
        assert_eq!(quota.remaining(), 1);

        quota.characters_used = 1000;
        assert!(quota.is_exhausted());
        assert_eq!(quota.remaining(), 0);

        quota.characters_used = 1200;
        assert_eq!(quota.remaining(), 0);
    }

    #[test]
    fn test_usage_response() {
        let mut quota = MonthlyQuota::empty("2026-10", 500_000);
        quota.characters_used = 125_000;
        quota.api_calls = 12;
        let response: QuotaUsageResponse = quota.into();
        assert_eq!(response.characters_remaining, 375_000);
        assert_eq!(response.percent_used, 25.0);
        assert!(!response.limit_exceeded);
        assert_eq!(response.api_calls, 12);
    }
}

//! Monthly quota repository.

use async_trait::async_trait;
use domain::models::MonthlyQuota;
use domain::services::QuotaStore;
use sqlx::PgPool;

use crate::entities::MonthlyQuotaEntity;
use crate::metrics::QueryTimer;

/// Repository for the translation_quota table.
#[derive(Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    /// Creates a new QuotaRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for QuotaRepository {
    async fn find(&self, month_year: &str) -> Result<Option<MonthlyQuota>, sqlx::Error> {
        let timer = QueryTimer::new("find_monthly_quota");
        let result = sqlx::query_as::<_, MonthlyQuotaEntity>(
            r#"
            SELECT month_year, characters_used, characters_limit, api_calls, updated_at
            FROM translation_quota
            WHERE month_year = $1
            "#,
        )
        .bind(month_year)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(MonthlyQuota::from))
    }

    async fn record_usage(
        &self,
        month_year: &str,
        characters: i64,
        default_limit: i64,
    ) -> Result<MonthlyQuota, sqlx::Error> {
        let timer = QueryTimer::new("record_quota_usage");
        let result = sqlx::query_as::<_, MonthlyQuotaEntity>(
            r#"
            INSERT INTO translation_quota
                (month_year, characters_used, characters_limit, api_calls, updated_at)
            VALUES ($1, $2, $3, 1, NOW())
            ON CONFLICT (month_year) DO UPDATE
            SET characters_used = translation_quota.characters_used + EXCLUDED.characters_used,
                api_calls = translation_quota.api_calls + 1,
                updated_at = NOW()
            RETURNING month_year, characters_used, characters_limit, api_calls, updated_at
            "#,
        )
        .bind(month_year)
        .bind(characters)
        .bind(default_limit)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}

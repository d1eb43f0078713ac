//! Monthly quota entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::MonthlyQuota;
use sqlx::FromRow;

/// Database row mapping for the translation_quota table.
#[derive(Debug, Clone, FromRow)]
pub struct MonthlyQuotaEntity {
    pub month_year: String,
    pub characters_used: i64,
    pub characters_limit: i64,
    pub api_calls: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<MonthlyQuotaEntity> for MonthlyQuota {
    fn from(entity: MonthlyQuotaEntity) -> Self {
        Self {
            month_year: entity.month_year,
            characters_used: entity.characters_used,
            characters_limit: entity.characters_limit,
            api_calls: entity.api_calls,
            updated_at: entity.updated_at,
        }
    }
}

//! Translation API key entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{ApiKeyCredential, KeyStatus};
use sqlx::FromRow;

/// Database row mapping for the translation_api_keys table.
#[derive(Clone, FromRow)]
pub struct ApiKeyCredentialEntity {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub masked_key: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub status: String,
    pub quota_used: Option<i64>,
    pub quota_limit: Option<i64>,
    pub quota_remaining: Option<i64>,
    pub last_error: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiKeyCredentialEntity> for ApiKeyCredential {
    fn from(entity: ApiKeyCredentialEntity) -> Self {
        // Rows are CHECK-constrained; anything unexpected reads as an error key.
        let status = entity.status.parse().unwrap_or(KeyStatus::Error);
        Self {
            id: entity.id,
            name: entity.name,
            api_key: entity.api_key,
            masked_key: entity.masked_key,
            is_primary: entity.is_primary,
            is_active: entity.is_active,
            status,
            quota_used: entity.quota_used,
            quota_limit: entity.quota_limit,
            quota_remaining: entity.quota_remaining,
            last_error: entity.last_error,
            last_tested_at: entity.last_tested_at,
            last_synced_at: entity.last_synced_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

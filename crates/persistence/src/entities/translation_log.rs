//! Translation log entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::TranslationLog;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the translation_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct TranslationLogEntity {
    pub id: i64,
    pub product_id: Uuid,
    pub api_key_id: Option<i64>,
    pub api_key_name: Option<String>,
    pub translation_mode: String,
    pub field_name: String,
    pub source_language: String,
    pub target_language: String,
    pub status: String,
    pub characters_used: i64,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<TranslationLogEntity> for TranslationLog {
    fn from(entity: TranslationLogEntity) -> Self {
        Self {
            id: entity.id,
            product_id: entity.product_id,
            api_key_id: entity.api_key_id,
            api_key_name: entity.api_key_name,
            translation_mode: entity.translation_mode,
            field_name: entity.field_name,
            source_language: entity.source_language,
            target_language: entity.target_language,
            status: entity.status,
            characters_used: entity.characters_used,
            error_message: entity.error_message,
            processing_time_ms: entity.processing_time_ms,
            request_payload: entity.request_payload,
            response_payload: entity.response_payload,
            created_at: entity.created_at,
        }
    }
}

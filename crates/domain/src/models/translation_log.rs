//! Audit trail of the synchronous product translation path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::api_key_credential::KeySelectionMode;

pub const LOG_STATUS_SUCCESS: &str = "success";
pub const LOG_STATUS_ERROR: &str = "error";

/// One field/language translation attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TranslationLog {
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

/// A log row about to be appended.
#[derive(Debug, Clone)]
pub struct NewTranslationLog {
    pub product_id: Uuid,
    pub api_key_id: Option<i64>,
    pub api_key_name: Option<String>,
    pub translation_mode: KeySelectionMode,
    pub field_name: String,
    pub source_language: String,
    pub target_language: String,
    pub status: &'static str,
    pub characters_used: i64,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub request_payload: serde_json::Value,
    pub response_payload: Option<serde_json::Value>,
}

/// Query parameters for listing translation logs.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTranslationLogsQuery {
    pub product_id: Option<Uuid>,
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    50
}

impl ListTranslationLogsQuery {
    pub fn limit_clamped(&self) -> i64 {
        self.limit.clamp(1, 500)
    }
}

/// Request to translate one product synchronously.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TranslateProductRequest {
    /// Empty means every configured target language.
    #[serde(default)]
    pub target_languages: Vec<String>,

    /// Key selection mode for this call; the configured default when absent.
    #[serde(default)]
    pub mode: Option<KeySelectionMode>,
}

/// Result for one field/language pair of a product translation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProductFieldResult {
    pub field_name: String,
    pub target_language: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub characters_used: i64,
}

/// Response for a product translation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TranslateProductResponse {
    pub product_id: Uuid,
    pub mode: KeySelectionMode,
    pub succeeded: usize,
    pub failed: usize,
    pub total_characters_used: i64,
    pub results: Vec<ProductFieldResult>,
}

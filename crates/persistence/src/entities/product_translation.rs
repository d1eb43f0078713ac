//! Product translation entity (database row mapping).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the product_translations table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductTranslationEntity {
    pub id: i64,
    pub product_id: Uuid,
    pub language: String,
    pub field_name: String,
    pub translated_text: String,
    pub updated_at: DateTime<Utc>,
}

//! Repository for the append-only translation log.

use domain::models::{NewTranslationLog, TranslationLog};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TranslationLogEntity;
use crate::metrics::QueryTimer;

/// Repository for the translation_logs table.
#[derive(Clone)]
pub struct TranslationLogRepository {
    pool: PgPool,
}

impl TranslationLogRepository {
    /// Creates a new TranslationLogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, log: &NewTranslationLog) -> Result<TranslationLog, sqlx::Error> {
        let timer = QueryTimer::new("insert_translation_log");
        let result = sqlx::query_as::<_, TranslationLogEntity>(
            r#"
            INSERT INTO translation_logs (
                product_id, api_key_id, api_key_name, translation_mode, field_name,
                source_language, target_language, status, characters_used, error_message,
                processing_time_ms, request_payload, response_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(log.product_id)
        .bind(log.api_key_id)
        .bind(&log.api_key_name)
        .bind(log.translation_mode.as_str())
        .bind(&log.field_name)
        .bind(&log.source_language)
        .bind(&log.target_language)
        .bind(log.status)
        .bind(log.characters_used)
        .bind(&log.error_message)
        .bind(log.processing_time_ms)
        .bind(&log.request_payload)
        .bind(&log.response_payload)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    /// Newest rows first, optionally for one product.
    pub async fn list(
        &self,
        product_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<TranslationLog>, sqlx::Error> {
        let timer = QueryTimer::new("list_translation_logs");
        let result = sqlx::query_as::<_, TranslationLogEntity>(
            r#"
            SELECT *
            FROM translation_logs
            WHERE ($1::UUID IS NULL OR product_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(TranslationLog::from).collect())
    }
}

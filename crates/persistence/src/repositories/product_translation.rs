//! Repository for translated product fields.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ProductTranslationEntity;
use crate::metrics::QueryTimer;

/// Repository for the product_translations table.
#[derive(Clone)]
pub struct ProductTranslationRepository {
    pool: PgPool,
}

impl ProductTranslationRepository {
    /// Creates a new ProductTranslationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the translation of one product field.
    pub async fn upsert(
        &self,
        product_id: Uuid,
        language: &str,
        field_name: &str,
        translated_text: &str,
    ) -> Result<ProductTranslationEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_product_translation");
        let result = sqlx::query_as::<_, ProductTranslationEntity>(
            r#"
            INSERT INTO product_translations (product_id, language, field_name, translated_text)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, language, field_name) DO UPDATE
            SET translated_text = EXCLUDED.translated_text,
                updated_at = NOW()
            RETURNING id, product_id, language, field_name, translated_text, updated_at
            "#,
        )
        .bind(product_id)
        .bind(language)
        .bind(field_name)
        .bind(translated_text)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ProductTranslationEntity>, sqlx::Error> {
        sqlx::query_as::<_, ProductTranslationEntity>(
            r#"
            SELECT id, product_id, language, field_name, translated_text, updated_at
            FROM product_translations
            WHERE product_id = $1
            ORDER BY language, field_name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
    }
}

//! Repository for stored translation API keys.

use async_trait::async_trait;
use domain::models::{ApiKeyCredential, KeyStatus};
use domain::services::{CredentialSource, ProviderUsage};
use sqlx::PgPool;

use crate::entities::ApiKeyCredentialEntity;
use crate::metrics::QueryTimer;

const KEY_COLUMNS: &str = r#"
    id, name, api_key, masked_key, is_primary, is_active, status,
    quota_used, quota_limit, quota_remaining, last_error,
    last_tested_at, last_synced_at, created_at, updated_at
"#;

/// Repository for the translation_api_keys table.
#[derive(Clone)]
pub struct ApiKeyCredentialRepository {
    pool: PgPool,
}

impl ApiKeyCredentialRepository {
    /// Creates a new ApiKeyCredentialRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all keys, primary first then oldest first.
    pub async fn list(&self) -> Result<Vec<ApiKeyCredential>, sqlx::Error> {
        let timer = QueryTimer::new("list_translation_api_keys");
        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            "SELECT {} FROM translation_api_keys ORDER BY is_primary DESC, created_at, id",
            KEY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(ApiKeyCredential::from).collect())
    }

    /// Lists active keys, oldest first.
    pub async fn list_active(&self) -> Result<Vec<ApiKeyCredential>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_translation_api_keys");
        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            "SELECT {} FROM translation_api_keys WHERE is_active ORDER BY created_at, id",
            KEY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(ApiKeyCredential::from).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ApiKeyCredential>, sqlx::Error> {
        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            "SELECT {} FROM translation_api_keys WHERE id = $1",
            KEY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.map(ApiKeyCredential::from))
    }

    /// Stores a new key. A new primary key takes the flag from the others in
    /// the same transaction.
    pub async fn create(
        &self,
        name: &str,
        api_key: &str,
        is_primary: bool,
    ) -> Result<ApiKeyCredential, sqlx::Error> {
        let timer = QueryTimer::new("create_translation_api_key");
        let mut tx = self.pool.begin().await?;

        if is_primary {
            sqlx::query(
                "UPDATE translation_api_keys SET is_primary = FALSE, updated_at = NOW() WHERE is_primary",
            )
            .execute(&mut *tx)
            .await?;
        }

        let entity = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            r#"
            INSERT INTO translation_api_keys (name, api_key, masked_key, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            KEY_COLUMNS
        ))
        .bind(name)
        .bind(api_key)
        .bind(shared::crypto::mask_api_key(api_key))
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(entity.into())
    }

    /// Deletes a key. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM translation_api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Makes `id` the only primary key. Returns `None` if it does not exist.
    pub async fn set_primary(&self, id: i64) -> Result<Option<ApiKeyCredential>, sqlx::Error> {
        let timer = QueryTimer::new("set_primary_translation_api_key");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE translation_api_keys
            SET is_primary = FALSE, updated_at = NOW()
            WHERE is_primary AND id <> $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let entity = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            r#"
            UPDATE translation_api_keys
            SET is_primary = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            KEY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if entity.is_some() {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        timer.record();
        Ok(entity.map(ApiKeyCredential::from))
    }

    pub async fn set_active(
        &self,
        id: i64,
        is_active: bool,
    ) -> Result<Option<ApiKeyCredential>, sqlx::Error> {
        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            r#"
            UPDATE translation_api_keys
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            KEY_COLUMNS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.map(ApiKeyCredential::from))
    }

    /// Stores the result of a connection test.
    pub async fn record_test_result(
        &self,
        id: i64,
        status: KeyStatus,
        usage: Option<ProviderUsage>,
        last_error: Option<&str>,
    ) -> Result<Option<ApiKeyCredential>, sqlx::Error> {
        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            r#"
            UPDATE translation_api_keys
            SET status = $2,
                quota_used = COALESCE($3, quota_used),
                quota_limit = COALESCE($4, quota_limit),
                quota_remaining = COALESCE($5, quota_remaining),
                last_error = $6,
                last_tested_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            KEY_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(usage.map(|u| u.character_count))
        .bind(usage.map(|u| u.character_limit))
        .bind(usage.map(|u| u.remaining()))
        .bind(last_error)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.map(ApiKeyCredential::from))
    }

    /// Stores freshly read usage numbers.
    pub async fn record_usage(
        &self,
        id: i64,
        usage: ProviderUsage,
    ) -> Result<Option<ApiKeyCredential>, sqlx::Error> {
        let status = if usage.remaining() == 0 {
            KeyStatus::QuotaExceeded
        } else {
            KeyStatus::Active
        };

        let result = sqlx::query_as::<_, ApiKeyCredentialEntity>(&format!(
            r#"
            UPDATE translation_api_keys
            SET status = $2,
                quota_used = $3,
                quota_limit = $4,
                quota_remaining = $5,
                last_synced_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            KEY_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(usage.character_count)
        .bind(usage.character_limit)
        .bind(usage.remaining())
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.map(ApiKeyCredential::from))
    }
}

#[async_trait]
impl CredentialSource for ApiKeyCredentialRepository {
    async fn active_credentials(&self) -> Result<Vec<ApiKeyCredential>, sqlx::Error> {
        self.list_active().await
    }
}

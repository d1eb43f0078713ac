//! Read-only access to FAQ items and products.

use async_trait::async_trait;
use domain::models::ContentType;
use domain::services::{ContentItem, ContentSource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{FaqItemEntity, ProductEntity};
use crate::metrics::QueryTimer;

/// Repository over the faq_items and products tables.
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    /// Creates a new ContentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_product(&self, id: Uuid) -> Result<Option<ProductEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_product_by_id");
        let result = sqlx::query_as::<_, ProductEntity>(
            r#"
            SELECT id, name, short_description, description, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_faq_items(&self) -> Result<Vec<FaqItemEntity>, sqlx::Error> {
        sqlx::query_as::<_, FaqItemEntity>(
            "SELECT id, question, answer, created_at FROM faq_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_products(&self) -> Result<Vec<ProductEntity>, sqlx::Error> {
        sqlx::query_as::<_, ProductEntity>(
            r#"
            SELECT id, name, short_description, description, created_at
            FROM products
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl ContentSource for ContentRepository {
    async fn list_items(&self, content_type: ContentType) -> Result<Vec<ContentItem>, sqlx::Error> {
        let timer = QueryTimer::new("list_content_items");
        let items = match content_type {
            ContentType::Faq => self
                .list_faq_items()
                .await?
                .into_iter()
                .map(ContentItem::from)
                .collect(),
            ContentType::Product => self
                .list_products()
                .await?
                .into_iter()
                .map(ContentItem::from)
                .collect(),
        };
        timer.record();
        Ok(items)
    }
}

//! Source content entities (read-only row mappings).

use chrono::{DateTime, Utc};
use domain::models::translation_job::{ContentField, ContentType};
use domain::services::ContentItem;
use sqlx::FromRow;
use uuid::Uuid;

/// Product fields scheduled for translation, as stored in content ids.
pub const PRODUCT_FIELDS: [&str; 3] = ["name", "shortDescription", "description"];

/// FAQ fields scheduled for translation.
pub const FAQ_FIELDS: [&str; 2] = ["question", "answer"];

/// Database row mapping for the faq_items table.
#[derive(Debug, Clone, FromRow)]
pub struct FaqItemEntity {
    pub id: i32,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl From<FaqItemEntity> for ContentItem {
    fn from(entity: FaqItemEntity) -> Self {
        Self {
            content_type: ContentType::Faq,
            content_id: entity.id.to_string(),
            fields: vec![
                ContentField::new(FAQ_FIELDS[0], entity.question),
                ContentField::new(FAQ_FIELDS[1], entity.answer),
            ],
        }
    }
}

/// Database row mapping for the products table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductEntity {
    /// Translatable fields, blank ones included.
    pub fn fields(&self) -> Vec<ContentField> {
        vec![
            ContentField::new(PRODUCT_FIELDS[0], self.name.clone()),
            ContentField::new(
                PRODUCT_FIELDS[1],
                self.short_description.clone().unwrap_or_default(),
            ),
            ContentField::new(PRODUCT_FIELDS[2], self.description.clone().unwrap_or_default()),
        ]
    }
}

impl From<ProductEntity> for ContentItem {
    fn from(entity: ProductEntity) -> Self {
        Self {
            content_type: ContentType::Product,
            content_id: entity.id.to_string(),
            fields: entity.fields(),
        }
    }
}

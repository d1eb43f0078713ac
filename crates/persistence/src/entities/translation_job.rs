//! Translation job entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::stats::LanguageStatusCount;
use domain::models::translation_job::{TranslationJob, UnknownJobStatus};
use domain::services::PriorityProgress;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the translation_jobs table.
#[derive(Debug, Clone, FromRow)]
pub struct TranslationJobEntity {
    pub id: Uuid,
    pub content_type: String,
    pub content_id: String,
    pub source_language: String,
    pub target_language: String,
    pub source_content: String,
    pub translated_content: Option<String>,
    pub status: String,
    pub characters_used: i64,
    pub error_message: Option<String>,
    pub priority_tag: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub priority_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TranslationJobEntity> for TranslationJob {
    type Error = UnknownJobStatus;

    fn try_from(entity: TranslationJobEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            content_type: entity.content_type,
            content_id: entity.content_id,
            source_language: entity.source_language,
            target_language: entity.target_language,
            source_content: entity.source_content,
            translated_content: entity.translated_content,
            status: entity.status.parse()?,
            characters_used: entity.characters_used,
            error_message: entity.error_message,
            priority_tag: entity.priority_tag,
            claimed_at: entity.claimed_at,
            priority_started_at: entity.priority_started_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

/// Pending job id with its billable character count, read while claiming.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimCandidateEntity {
    pub id: Uuid,
    pub characters: i64,
}

/// Row of the (language, status) count query.
#[derive(Debug, Clone, FromRow)]
pub struct LanguageStatusCountEntity {
    pub target_language: String,
    pub status: String,
    pub count: i64,
}

impl TryFrom<LanguageStatusCountEntity> for LanguageStatusCount {
    type Error = UnknownJobStatus;

    fn try_from(entity: LanguageStatusCountEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            target_language: entity.target_language,
            status: entity.status.parse()?,
            count: entity.count,
        })
    }
}

/// Row of the priority progress query.
#[derive(Debug, Clone, FromRow)]
pub struct PriorityProgressEntity {
    pub started_at: DateTime<Utc>,
    pub total: i64,
    pub processed: i64,
}

impl From<PriorityProgressEntity> for PriorityProgress {
    fn from(entity: PriorityProgressEntity) -> Self {
        Self {
            started_at: entity.started_at,
            total: entity.total,
            processed: entity.processed,
        }
    }
}

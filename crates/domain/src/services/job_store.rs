//! Storage seams of the translation pipeline.
//!
//! The persistence crate implements these against PostgreSQL; the in-memory
//! store backs unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::api_key_credential::ApiKeyCredential;
use crate::models::quota::MonthlyQuota;
use crate::models::stats::LanguageStatusCount;
use crate::models::translation_job::{ContentField, ContentType, NewTranslationJob, TranslationJob};

/// Result of trying to claim the next pending job.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The job moved pending -> processing and belongs to the caller.
    Claimed(TranslationJob),
    /// No pending job matched.
    Empty,
    /// The oldest pending job does not fit the remaining budget. Nothing was
    /// mutated.
    OverBudget { job_id: Uuid, characters: i64 },
}

/// Progress of the most recent priority drain of one language, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityProgress {
    pub started_at: DateTime<Utc>,
    pub total: i64,
    pub processed: i64,
}

impl PriorityProgress {
    pub fn remaining(&self) -> i64 {
        (self.total - self.processed).max(0)
    }
}

/// Translation job persistence.
#[async_trait]
pub trait TranslationJobStore: Send + Sync {
    /// Inserts pending jobs. Returns the number of rows written.
    async fn insert_jobs(&self, jobs: &[NewTranslationJob]) -> Result<u64, sqlx::Error>;

    /// Atomically claims the oldest pending job, optionally restricted to one
    /// target language, if its character count is at most `budget`.
    async fn claim_next(
        &self,
        target_language: Option<&str>,
        budget: i64,
    ) -> Result<ClaimOutcome, sqlx::Error>;

    /// Marks up to `limit` of the language's oldest pending jobs as
    /// processing with the given priority tag. Stops before the first job
    /// that would push the running character total over `budget`.
    async fn claim_priority_batch(
        &self,
        target_language: &str,
        tag: &str,
        started_at: DateTime<Utc>,
        limit: i64,
        budget: i64,
    ) -> Result<Vec<TranslationJob>, sqlx::Error>;

    /// processing -> completed. Clears the priority tag. Returns false if the
    /// job was not processing.
    async fn mark_completed(
        &self,
        id: Uuid,
        translated_content: &str,
        characters_used: i64,
    ) -> Result<bool, sqlx::Error>;

    /// processing -> failed. Clears the priority tag. Returns false if the job
    /// was not processing.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool, sqlx::Error>;

    /// Languages that have processing jobs carrying a priority tag.
    async fn active_priority_languages(&self) -> Result<Vec<String>, sqlx::Error>;

    /// Progress of the language's most recent priority drain, if any.
    async fn priority_progress(
        &self,
        target_language: &str,
    ) -> Result<Option<PriorityProgress>, sqlx::Error>;

    async fn count_by_language_and_status(&self) -> Result<Vec<LanguageStatusCount>, sqlx::Error>;

    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error>;

    /// Most recently updated jobs first.
    async fn recent(&self, limit: i64) -> Result<Vec<TranslationJob>, sqlx::Error>;

    /// Newest job for the exact (type, content id, language) triple.
    async fn find_latest(
        &self,
        content_type: &str,
        content_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>, sqlx::Error>;

    /// processing -> failed for claims older than `claimed_before`, skipping
    /// the given languages. Returns the number of jobs failed.
    async fn fail_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        skip_languages: &[String],
        error_message: &str,
    ) -> Result<u64, sqlx::Error>;
}

/// Monthly quota persistence.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn find(&self, month_year: &str) -> Result<Option<MonthlyQuota>, sqlx::Error>;

    /// Adds `characters` and one API call to the month's row in a single
    /// atomic statement, creating the row with `default_limit` if missing.
    async fn record_usage(
        &self,
        month_year: &str,
        characters: i64,
        default_limit: i64,
    ) -> Result<MonthlyQuota, sqlx::Error>;
}

/// One source content item with its translatable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub content_type: ContentType,
    pub content_id: String,
    pub fields: Vec<ContentField>,
}

/// Read-only access to the FAQ and product tables.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_items(&self, content_type: ContentType) -> Result<Vec<ContentItem>, sqlx::Error>;
}

/// Read access to stored translation API keys.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Active keys, oldest first.
    async fn active_credentials(&self) -> Result<Vec<ApiKeyCredential>, sqlx::Error>;
}

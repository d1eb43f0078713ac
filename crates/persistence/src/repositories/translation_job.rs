//! Translation job repository.
//!
//! Claims lock the candidate rows with `FOR UPDATE SKIP LOCKED` inside a
//! transaction, so concurrent batches and drains never pick the same job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::stats::LanguageStatusCount;
use domain::models::translation_job::{NewTranslationJob, TranslationJob};
use domain::services::{ClaimOutcome, PriorityProgress, TranslationJobStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    ClaimCandidateEntity, LanguageStatusCountEntity, PriorityProgressEntity, TranslationJobEntity,
};
use crate::metrics::QueryTimer;

const JOB_COLUMNS: &str = r#"
    id, content_type, content_id, source_language, target_language,
    source_content, translated_content, status, characters_used, error_message,
    priority_tag, claimed_at, priority_started_at, created_at, updated_at
"#;

fn into_job(entity: TranslationJobEntity) -> Result<TranslationJob, sqlx::Error> {
    TranslationJob::try_from(entity).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn into_jobs(entities: Vec<TranslationJobEntity>) -> Result<Vec<TranslationJob>, sqlx::Error> {
    entities.into_iter().map(into_job).collect()
}

/// Repository for translation job operations.
#[derive(Clone)]
pub struct TranslationJobRepository {
    pool: PgPool,
}

impl TranslationJobRepository {
    /// Creates a new TranslationJobRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranslationJobStore for TranslationJobRepository {
    async fn insert_jobs(&self, jobs: &[NewTranslationJob]) -> Result<u64, sqlx::Error> {
        if jobs.is_empty() {
            return Ok(0);
        }

        let mut content_types = Vec::with_capacity(jobs.len());
        let mut content_ids = Vec::with_capacity(jobs.len());
        let mut source_languages = Vec::with_capacity(jobs.len());
        let mut target_languages = Vec::with_capacity(jobs.len());
        let mut source_contents = Vec::with_capacity(jobs.len());
        for job in jobs {
            content_types.push(job.content_type.clone());
            content_ids.push(job.content_id.clone());
            source_languages.push(job.source_language.clone());
            target_languages.push(job.target_language.clone());
            source_contents.push(job.source_content.clone());
        }

        let timer = QueryTimer::new("insert_translation_jobs");
        let result = sqlx::query(
            r#"
            INSERT INTO translation_jobs
                (content_type, content_id, source_language, target_language, source_content)
            SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::TEXT[])
            "#,
        )
        .bind(&content_types)
        .bind(&content_ids)
        .bind(&source_languages)
        .bind(&target_languages)
        .bind(&source_contents)
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result?.rows_affected())
    }

    async fn claim_next(
        &self,
        target_language: Option<&str>,
        budget: i64,
    ) -> Result<ClaimOutcome, sqlx::Error> {
        let timer = QueryTimer::new("claim_next_translation_job");
        let mut tx = self.pool.begin().await?;

        let candidate = sqlx::query_as::<_, ClaimCandidateEntity>(
            r#"
            SELECT id, char_length(source_content)::BIGINT AS characters
            FROM translation_jobs
            WHERE status = 'pending'
              AND ($1::TEXT IS NULL OR target_language = $1)
            ORDER BY created_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(target_language)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(candidate) = candidate else {
            tx.rollback().await?;
            timer.record();
            return Ok(ClaimOutcome::Empty);
        };

        if candidate.characters > budget {
            tx.rollback().await?;
            timer.record();
            return Ok(ClaimOutcome::OverBudget {
                job_id: candidate.id,
                characters: candidate.characters,
            });
        }

        let entity = sqlx::query_as::<_, TranslationJobEntity>(&format!(
            r#"
            UPDATE translation_jobs
            SET status = 'processing', claimed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(candidate.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(ClaimOutcome::Claimed(into_job(entity)?))
    }

    async fn claim_priority_batch(
        &self,
        target_language: &str,
        tag: &str,
        started_at: DateTime<Utc>,
        limit: i64,
        budget: i64,
    ) -> Result<Vec<TranslationJob>, sqlx::Error> {
        let timer = QueryTimer::new("claim_priority_translation_jobs");
        let mut tx = self.pool.begin().await?;

        let candidates = sqlx::query_as::<_, ClaimCandidateEntity>(
            r#"
            SELECT id, char_length(source_content)::BIGINT AS characters
            FROM translation_jobs
            WHERE status = 'pending' AND target_language = $1
            ORDER BY created_at, id
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(target_language)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut running = 0i64;
        let ids: Vec<Uuid> = candidates
            .iter()
            .take_while(|candidate| {
                running += candidate.characters;
                running <= budget
            })
            .map(|candidate| candidate.id)
            .collect();

        if ids.is_empty() {
            tx.rollback().await?;
            timer.record();
            return Ok(Vec::new());
        }

        let entities = sqlx::query_as::<_, TranslationJobEntity>(&format!(
            r#"
            UPDATE translation_jobs
            SET status = 'processing',
                priority_tag = $2,
                priority_started_at = $3,
                claimed_at = $3,
                updated_at = NOW()
            WHERE id = ANY($1)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(&ids)
        .bind(tag)
        .bind(started_at)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        let mut jobs = into_jobs(entities)?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        translated_content: &str,
        characters_used: i64,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("complete_translation_job");
        let result = sqlx::query(
            r#"
            UPDATE translation_jobs
            SET status = 'completed',
                translated_content = $2,
                characters_used = $3,
                error_message = NULL,
                priority_tag = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(translated_content)
        .bind(characters_used)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("fail_translation_job");
        let result = sqlx::query(
            r#"
            UPDATE translation_jobs
            SET status = 'failed',
                error_message = $2,
                priority_tag = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn active_priority_languages(&self) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("active_priority_languages");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT target_language
            FROM translation_jobs
            WHERE status = 'processing' AND priority_tag IS NOT NULL
            ORDER BY target_language
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    async fn priority_progress(
        &self,
        target_language: &str,
    ) -> Result<Option<PriorityProgress>, sqlx::Error> {
        let timer = QueryTimer::new("priority_progress");
        let result = sqlx::query_as::<_, PriorityProgressEntity>(
            r#"
            SELECT priority_started_at AS started_at,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status <> 'processing') AS processed
            FROM translation_jobs
            WHERE target_language = $1
              AND priority_started_at = (
                  SELECT MAX(priority_started_at)
                  FROM translation_jobs
                  WHERE target_language = $1
              )
            GROUP BY priority_started_at
            "#,
        )
        .bind(target_language)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(PriorityProgress::from))
    }

    async fn count_by_language_and_status(&self) -> Result<Vec<LanguageStatusCount>, sqlx::Error> {
        let timer = QueryTimer::new("count_translation_jobs");
        let result = sqlx::query_as::<_, LanguageStatusCountEntity>(
            r#"
            SELECT target_language, status, COUNT(*) AS count
            FROM translation_jobs
            GROUP BY target_language, status
            ORDER BY target_language, status
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result?
            .into_iter()
            .map(|row| {
                LanguageStatusCount::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
            })
            .collect()
    }

    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let timer = QueryTimer::new("last_completed_translation_job");
        let result = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(updated_at) FROM translation_jobs WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    async fn recent(&self, limit: i64) -> Result<Vec<TranslationJob>, sqlx::Error> {
        let timer = QueryTimer::new("recent_translation_jobs");
        let result = sqlx::query_as::<_, TranslationJobEntity>(&format!(
            "SELECT {} FROM translation_jobs ORDER BY updated_at DESC, id LIMIT $1",
            JOB_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        into_jobs(result?)
    }

    async fn find_latest(
        &self,
        content_type: &str,
        content_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>, sqlx::Error> {
        let timer = QueryTimer::new("find_latest_translation_job");
        let result = sqlx::query_as::<_, TranslationJobEntity>(&format!(
            r#"
            SELECT {}
            FROM translation_jobs
            WHERE content_type = $1 AND content_id = $2 AND target_language = $3
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            JOB_COLUMNS
        ))
        .bind(content_type)
        .bind(content_id)
        .bind(target_language)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(into_job).transpose()
    }

    async fn fail_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        skip_languages: &[String],
        error_message: &str,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("fail_stale_translation_claims");
        let result = sqlx::query(
            r#"
            UPDATE translation_jobs
            SET status = 'failed',
                error_message = $3,
                priority_tag = NULL,
                updated_at = NOW()
            WHERE status = 'processing'
              AND (claimed_at IS NULL OR claimed_at < $1)
              AND NOT (target_language = ANY($2))
            "#,
        )
        .bind(claimed_before)
        .bind(skip_languages)
        .bind(error_message)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}

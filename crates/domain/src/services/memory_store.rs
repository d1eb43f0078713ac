//! In-memory implementation of the pipeline stores.
//!
//! Backs unit tests and local experiments without a database. Claims are
//! serialised by a single mutex, which gives the same guarantees as the
//! row-locking claim queries of the PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::job_store::{
    ClaimOutcome, ContentItem, ContentSource, PriorityProgress, QuotaStore, TranslationJobStore,
};
use crate::models::quota::MonthlyQuota;
use crate::models::stats::LanguageStatusCount;
use crate::models::translation_job::{ContentType, JobStatus, NewTranslationJob, TranslationJob};

#[derive(Debug, Default)]
struct State {
    jobs: Vec<TranslationJob>,
    quotas: HashMap<String, MonthlyQuota>,
    content: Vec<ContentItem>,
}

/// Job, quota and content store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTranslationStore {
    state: Mutex<State>,
}

impl InMemoryTranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of all jobs in insertion order.
    pub fn jobs(&self) -> Vec<TranslationJob> {
        self.state().jobs.clone()
    }

    pub fn job(&self, id: Uuid) -> Option<TranslationJob> {
        self.state().jobs.iter().find(|job| job.id == id).cloned()
    }

    pub fn seed_quota(&self, quota: MonthlyQuota) {
        self.state().quotas.insert(quota.month_year.clone(), quota);
    }

    pub fn add_content(&self, item: ContentItem) {
        self.state().content.push(item);
    }

    /// Moves a job's claim timestamp, e.g. to simulate an old claim.
    pub fn set_claimed_at(&self, id: Uuid, claimed_at: DateTime<Utc>) {
        if let Some(job) = self.state().jobs.iter_mut().find(|job| job.id == id) {
            job.claimed_at = Some(claimed_at);
        }
    }

    fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        apply: impl FnOnce(&mut TranslationJob),
    ) -> bool {
        let mut state = self.state();
        let Some(job) = state.jobs.iter_mut().find(|job| job.id == id) else {
            return false;
        };
        if !job.status.can_transition_to(status) {
            return false;
        }
        job.status = status;
        job.priority_tag = None;
        job.updated_at = Utc::now();
        apply(job);
        true
    }
}

#[async_trait]
impl TranslationJobStore for InMemoryTranslationStore {
    async fn insert_jobs(&self, jobs: &[NewTranslationJob]) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let mut state = self.state();
        for job in jobs {
            state.jobs.push(TranslationJob {
                id: Uuid::new_v4(),
                content_type: job.content_type.clone(),
                content_id: job.content_id.clone(),
                source_language: job.source_language.clone(),
                target_language: job.target_language.clone(),
                source_content: job.source_content.clone(),
                translated_content: None,
                status: JobStatus::Pending,
                characters_used: 0,
                error_message: None,
                priority_tag: None,
                claimed_at: None,
                priority_started_at: None,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(jobs.len() as u64)
    }

    async fn claim_next(
        &self,
        target_language: Option<&str>,
        budget: i64,
    ) -> Result<ClaimOutcome, sqlx::Error> {
        let mut state = self.state();
        let next = state.jobs.iter_mut().find(|job| {
            job.status == JobStatus::Pending
                && target_language.map_or(true, |lang| job.target_language == lang)
        });

        let Some(job) = next else {
            return Ok(ClaimOutcome::Empty);
        };

        let characters = job.billable_characters();
        if characters > budget {
            return Ok(ClaimOutcome::OverBudget {
                job_id: job.id,
                characters,
            });
        }

        let now = Utc::now();
        job.status = JobStatus::Processing;
        job.claimed_at = Some(now);
        job.updated_at = now;
        Ok(ClaimOutcome::Claimed(job.clone()))
    }

    async fn claim_priority_batch(
        &self,
        target_language: &str,
        tag: &str,
        started_at: DateTime<Utc>,
        limit: i64,
        budget: i64,
    ) -> Result<Vec<TranslationJob>, sqlx::Error> {
        let mut state = self.state();
        let mut claimed = Vec::new();
        let mut running = 0i64;

        for job in state.jobs.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if job.status != JobStatus::Pending || job.target_language != target_language {
                continue;
            }
            let characters = job.billable_characters();
            if running + characters > budget {
                break;
            }
            running += characters;
            job.status = JobStatus::Processing;
            job.priority_tag = Some(tag.to_string());
            job.claimed_at = Some(started_at);
            job.priority_started_at = Some(started_at);
            job.updated_at = started_at;
            claimed.push(job.clone());
        }

        Ok(claimed)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        translated_content: &str,
        characters_used: i64,
    ) -> Result<bool, sqlx::Error> {
        Ok(self.finish(id, JobStatus::Completed, |job| {
            job.translated_content = Some(translated_content.to_string());
            job.characters_used = characters_used;
            job.error_message = None;
        }))
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool, sqlx::Error> {
        Ok(self.finish(id, JobStatus::Failed, |job| {
            job.error_message = Some(error_message.to_string());
        }))
    }

    async fn active_priority_languages(&self) -> Result<Vec<String>, sqlx::Error> {
        let mut languages: Vec<String> = self
            .state()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Processing && job.priority_tag.is_some())
            .map(|job| job.target_language.clone())
            .collect();
        languages.sort();
        languages.dedup();
        Ok(languages)
    }

    async fn priority_progress(
        &self,
        target_language: &str,
    ) -> Result<Option<PriorityProgress>, sqlx::Error> {
        let state = self.state();
        let marked = || {
            state
                .jobs
                .iter()
                .filter(move |job| job.target_language == target_language)
        };

        let Some(started_at) = marked().filter_map(|job| job.priority_started_at).max() else {
            return Ok(None);
        };

        let (total, processed) = marked()
            .filter(|job| job.priority_started_at == Some(started_at))
            .fold((0, 0), |(total, processed), job| {
                let left = i64::from(job.status != JobStatus::Processing);
                (total + 1, processed + left)
            });

        Ok(Some(PriorityProgress {
            started_at,
            total,
            processed,
        }))
    }

    async fn count_by_language_and_status(&self) -> Result<Vec<LanguageStatusCount>, sqlx::Error> {
        let mut counts: HashMap<(String, JobStatus), i64> = HashMap::new();
        for job in self.state().jobs.iter() {
            *counts
                .entry((job.target_language.clone(), job.status))
                .or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((target_language, status), count)| LanguageStatusCount {
                target_language,
                status,
                count,
            })
            .collect())
    }

    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        Ok(self
            .state()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Completed)
            .map(|job| job.updated_at)
            .max())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<TranslationJob>, sqlx::Error> {
        let mut jobs = self.jobs();
        jobs.reverse();
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn find_latest(
        &self,
        content_type: &str,
        content_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>, sqlx::Error> {
        Ok(self
            .state()
            .jobs
            .iter()
            .rev()
            .find(|job| {
                job.content_type == content_type
                    && job.content_id == content_id
                    && job.target_language == target_language
            })
            .cloned())
    }

    async fn fail_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        skip_languages: &[String],
        error_message: &str,
    ) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let mut failed = 0;
        for job in self.state().jobs.iter_mut() {
            let stale = job.status == JobStatus::Processing
                && job.claimed_at.map_or(true, |at| at < claimed_before)
                && !skip_languages.contains(&job.target_language);
            if stale {
                job.status = JobStatus::Failed;
                job.error_message = Some(error_message.to_string());
                job.priority_tag = None;
                job.updated_at = now;
                failed += 1;
            }
        }
        Ok(failed)
    }
}

#[async_trait]
impl QuotaStore for InMemoryTranslationStore {
    async fn find(&self, month_year: &str) -> Result<Option<MonthlyQuota>, sqlx::Error> {
        Ok(self.state().quotas.get(month_year).cloned())
    }

    async fn record_usage(
        &self,
        month_year: &str,
        characters: i64,
        default_limit: i64,
    ) -> Result<MonthlyQuota, sqlx::Error> {
        let mut state = self.state();
        let quota = state
            .quotas
            .entry(month_year.to_string())
            .or_insert_with(|| MonthlyQuota::empty(month_year, default_limit));
        quota.characters_used += characters;
        quota.api_calls += 1;
        quota.updated_at = Utc::now();
        Ok(quota.clone())
    }
}

#[async_trait]
impl ContentSource for InMemoryTranslationStore {
    async fn list_items(&self, content_type: ContentType) -> Result<Vec<ContentItem>, sqlx::Error> {
        Ok(self
            .state()
            .content
            .iter()
            .filter(|item| item.content_type == content_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(language: &str, text: &str) -> NewTranslationJob {
        NewTranslationJob {
            content_type: "faq".to_string(),
            content_id: "1:question".to_string(),
            source_language: "sk".to_string(),
            target_language: language.to_string(),
            source_content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_claim_respects_budget_without_mutation() {
        let store = InMemoryTranslationStore::new();
        store.insert_jobs(&[new_job("en", "abcdef")]).await.unwrap();

        let outcome = store.claim_next(None, 5).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::OverBudget { characters: 6, .. }));
        assert_eq!(store.jobs()[0].status, JobStatus::Pending);

        let outcome = store.claim_next(None, 6).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Claimed(_)));
        assert_eq!(store.jobs()[0].status, JobStatus::Processing);
        assert!(store.jobs()[0].claimed_at.is_some());
    }

    #[tokio::test]
    async fn test_claim_filters_language() {
        let store = InMemoryTranslationStore::new();
        store
            .insert_jobs(&[new_job("en", "a"), new_job("de", "b")])
            .await
            .unwrap();

        match store.claim_next(Some("de"), 100).await.unwrap() {
            ClaimOutcome::Claimed(job) => assert_eq!(job.target_language, "de"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            store.claim_next(Some("de"), 100).await.unwrap(),
            ClaimOutcome::Empty
        );
    }

    #[tokio::test]
    async fn test_finish_requires_processing() {
        let store = InMemoryTranslationStore::new();
        store.insert_jobs(&[new_job("en", "a")]).await.unwrap();
        let id = store.jobs()[0].id;

        assert!(!store.mark_completed(id, "x", 1).await.unwrap());
        assert!(!store.mark_failed(id, "boom").await.unwrap());
        assert_eq!(store.jobs()[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_record_usage_creates_then_increments() {
        let store = InMemoryTranslationStore::new();
        let quota = store.record_usage("2026-10", 100, 1000).await.unwrap();
        assert_eq!(quota.characters_used, 100);
        assert_eq!(quota.api_calls, 1);
        assert_eq!(quota.characters_limit, 1000);

        let quota = store.record_usage("2026-10", 50, 9999).await.unwrap();
        assert_eq!(quota.characters_used, 150);
        assert_eq!(quota.api_calls, 2);
        assert_eq!(quota.characters_limit, 1000);
    }
}

//! Read-only aggregation for the admin dashboard.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::error::PipelineResult;
use super::job_store::TranslationJobStore;
use super::quota::QuotaTracker;
use super::translation_provider::{TranslationError, TranslationProvider};
use crate::models::stats::{
    aggregate_counts, ConnectivityProbe, LookupState, RecentTranslation, StatusLookup,
    TranslationOverview,
};
use crate::models::translation_job::CheckStatusQuery;

pub const MAX_RECENT_LIMIT: i64 = 200;

pub struct DiagnosticsReader {
    store: Arc<dyn TranslationJobStore>,
    provider: Arc<dyn TranslationProvider>,
    quota: QuotaTracker,
    probe_timeout: Duration,
}

impl DiagnosticsReader {
    pub fn new(
        store: Arc<dyn TranslationJobStore>,
        provider: Arc<dyn TranslationProvider>,
        quota: QuotaTracker,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            quota,
            probe_timeout,
        }
    }

    /// Counts, per-language progress, a live API probe and quota usage.
    pub async fn overview(&self) -> PipelineResult<TranslationOverview> {
        let buckets = self.store.count_by_language_and_status().await?;
        let (by_status, by_language) = aggregate_counts(&buckets);
        let last_completed_at = self.store.last_completed_at().await?;
        let quota = self.quota.usage(None).await?;
        let connectivity = self.probe().await;

        Ok(TranslationOverview {
            total_jobs: by_status.total(),
            by_status,
            by_language,
            connectivity,
            last_completed_at,
            quota: quota.into(),
        })
    }

    /// Live usage call against the translation API. Never fails; errors are
    /// reported in the probe.
    pub async fn probe(&self) -> ConnectivityProbe {
        let usage = match tokio::time::timeout(self.probe_timeout, self.provider.usage()).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(
                self.probe_timeout.as_millis() as u64,
            )),
        };

        match usage {
            Ok(usage) => ConnectivityProbe {
                reachable: true,
                character_count: Some(usage.character_count),
                character_limit: Some(usage.character_limit),
                error: None,
                checked_at: Utc::now(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Translation API connectivity probe failed");
                ConnectivityProbe {
                    reachable: false,
                    character_count: None,
                    character_limit: None,
                    error: Some(e.to_string()),
                    checked_at: Utc::now(),
                }
            }
        }
    }

    /// Most recently updated jobs with display labels.
    pub async fn recent(&self, limit: i64) -> PipelineResult<Vec<RecentTranslation>> {
        let jobs = self.store.recent(limit.clamp(1, MAX_RECENT_LIMIT)).await?;
        Ok(jobs.into_iter().map(RecentTranslation::from).collect())
    }

    /// Point lookup of the newest matching job.
    pub async fn check_status(&self, query: &CheckStatusQuery) -> PipelineResult<StatusLookup> {
        let job = self
            .store
            .find_latest(&query.content_type, &query.content_id, &query.target_language)
            .await?;

        let lookup = match job {
            Some(job) => StatusLookup {
                content_type: job.content_type,
                content_id: job.content_id,
                target_language: job.target_language,
                state: job.status.into(),
                job_id: Some(job.id),
                translated_content: job.translated_content,
                error_message: job.error_message,
                updated_at: Some(job.updated_at),
            },
            None => StatusLookup {
                content_type: query.content_type.clone(),
                content_id: query.content_id.clone(),
                target_language: query.target_language.clone(),
                state: LookupState::NotFound,
                job_id: None,
                translated_content: None,
                error_message: None,
                updated_at: None,
            },
        };

        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_RECENT_LIMIT;
    use crate::models::stats::LookupState;
    use crate::models::translation_job::{CheckStatusQuery, JobStatus, NewTranslationJob};
    use crate::services::job_store::TranslationJobStore;
    use crate::services::pipeline::test_support::pipeline_with;
    use crate::services::translation_provider::MockTranslationProvider;

    fn job(content_id: &str, language: &str) -> NewTranslationJob {
        NewTranslationJob {
            content_type: "faq".to_string(),
            content_id: content_id.to_string(),
            source_language: "sk".to_string(),
            target_language: language.to_string(),
            source_content: "Otázka".to_string(),
        }
    }

    #[tokio::test]
    async fn test_overview_counts_and_connectivity() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store
            .insert_jobs(&[job("1:question", "en"), job("1:answer", "en"), job("1:question", "de")])
            .await
            .unwrap();
        pipeline.batches.process_pending_batch(1).await.unwrap();

        let overview = pipeline.diagnostics.overview().await.unwrap();
        assert_eq!(overview.total_jobs, 3);
        assert_eq!(overview.by_status.completed, 1);
        assert_eq!(overview.by_status.pending, 2);
        assert_eq!(overview.by_language.len(), 2);
        assert!(overview.connectivity.reachable);
        assert!(overview.last_completed_at.is_some());
        assert_eq!(overview.quota.characters_used, 6);
    }

    #[tokio::test]
    async fn test_connectivity_check_reports_failure() {
        let (_, pipeline) = pipeline_with(MockTranslationProvider::failing());
        let probe = pipeline.diagnostics.probe().await;
        assert!(!probe.reachable);
        assert!(probe.error.is_some());
    }

    #[tokio::test]
    async fn test_recent_labels() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store.insert_jobs(&[job("12:question", "en")]).await.unwrap();

        let recent = pipeline.diagnostics.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].label, "FAQ question #12");
        assert_eq!(recent[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_recent_limit_is_clamped() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store
            .insert_jobs(&[job("1:question", "en"), job("2:question", "en")])
            .await
            .unwrap();

        assert_eq!(pipeline.diagnostics.recent(0).await.unwrap().len(), 1);
        assert_eq!(pipeline.diagnostics.recent(-3).await.unwrap().len(), 1);
        assert_eq!(
            pipeline.diagnostics.recent(MAX_RECENT_LIMIT * 10).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_check_status_not_found_is_distinct() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store.insert_jobs(&[job("3:answer", "en")]).await.unwrap();

        let query = CheckStatusQuery {
            content_type: "faq".to_string(),
            content_id: "3:answer".to_string(),
            target_language: "de".to_string(),
        };
        let lookup = pipeline.diagnostics.check_status(&query).await.unwrap();
        assert_eq!(lookup.state, LookupState::NotFound);
        assert!(lookup.job_id.is_none());

        let query = CheckStatusQuery {
            target_language: "en".to_string(),
            ..query
        };
        let lookup = pipeline.diagnostics.check_status(&query).await.unwrap();
        assert_eq!(lookup.state, LookupState::Pending);
        assert!(lookup.job_id.is_some());
    }
}

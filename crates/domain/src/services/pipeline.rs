//! Wiring of the pipeline services around shared stores and one provider.

use chrono::Utc;
use std::sync::Arc;

use super::batch::BatchProcessor;
use super::diagnostics::DiagnosticsReader;
use super::error::PipelineResult;
use super::job_store::{ContentSource, QuotaStore, TranslationJobStore};
use super::priority::PriorityDrainSupervisor;
use super::quota::QuotaTracker;
use super::scheduler::TranslationScheduler;
use super::settings::PipelineSettings;
use super::translation_provider::TranslationProvider;
use super::worker::JobWorker;

/// Error recorded on jobs whose claim outlived the stale-claim window.
pub const STALE_CLAIM_MESSAGE: &str = "processing claim expired";

/// The translation job pipeline.
pub struct TranslationPipeline {
    pub scheduler: TranslationScheduler,
    pub batches: BatchProcessor,
    pub drains: Arc<PriorityDrainSupervisor>,
    pub diagnostics: DiagnosticsReader,
    pub quota: QuotaTracker,
    jobs: Arc<dyn TranslationJobStore>,
    settings: Arc<PipelineSettings>,
}

impl TranslationPipeline {
    pub fn new(
        jobs: Arc<dyn TranslationJobStore>,
        quotas: Arc<dyn QuotaStore>,
        content: Arc<dyn ContentSource>,
        provider: Arc<dyn TranslationProvider>,
        settings: PipelineSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let quota = QuotaTracker::new(quotas, settings.monthly_character_limit);
        let worker = JobWorker::new(
            jobs.clone(),
            provider.clone(),
            quota.clone(),
            settings.clone(),
        );
        let drains = Arc::new(PriorityDrainSupervisor::new(worker.clone()));

        Self {
            scheduler: TranslationScheduler::new(jobs.clone(), content, settings.clone()),
            batches: BatchProcessor::new(worker, drains.clone()),
            diagnostics: DiagnosticsReader::new(
                jobs.clone(),
                provider,
                quota.clone(),
                settings.request_timeout,
            ),
            drains,
            quota,
            jobs,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fails claims older than `max_age` unless their language has a drain
    /// running in this process.
    pub async fn recover_stale_claims(&self, max_age: chrono::Duration) -> PipelineResult<u64> {
        let live = self.drains.live_languages().await;
        let claimed_before = Utc::now() - max_age;
        let failed = self
            .jobs
            .fail_stale_claims(claimed_before, &live, STALE_CLAIM_MESSAGE)
            .await?;

        if failed > 0 {
            tracing::warn!(
                failed = failed,
                skipped_languages = ?live,
                "Failed stale translation claims"
            );
        }

        Ok(failed)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::memory_store::InMemoryTranslationStore;
    use crate::services::translation_provider::MockTranslationProvider;
    use std::time::Duration;

    pub(crate) fn pipeline_with_settings(
        provider: MockTranslationProvider,
        configure: impl FnOnce(&mut PipelineSettings),
    ) -> (Arc<InMemoryTranslationStore>, TranslationPipeline) {
        let store = Arc::new(InMemoryTranslationStore::new());
        let mut settings = PipelineSettings {
            request_delay: Duration::ZERO,
            ..PipelineSettings::default()
        };
        configure(&mut settings);

        let pipeline = TranslationPipeline::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(provider),
            settings,
        );
        (store, pipeline)
    }

    pub(crate) fn pipeline_with(
        provider: MockTranslationProvider,
    ) -> (Arc<InMemoryTranslationStore>, TranslationPipeline) {
        pipeline_with_settings(provider, |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::pipeline_with;
    use super::*;
    use crate::models::translation_job::{JobStatus, NewTranslationJob};
    use crate::services::job_store::ClaimOutcome;
    use crate::services::translation_provider::MockTranslationProvider;

    fn job(language: &str) -> NewTranslationJob {
        NewTranslationJob {
            content_type: "faq".to_string(),
            content_id: "5:question".to_string(),
            source_language: "sk".to_string(),
            target_language: language.to_string(),
            source_content: "Text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_stale_claims_become_failed() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store.insert_jobs(&[job("en"), job("de")]).await.unwrap();

        let claimed = match store.claim_next(Some("en"), 100).await.unwrap() {
            ClaimOutcome::Claimed(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };
        store.set_claimed_at(claimed.id, Utc::now() - chrono::Duration::minutes(30));

        let failed = pipeline
            .recover_stale_claims(chrono::Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(failed, 1);

        let job = store.job(claimed.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some(STALE_CLAIM_MESSAGE));
        assert_eq!(store.jobs()[1].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_fresh_claims_are_kept() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store.insert_jobs(&[job("en")]).await.unwrap();
        store.claim_next(None, 100).await.unwrap();

        let failed = pipeline
            .recover_stale_claims(chrono::Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(failed, 0);
        assert_eq!(store.jobs()[0].status, JobStatus::Processing);
    }
}

//! Translation of a single claimed job.

use std::sync::Arc;
use std::time::Instant;

use super::error::PipelineResult;
use super::job_store::TranslationJobStore;
use super::quota::QuotaTracker;
use super::settings::PipelineSettings;
use super::translation_provider::{TranslationError, TranslationProvider};
use crate::models::translation_job::TranslationJob;

/// What happened to one claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Completed { characters: i64 },
    Failed { error: String },
}

/// Translates claimed jobs and writes the result back.
///
/// Shared by the batch processor and the priority drains so both paths use
/// the same client, timeout and delay.
#[derive(Clone)]
pub struct JobWorker {
    store: Arc<dyn TranslationJobStore>,
    provider: Arc<dyn TranslationProvider>,
    quota: QuotaTracker,
    settings: Arc<PipelineSettings>,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn TranslationJobStore>,
        provider: Arc<dyn TranslationProvider>,
        quota: QuotaTracker,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            store,
            provider,
            quota,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn TranslationJobStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn TranslationProvider> {
        &self.provider
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Translates a job the caller has claimed. Translation failures and
    /// timeouts are recorded on the job; only store errors propagate.
    pub async fn run(&self, job: &TranslationJob) -> PipelineResult<JobResult> {
        let started = Instant::now();
        let timeout = self.settings.request_timeout;

        let call = self.provider.translate(
            &job.source_content,
            &job.target_language,
            &job.source_language,
        );
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(timeout.as_millis() as u64)),
        };

        match result {
            Ok(translated) => {
                let characters = job.billable_characters();
                if !self
                    .store
                    .mark_completed(job.id, &translated, characters)
                    .await?
                {
                    tracing::warn!(
                        job_id = %job.id,
                        "Job was no longer processing when its translation finished"
                    );
                }

                tracing::info!(
                    job_id = %job.id,
                    content_id = %job.content_id,
                    target_language = %job.target_language,
                    characters = characters,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Translation job completed"
                );
                Ok(JobResult::Completed { characters })
            }
            Err(e) => {
                let error = e.to_string();
                self.store.mark_failed(job.id, &error).await?;

                tracing::warn!(
                    job_id = %job.id,
                    content_id = %job.content_id,
                    target_language = %job.target_language,
                    error = %error,
                    "Translation job failed"
                );
                Ok(JobResult::Failed { error })
            }
        }
    }

    /// Fixed pause between two translation calls.
    pub async fn pause(&self) {
        if !self.settings.request_delay.is_zero() {
            tokio::time::sleep(self.settings.request_delay).await;
        }
    }
}

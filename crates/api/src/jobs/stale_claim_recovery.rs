//! Background job failing claims abandoned by a crashed invocation.

use domain::services::TranslationPipeline;
use std::sync::Arc;

use super::scheduler::{Job, JobFrequency};

/// Marks jobs stuck in `processing` for longer than the stale window as
/// failed, skipping languages with a drain alive in this process.
pub struct StaleClaimRecoveryJob {
    pipeline: Arc<TranslationPipeline>,
    max_age_minutes: i64,
}

impl StaleClaimRecoveryJob {
    pub fn new(pipeline: Arc<TranslationPipeline>, max_age_minutes: i64) -> Self {
        Self {
            pipeline,
            max_age_minutes,
        }
    }

    /// Checks run several times per stale window.
    fn check_interval_minutes(&self) -> u64 {
        (self.max_age_minutes / 3).max(1) as u64
    }
}

#[async_trait::async_trait]
impl Job for StaleClaimRecoveryJob {
    fn name(&self) -> &'static str {
        "stale_claim_recovery"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.check_interval_minutes())
    }

    // Claims left behind by the previous process are released right away.
    fn run_at_startup(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        let failed = self
            .pipeline
            .recover_stale_claims(chrono::Duration::minutes(self.max_age_minutes))
            .await
            .map_err(|e| format!("Failed to recover stale claims: {}", e))?;

        if failed > 0 {
            metrics::counter!("translation_stale_claims_total").increment(failed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::{
        InMemoryTranslationStore, MockTranslationProvider, PipelineSettings,
    };

    fn pipeline() -> Arc<TranslationPipeline> {
        let store = Arc::new(InMemoryTranslationStore::new());
        Arc::new(TranslationPipeline::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(MockTranslationProvider::new()),
            PipelineSettings::default(),
        ))
    }

    #[test]
    fn test_check_interval_follows_stale_window() {
        assert_eq!(
            StaleClaimRecoveryJob::new(pipeline(), 15).frequency(),
            JobFrequency::Minutes(5)
        );
        assert_eq!(
            StaleClaimRecoveryJob::new(pipeline(), 1).frequency(),
            JobFrequency::Minutes(1)
        );
    }

    #[tokio::test]
    async fn test_execute_on_empty_queue() {
        let job = StaleClaimRecoveryJob::new(pipeline(), 15);
        assert!(job.run_at_startup());
        assert!(job.execute().await.is_ok());
    }
}

//! Bounded batch drains of the pending queue.

use std::sync::Arc;

use super::error::PipelineResult;
use super::job_store::ClaimOutcome;
use super::priority::PriorityDrainSupervisor;
use super::worker::{JobResult, JobWorker};
use crate::models::stats::BatchOutcome;

/// Drains pending jobs oldest-first, one at a time.
#[derive(Clone)]
pub struct BatchProcessor {
    worker: JobWorker,
    drains: Arc<PriorityDrainSupervisor>,
}

impl BatchProcessor {
    pub fn new(worker: JobWorker, drains: Arc<PriorityDrainSupervisor>) -> Self {
        Self { worker, drains }
    }

    /// Claims and translates up to `max_jobs` pending jobs.
    ///
    /// A job is only claimed when its characters fit the month's remaining
    /// budget net of what other running invocations reserved; the first one
    /// that does not ends the batch with `limit_exceeded`. While a priority
    /// drain is active only its language is claimed. Characters are committed
    /// to the quota once, after the loop.
    ///
    /// The loop runs on its own task, so dropping the returned future does
    /// not abandon claimed jobs or their usage.
    pub async fn process_pending_batch(&self, max_jobs: u32) -> PipelineResult<BatchOutcome> {
        let batch = self.clone();
        tokio::spawn(async move { batch.run(max_jobs).await }).await?
    }

    async fn run(&self, max_jobs: u32) -> PipelineResult<BatchOutcome> {
        let language_filter = self.drains.active_language().await?;
        let mut outcome = BatchOutcome {
            language_filter,
            ..BatchOutcome::default()
        };

        let quota = self.worker.quota().usage(None).await?;
        if quota.is_exhausted() {
            tracing::info!(
                characters_used = quota.characters_used,
                characters_limit = quota.characters_limit,
                "Monthly translation quota exhausted, skipping batch"
            );
            outcome.limit_exceeded = true;
            return Ok(outcome);
        }

        let mut reserved = 0;
        let result = self.drain(max_jobs, &mut reserved, &mut outcome).await;
        // Commit whatever was translated even if the loop hit a store error.
        self.worker
            .quota()
            .settle(reserved, outcome.total_characters_used)
            .await?;
        result?;

        tracing::info!(
            processed = outcome.processed_count,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            characters = outcome.total_characters_used,
            limit_exceeded = outcome.limit_exceeded,
            language_filter = ?outcome.language_filter,
            "Translation batch finished"
        );

        Ok(outcome)
    }

    async fn drain(
        &self,
        max_jobs: u32,
        reserved: &mut i64,
        outcome: &mut BatchOutcome,
    ) -> PipelineResult<()> {
        let store = self.worker.store();

        while outcome.processed_count < max_jobs {
            if outcome.processed_count > 0 {
                self.worker.pause().await;
            }

            let (claim, available) = {
                let mut budget = self.worker.quota().budget().await?;
                // Our own earlier reservations cover what this batch spent.
                let available = budget.available();
                let claim = store
                    .claim_next(outcome.language_filter.as_deref(), available)
                    .await?;
                if let ClaimOutcome::Claimed(job) = &claim {
                    budget.reserve(job.billable_characters());
                    *reserved += job.billable_characters();
                }
                (claim, available)
            };

            let job = match claim {
                ClaimOutcome::Claimed(job) => job,
                ClaimOutcome::Empty => break,
                ClaimOutcome::OverBudget { job_id, characters } => {
                    tracing::info!(
                        job_id = %job_id,
                        characters = characters,
                        budget = available,
                        "Next job exceeds the remaining monthly budget"
                    );
                    outcome.limit_exceeded = true;
                    break;
                }
            };

            match self.worker.run(&job).await? {
                JobResult::Completed { characters } => {
                    outcome.succeeded += 1;
                    outcome.total_characters_used += characters;
                }
                JobResult::Failed { .. } => outcome.failed += 1,
            }
            outcome.processed_count += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::quota::{current_month_key, MonthlyQuota};
    use crate::models::translation_job::{JobStatus, NewTranslationJob};
    use crate::services::job_store::{QuotaStore, TranslationJobStore};
    use crate::services::pipeline::test_support::pipeline_with;
    use crate::services::translation_provider::MockTranslationProvider;
    use std::time::Duration;

    fn job(id: usize, language: &str, text: &str) -> NewTranslationJob {
        NewTranslationJob {
            content_type: "product".to_string(),
            content_id: format!("p{}:description", id),
            source_language: "sk".to_string(),
            target_language: language.to_string(),
            source_content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_three_jobs_six_hundred_characters() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let mut quota = MonthlyQuota::empty(current_month_key(), 1_000_000);
        quota.characters_used = 1000;
        quota.api_calls = 4;
        store.seed_quota(quota);
        store
            .insert_jobs(&[
                job(1, "en", &"a".repeat(100)),
                job(2, "en", &"b".repeat(200)),
                job(3, "en", &"c".repeat(300)),
            ])
            .await
            .unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert_eq!(outcome.processed_count, 3);
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.total_characters_used, 600);
        assert!(!outcome.limit_exceeded);

        let jobs = store.jobs();
        for job in &jobs {
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.characters_used, job.source_content.chars().count() as i64);
            assert!(job.translated_content.is_some());
        }

        let quota = store.find(&current_month_key()).await.unwrap().unwrap();
        assert_eq!(quota.characters_used, 1600);
        assert_eq!(quota.api_calls, 5);
    }

    #[tokio::test]
    async fn test_near_limit_job_is_not_attempted() {
        let provider = MockTranslationProvider::new();
        let (store, pipeline) = pipeline_with(provider.clone());
        let mut quota = MonthlyQuota::empty(current_month_key(), 500_000);
        quota.characters_used = 500_000 - 10;
        store.seed_quota(quota);
        store
            .insert_jobs(&[job(1, "de", &"x".repeat(500))])
            .await
            .unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert_eq!(outcome.processed_count, 0);
        assert!(outcome.limit_exceeded);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.jobs()[0].status, JobStatus::Pending);

        let quota = store.find(&current_month_key()).await.unwrap().unwrap();
        assert_eq!(quota.characters_used, 500_000 - 10);
        assert_eq!(quota.api_calls, 0);
    }

    #[tokio::test]
    async fn test_always_failing_client_consumes_no_quota() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::failing());
        let jobs: Vec<NewTranslationJob> = (0..5).map(|i| job(i, "cs", "Ahoj")).collect();
        store.insert_jobs(&jobs).await.unwrap();

        let outcome = pipeline.batches.process_pending_batch(5).await.unwrap();
        assert_eq!(outcome.processed_count, 5);
        assert_eq!(outcome.failed, 5);
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.total_characters_used, 0);

        for job in store.jobs() {
            assert_eq!(job.status, JobStatus::Failed);
            assert!(job.error_message.as_deref().is_some_and(|e| !e.is_empty()));
        }
        assert!(store.find(&current_month_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_quota_touches_nothing() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let mut quota = MonthlyQuota::empty(current_month_key(), 100);
        quota.characters_used = 100;
        store.seed_quota(quota);
        store.insert_jobs(&[job(1, "en", "a")]).await.unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert!(outcome.limit_exceeded);
        assert_eq!(outcome.processed_count, 0);
        assert_eq!(store.jobs()[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_batch_mutates_at_most_n_pending_jobs() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let jobs: Vec<NewTranslationJob> = (0..6).map(|i| job(i, "en", "text")).collect();
        store.insert_jobs(&jobs).await.unwrap();

        // Put two jobs into non-pending states first.
        pipeline.batches.process_pending_batch(1).await.unwrap();
        let claimed = match store.claim_next(None, 1000).await.unwrap() {
            crate::services::job_store::ClaimOutcome::Claimed(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let before = store.jobs();

        let outcome = pipeline.batches.process_pending_batch(3).await.unwrap();
        assert_eq!(outcome.processed_count, 3);

        let after = store.jobs();
        let changed: Vec<usize> = (0..after.len())
            .filter(|&i| before[i] != after[i])
            .collect();
        assert_eq!(changed.len(), 3);
        for i in changed {
            assert_eq!(before[i].status, JobStatus::Pending);
        }
        assert_eq!(store.job(claimed.id).unwrap().status, JobStatus::Processing);
        assert_eq!(after[0], before[0]);
    }

    #[tokio::test]
    async fn test_duplicate_jobs_complete_independently() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store
            .insert_jobs(&[job(1, "en", "Ahoj"), job(1, "en", "Ahoj")])
            .await
            .unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert_eq!(outcome.succeeded, 2);
        let jobs = store.jobs();
        assert_ne!(jobs[0].id, jobs[1].id);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));
    }

    #[tokio::test]
    async fn test_mixed_results_continue_past_failures() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new().fail_on("de"));
        store
            .insert_jobs(&[job(1, "de", "abc"), job(1, "en", "abcd")])
            .await
            .unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.total_characters_used, 4);

        let quota = store.find(&current_month_key()).await.unwrap().unwrap();
        assert_eq!(quota.characters_used, 4);
        assert_eq!(quota.api_calls, 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let provider = MockTranslationProvider::new().with_delay(Duration::from_millis(200));
        let (store, pipeline) = crate::services::pipeline::test_support::pipeline_with_settings(
            provider,
            |settings| settings.request_timeout = Duration::from_millis(20),
        );
        store.insert_jobs(&[job(1, "en", "abc")]).await.unwrap();

        let outcome = pipeline.batches.process_pending_batch(1).await.unwrap();
        assert_eq!(outcome.failed, 1);
        let job = &store.jobs()[0];
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abandon_batch() {
        let provider = MockTranslationProvider::new().with_delay(Duration::from_millis(40));
        let (store, pipeline) = pipeline_with(provider);
        let jobs: Vec<NewTranslationJob> =
            (0..5).map(|i| job(i, "en", &"z".repeat(100))).collect();
        store.insert_jobs(&jobs).await.unwrap();

        let cut_short = tokio::time::timeout(
            Duration::from_millis(60),
            pipeline.batches.process_pending_batch(5),
        )
        .await;
        assert!(cut_short.is_err());

        // The batch keeps running on its own task after the caller gave up.
        let mut finished = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if store.jobs().iter().all(|j| j.status == JobStatus::Completed)
                && store.find(&current_month_key()).await.unwrap().is_some()
            {
                finished = true;
                break;
            }
        }
        assert!(finished);

        let quota = store.find(&current_month_key()).await.unwrap().unwrap();
        assert_eq!(quota.characters_used, 500);
        assert_eq!(quota.api_calls, 1);
        assert_eq!(pipeline.quota.reserved_characters().await, 0);
    }

    #[tokio::test]
    async fn test_batch_and_drain_share_one_budget() {
        let provider = MockTranslationProvider::new().with_delay(Duration::from_millis(5));
        let (store, pipeline) = pipeline_with(provider);
        store.seed_quota(MonthlyQuota::empty(current_month_key(), 1000));
        let jobs: Vec<NewTranslationJob> =
            (0..20).map(|i| job(i, "en", &"q".repeat(100))).collect();
        store.insert_jobs(&jobs).await.unwrap();

        let start = pipeline.drains.start("en").await.unwrap();
        assert_eq!(start.total, 10);
        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        pipeline.drains.wait_for("en").await;

        // The drain reserved the whole month, so the batch could claim nothing.
        assert_eq!(outcome.processed_count, 0);
        assert!(outcome.limit_exceeded);

        let completed: i64 = store
            .jobs()
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .map(|j| j.characters_used)
            .sum();
        let quota = store.find(&current_month_key()).await.unwrap().unwrap();
        assert!(quota.characters_used <= 1000);
        assert_eq!(quota.characters_used, completed);
        assert_eq!(pipeline.quota.reserved_characters().await, 0);
    }

    #[tokio::test]
    async fn test_active_priority_language_filters_batch() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store
            .insert_jobs(&[job(1, "en", "a"), job(2, "de", "b"), job(3, "de", "c")])
            .await
            .unwrap();
        // A drain owned by another process.
        store
            .claim_priority_batch("de", "priority_1", chrono::Utc::now(), 1, 1000)
            .await
            .unwrap();

        let outcome = pipeline.batches.process_pending_batch(10).await.unwrap();
        assert_eq!(outcome.language_filter.as_deref(), Some("de"));
        assert_eq!(outcome.processed_count, 1);

        let jobs = store.jobs();
        assert_eq!(jobs[0].status, JobStatus::Pending);
        assert_eq!(jobs[1].status, JobStatus::Processing);
        assert_eq!(jobs[2].status, JobStatus::Completed);
    }
}

//! Priority drains: one language's capped backlog processed ahead of all
//! other languages by a supervised background task.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::error::{PipelineError, PipelineResult};
use super::worker::{JobResult, JobWorker};
use crate::models::stats::{BatchOutcome, PriorityStart, PriorityStatus};
use crate::models::translation_job::{priority_tag, TranslationJob};

/// Error recorded on marked jobs the drain had no budget left for.
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "monthly quota exhausted";

struct DrainEntry {
    started_at: DateTime<Utc>,
    total: i64,
    handle: Option<JoinHandle<()>>,
}

impl DrainEntry {
    fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

/// Starts priority drains and tracks their tasks by language.
pub struct PriorityDrainSupervisor {
    worker: JobWorker,
    drains: Mutex<HashMap<String, DrainEntry>>,
}

impl PriorityDrainSupervisor {
    pub fn new(worker: JobWorker) -> Self {
        Self {
            worker,
            drains: Mutex::new(HashMap::new()),
        }
    }

    /// Marks up to the configured cap of `language`'s pending jobs and drains
    /// them in the background.
    ///
    /// Fails with [`PipelineError::PriorityConflict`] without touching any job
    /// while any language (this one included) has an active drain.
    pub async fn start(&self, language: &str) -> PipelineResult<PriorityStart> {
        let settings = self.worker.settings();
        if !settings.supports_target(language) {
            return Err(PipelineError::UnsupportedLanguage(language.to_string()));
        }

        // Held across the check and the claim so two starts in this process
        // cannot interleave.
        let mut drains = self.drains.lock().await;

        if let Some(active) = drains
            .iter()
            .find(|(_, entry)| entry.is_running())
            .map(|(lang, _)| lang.clone())
        {
            return Err(PipelineError::PriorityConflict(active));
        }

        let store = self.worker.store();
        if let Some(active) = store.active_priority_languages().await?.into_iter().next() {
            return Err(PipelineError::PriorityConflict(active));
        }

        let started_at = truncate_to_millis(Utc::now());
        let tag = priority_tag(started_at);

        // Marked characters stay reserved until the drain settles.
        let (jobs, remaining, reserved) = {
            let mut budget = self.worker.quota().budget().await?;
            let remaining = budget.available();
            let jobs = store
                .claim_priority_batch(
                    language,
                    &tag,
                    started_at,
                    settings.priority_batch_cap,
                    remaining,
                )
                .await?;
            let reserved: i64 = jobs.iter().map(TranslationJob::billable_characters).sum();
            budget.reserve(reserved);
            (jobs, remaining, reserved)
        };
        let total = jobs.len() as i64;

        tracing::info!(
            language = %language,
            tag = %tag,
            marked = total,
            remaining_characters = remaining,
            reserved_characters = reserved,
            "Priority translation started"
        );

        if !jobs.is_empty() {
            let worker = self.worker.clone();
            let drain_language = language.to_string();
            let handle = tokio::spawn(async move {
                run_drain(worker, drain_language, jobs, reserved).await;
            });

            drains.insert(
                language.to_string(),
                DrainEntry {
                    started_at,
                    total,
                    handle: Some(handle),
                },
            );
        }

        Ok(PriorityStart {
            language: language.to_string(),
            tag,
            started_at,
            total,
            limit_exceeded: remaining <= 0,
        })
    }

    /// Reports the language's most recent drain.
    ///
    /// With a tracked task, `stalled` is set when the task ended while marked
    /// jobs are still processing. Without one (e.g. after a restart) the
    /// status comes from the store alone.
    pub async fn status(&self, language: &str) -> PipelineResult<PriorityStatus> {
        let progress = self.worker.store().priority_progress(language).await?;
        let drains = self.drains.lock().await;

        let status = match (drains.get(language), progress) {
            (Some(entry), progress) => {
                let processed = progress
                    .filter(|p| p.started_at == entry.started_at)
                    .map_or(0, |p| p.processed);
                let remaining = (entry.total - processed).max(0);
                let running = entry.is_running();
                PriorityStatus {
                    language: language.to_string(),
                    active: running || remaining > 0,
                    started_at: Some(entry.started_at),
                    total: entry.total,
                    processed,
                    remaining,
                    stalled: !running && remaining > 0,
                }
            }
            (None, Some(progress)) => PriorityStatus {
                language: language.to_string(),
                active: progress.remaining() > 0,
                started_at: Some(progress.started_at),
                total: progress.total,
                processed: progress.processed,
                remaining: progress.remaining(),
                stalled: false,
            },
            (None, None) => PriorityStatus::idle(language),
        };

        Ok(status)
    }

    /// Language of the drain that currently owns the queue, if any.
    pub async fn active_language(&self) -> PipelineResult<Option<String>> {
        if let Some(language) = self.live_languages().await.into_iter().next() {
            return Ok(Some(language));
        }
        Ok(self
            .worker
            .store()
            .active_priority_languages()
            .await?
            .into_iter()
            .next())
    }

    /// Languages with a drain task still running in this process.
    pub async fn live_languages(&self) -> Vec<String> {
        let drains = self.drains.lock().await;
        let mut languages: Vec<String> = drains
            .iter()
            .filter(|(_, entry)| entry.is_running())
            .map(|(language, _)| language.clone())
            .collect();
        languages.sort();
        languages
    }

    /// Waits for the language's drain task to finish.
    #[cfg(test)]
    pub(crate) async fn wait_for(&self, language: &str) {
        let handle = {
            let mut drains = self.drains.lock().await;
            drains
                .get_mut(language)
                .and_then(|entry| entry.handle.take())
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(language = %language, error = %e, "Priority drain task panicked");
            }
        }
    }
}

async fn run_drain(
    worker: JobWorker,
    language: String,
    jobs: Vec<TranslationJob>,
    reserved: i64,
) {
    let mut outcome = BatchOutcome {
        language_filter: Some(language.clone()),
        ..BatchOutcome::default()
    };

    let result = drain_jobs(&worker, &jobs, reserved, &mut outcome).await;
    let recorded = worker
        .quota()
        .settle(reserved, outcome.total_characters_used)
        .await;

    match result.and(recorded.map(|_| ())) {
        Ok(()) => tracing::info!(
            language = %language,
            processed = outcome.processed_count,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            characters = outcome.total_characters_used,
            limit_exceeded = outcome.limit_exceeded,
            "Priority translation finished"
        ),
        Err(e) => tracing::error!(
            language = %language,
            error = %e,
            processed = outcome.processed_count,
            "Priority translation aborted"
        ),
    }
}

async fn drain_jobs(
    worker: &JobWorker,
    jobs: &[TranslationJob],
    reserved: i64,
    outcome: &mut BatchOutcome,
) -> PipelineResult<()> {
    for (index, job) in jobs.iter().enumerate() {
        if index > 0 {
            worker.pause().await;
        }

        // The month may have been spent elsewhere since the jobs were marked.
        let budget = worker.quota().budget().await?.available_excluding(reserved)
            - outcome.total_characters_used;
        if job.billable_characters() > budget {
            outcome.limit_exceeded = true;
            for leftover in &jobs[index..] {
                worker
                    .store()
                    .mark_failed(leftover.id, QUOTA_EXHAUSTED_MESSAGE)
                    .await?;
                outcome.processed_count += 1;
                outcome.failed += 1;
            }
            break;
        }

        match worker.run(job).await? {
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

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

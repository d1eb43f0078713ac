//! Background job draining the pending translation queue.

use domain::services::TranslationPipeline;
use std::sync::Arc;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_batch_outcome;

/// Processes one batch of pending jobs per period.
pub struct TranslationBatchJob {
    pipeline: Arc<TranslationPipeline>,
    batch_size: u32,
    interval_secs: u64,
}

impl TranslationBatchJob {
    pub fn new(pipeline: Arc<TranslationPipeline>, batch_size: u32, interval_secs: u64) -> Self {
        Self {
            pipeline,
            batch_size,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for TranslationBatchJob {
    fn name(&self) -> &'static str {
        "translation_batch"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let outcome = self
            .pipeline
            .batches
            .process_pending_batch(self.batch_size)
            .await
            .map_err(|e| format!("Failed to process translation batch: {}", e))?;

        record_batch_outcome("background", &outcome);
        Ok(())
    }
}

//! Pipeline outcomes and dashboard statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::quota::QuotaUsageResponse;
use super::translation_job::{JobStatus, TranslationJob};

/// Number of jobs in one (language, status) bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageStatusCount {
    pub target_language: String,
    pub status: JobStatus,
    pub count: i64,
}

/// Job counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Pending => self.pending += count,
            JobStatus::Processing => self.processing += count,
            JobStatus::Completed => self.completed += count,
            JobStatus::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Progress of one target language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageProgress {
    pub language: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub total: i64,
    pub percent_complete: f64,
}

/// Folds (language, status) buckets into overall and per-language counts.
pub fn aggregate_counts(buckets: &[LanguageStatusCount]) -> (StatusCounts, Vec<LanguageProgress>) {
    let mut overall = StatusCounts::default();
    let mut per_language: BTreeMap<&str, StatusCounts> = BTreeMap::new();

    for bucket in buckets {
        overall.add(bucket.status, bucket.count);
        per_language
            .entry(bucket.target_language.as_str())
            .or_default()
            .add(bucket.status, bucket.count);
    }

    let progress = per_language
        .into_iter()
        .map(|(language, counts)| {
            let total = counts.total();
            let percent_complete = if total == 0 {
                0.0
            } else {
                ((counts.completed as f64 / total as f64) * 10_000.0).round() / 100.0
            };
            LanguageProgress {
                language: language.to_string(),
                counts,
                total,
                percent_complete,
            }
        })
        .collect();

    (overall, progress)
}

/// Result of the live connectivity probe against the translation API.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityProbe {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Admin dashboard overview.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOverview {
    pub total_jobs: i64,
    pub by_status: StatusCounts,
    pub by_language: Vec<LanguageProgress>,
    pub connectivity: ConnectivityProbe,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub quota: QuotaUsageResponse,
}

/// One row of the recent-jobs listing.
#[derive(Debug, Clone, Serialize)]
pub struct RecentTranslation {
    pub id: Uuid,
    pub label: String,
    pub content_type: String,
    pub content_id: String,
    pub target_language: String,
    pub status: JobStatus,
    pub characters_used: i64,
    pub translated_content: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<TranslationJob> for RecentTranslation {
    fn from(job: TranslationJob) -> Self {
        Self {
            label: job.label(),
            id: job.id,
            content_type: job.content_type,
            content_id: job.content_id,
            target_language: job.target_language,
            status: job.status,
            characters_used: job.characters_used,
            translated_content: job.translated_content,
            error_message: job.error_message,
            updated_at: job.updated_at,
        }
    }
}

/// State reported by the point status lookup; `not_found` is not a job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupState {
    NotFound,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<JobStatus> for LookupState {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => LookupState::Pending,
            JobStatus::Processing => LookupState::Processing,
            JobStatus::Completed => LookupState::Completed,
            JobStatus::Failed => LookupState::Failed,
        }
    }
}

/// Result of the point status lookup.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLookup {
    pub content_type: String,
    pub content_id: String,
    pub target_language: String,
    pub state: LookupState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of one scheduling call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    pub scheduled: u64,
    pub content_items: u64,
    pub skipped_fields: u64,
}

/// Result of one batch drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub processed_count: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub total_characters_used: i64,
    pub limit_exceeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_filter: Option<String>,
}

/// Acknowledgement returned when a priority drain starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityStart {
    pub language: String,
    pub tag: String,
    pub started_at: DateTime<Utc>,
    pub total: i64,
    /// True when the monthly budget was already exhausted at start.
    pub limit_exceeded: bool,
}

/// Observable state of a language's priority drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityStatus {
    pub language: String,
    pub active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub total: i64,
    pub processed: i64,
    pub remaining: i64,
    pub stalled: bool,
}

impl PriorityStatus {
    pub fn idle(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            active: false,
            started_at: None,
            total: 0,
            processed: 0,
            remaining: 0,
            stalled: false,
        }
    }
}

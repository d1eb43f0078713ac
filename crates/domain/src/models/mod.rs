//! Domain models for the translation back office.

pub mod api_key_credential;
pub mod quota;
pub mod stats;
pub mod translation_job;
pub mod translation_log;

pub use api_key_credential::{ApiKeyCredential, KeySelectionMode, KeyStatus};
pub use quota::MonthlyQuota;
pub use stats::{BatchOutcome, PriorityStatus, ScheduleOutcome};
pub use translation_job::{ContentType, JobStatus, NewTranslationJob, TranslationJob};
pub use translation_log::{NewTranslationLog, TranslationLog};

//! Tunables shared by the pipeline services.

use std::time::Duration;

use crate::models::quota::DEFAULT_MONTHLY_CHARACTER_LIMIT;

/// Maximum number of jobs a single priority drain marks.
pub const DEFAULT_PRIORITY_BATCH_CAP: i64 = 50;

/// Settings for scheduling and processing translation jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub batch_size: u32,
    /// Pause between two translation calls of one invocation.
    pub request_delay: Duration,
    /// Upper bound on one translation call.
    pub request_timeout: Duration,
    pub monthly_character_limit: i64,
    pub priority_batch_cap: i64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            source_language: "sk".to_string(),
            target_languages: vec!["en".to_string(), "de".to_string(), "cs".to_string()],
            batch_size: 10,
            request_delay: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
            monthly_character_limit: DEFAULT_MONTHLY_CHARACTER_LIMIT,
            priority_batch_cap: DEFAULT_PRIORITY_BATCH_CAP,
        }
    }
}

impl PipelineSettings {
    pub fn supports_target(&self, language: &str) -> bool {
        self.target_languages.iter().any(|lang| lang == language)
    }
}

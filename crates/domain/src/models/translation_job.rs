//! Translation job domain models.
//!
//! A job is one unit of (content item, field, target language) work. Jobs are
//! created `pending` by the scheduler and move through a small state machine:
//! `pending -> processing -> completed | failed`. No edge re-enters `pending`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Separator between the content identifier and the field name.
pub const FIELD_SEPARATOR: char = ':';

/// Prefix of the tag attached to jobs claimed by a priority drain.
pub const PRIORITY_TAG_PREFIX: &str = "priority_";

/// Lifecycle state of a translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the four job states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job status: {0}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// Kind of source content a job was scheduled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Faq,
    Product,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Faq, ContentType::Product];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Faq => "faq",
            ContentType::Product => "product",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faq" => Ok(ContentType::Faq),
            "product" => Ok(ContentType::Product),
            other => Err(format!("Unknown content type: {}", other)),
        }
    }
}

/// A persisted translation job.
///
/// `content_type` is kept as a string: rows written by other tools may carry
/// types this service does not schedule itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TranslationJob {
    pub id: Uuid,
    pub content_type: String,
    pub content_id: String,
    pub source_language: String,
    pub target_language: String,
    pub source_content: String,
    pub translated_content: Option<String>,
    pub status: JobStatus,
    pub characters_used: i64,
    pub error_message: Option<String>,
    pub priority_tag: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub priority_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranslationJob {
    /// Character count billed when this job is translated.
    pub fn billable_characters(&self) -> i64 {
        shared::validation::billable_characters(&self.source_content)
    }

    /// Human-readable label for the admin dashboard.
    pub fn label(&self) -> String {
        content_label(&self.content_type, &self.content_id)
    }
}

/// A job about to be inserted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslationJob {
    pub content_type: String,
    pub content_id: String,
    pub source_language: String,
    pub target_language: String,
    pub source_content: String,
}

/// One translatable field of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ContentField {
    #[validate(custom(function = "shared::validation::validate_field_name"))]
    pub field_name: String,

    #[validate(length(max = 50000, message = "Source text must be at most 50000 characters"))]
    pub source_text: String,
}

impl ContentField {
    pub fn new(field_name: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            source_text: source_text.into(),
        }
    }
}

/// Request to schedule translation jobs for one content item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleContentRequest {
    pub content_type: ContentType,

    #[validate(custom(function = "shared::validation::validate_content_id"))]
    pub content_id: String,

    #[validate(length(min = 1, max = 20, message = "Between 1 and 20 fields are required"))]
    #[validate(nested)]
    pub fields: Vec<ContentField>,

    /// Empty means every configured target language.
    #[serde(default)]
    pub target_languages: Vec<String>,
}

/// Query for the single-job status lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckStatusQuery {
    pub content_type: String,
    pub content_id: String,
    pub target_language: String,
}

/// Builds the stored content id for one field of a content item.
pub fn compose_content_id(content_id: &str, field_name: &str) -> String {
    format!("{}{}{}", content_id.trim(), FIELD_SEPARATOR, field_name)
}

/// Splits a stored content id into the item id and the optional field name.
pub fn split_content_id(content_id: &str) -> (&str, Option<&str>) {
    match content_id.split_once(FIELD_SEPARATOR) {
        Some((id, field)) => (id, Some(field)),
        None => (content_id, None),
    }
}

/// Builds the tag attached to jobs claimed by a priority drain.
pub fn priority_tag(started_at: DateTime<Utc>) -> String {
    format!("{}{}", PRIORITY_TAG_PREFIX, started_at.timestamp_millis())
}

/// Recovers the drain start time from a priority tag.
pub fn parse_priority_tag(tag: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = tag.strip_prefix(PRIORITY_TAG_PREFIX)?.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Human-readable label, e.g. "FAQ question #12" or "Product 42 (description)".
pub fn content_label(content_type: &str, content_id: &str) -> String {
    let (id, field) = split_content_id(content_id);
    match (content_type.parse::<ContentType>(), field) {
        (Ok(ContentType::Faq), Some(field)) => format!("FAQ {} #{}", field, id),
        (Ok(ContentType::Faq), None) => format!("FAQ #{}", id),
        (Ok(ContentType::Product), Some(field)) => format!("Product {} ({})", id, field),
        (Ok(ContentType::Product), None) => format!("Product {}", id),
        (Err(_), _) => format!("{} {}", content_type, content_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_only_three_edges_are_legal() {
        let mut legal = Vec::new();
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                if from.can_transition_to(to) {
                    legal.push((from, to));
                }
            }
        }
        assert_eq!(
            legal,
            vec![
                (JobStatus::Pending, JobStatus::Processing),
                (JobStatus::Processing, JobStatus::Completed),
                (JobStatus::Processing, JobStatus::Failed),
            ]
        );
    }

    #[test]
    fn test_nothing_reenters_pending() {
        for from in JobStatus::ALL {
            assert!(!from.can_transition_to(JobStatus::Pending));
        }
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_compose_and_split_content_id() {
        let id = compose_content_id("550e8400-e29b-41d4-a716-446655440000", "shortDescription");
        assert_eq!(id, "550e8400-e29b-41d4-a716-446655440000:shortDescription");
        assert_eq!(
            split_content_id(&id),
            ("550e8400-e29b-41d4-a716-446655440000", Some("shortDescription"))
        );
        assert_eq!(split_content_id("12"), ("12", None));
    }

    #[test]
    fn test_priority_tag_round_trip() {
        let started = DateTime::<Utc>::from_timestamp_millis(1_760_000_000_123).unwrap();
        let tag = priority_tag(started);
        assert_eq!(tag, "priority_1760000000123");
        assert_eq!(parse_priority_tag(&tag), Some(started));
        assert_eq!(parse_priority_tag("priority_x"), None);
        assert_eq!(parse_priority_tag("other_1"), None);
    }

    #[test]
    fn test_content_labels() {
        assert_eq!(content_label("faq", "12:question"), "FAQ question #12");
        assert_eq!(content_label("faq", "12"), "FAQ #12");
        assert_eq!(
            content_label("product", "abc:description"),
            "Product abc (description)"
        );
        assert_eq!(content_label("product", "abc"), "Product abc");
        assert_eq!(content_label("banner", "7:title"), "banner 7:title");
    }

    #[test]
    fn test_schedule_request_deserialization() {
        let json = r#"{
            "content_type": "faq",
            "content_id": "12",
            "fields": [{"field_name": "question", "source_text": "Aká je záruka?"}]
        }"#;
        let request: ScheduleContentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.content_type, ContentType::Faq);
        assert!(request.target_languages.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_schedule_request_rejects_bad_field_name() {
        let request = ScheduleContentRequest {
            content_type: ContentType::Product,
            content_id: "abc".to_string(),
            fields: vec![ContentField::new("bad field", "text")],
            target_languages: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_schedule_request_rejects_empty_fields() {
        let request = ScheduleContentRequest {
            content_type: ContentType::Product,
            content_id: "abc".to_string(),
            fields: vec![],
            target_languages: vec![],
        };
        assert!(request.validate().is_err());
    }
}

//! Translation client abstraction.
//!
//! The pipeline only needs two calls from the external API: translate one
//! string into one language, and read the account's character usage.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// HTTP status the translation API uses for an exhausted account quota.
pub const QUOTA_EXCEEDED_STATUS: u16 = 456;

/// Character usage reported by the translation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderUsage {
    pub character_count: i64,
    pub character_limit: i64,
}

impl ProviderUsage {
    pub fn remaining(&self) -> i64 {
        (self.character_limit - self.character_count).max(0)
    }
}

/// Typed failure of a translation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("Translation API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Translation API call timed out after {0} ms")]
    Timeout(u64),

    #[error("Translation API request failed: {0}")]
    Transport(String),

    #[error("Malformed translation API response: {0}")]
    MalformedResponse(String),

    #[error("No active translation API key")]
    NoActiveKey,
}

impl TranslationError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, TranslationError::Http { status, .. } if *status == QUOTA_EXCEEDED_STATUS)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TranslationError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Translates single strings.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translates `text` from `source_language` into `target_language`.
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<String, TranslationError>;

    /// Reads the account's character usage. Used as the connectivity probe.
    async fn usage(&self) -> Result<ProviderUsage, TranslationError>;
}

/// Translates with an explicitly chosen API key. Implemented by the HTTP
/// client and driven by the key pool.
#[async_trait]
pub trait KeyedTranslationClient: Send + Sync {
    async fn translate_with_key(
        &self,
        api_key: &str,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<String, TranslationError>;

    async fn usage_with_key(&self, api_key: &str) -> Result<ProviderUsage, TranslationError>;
}

/// Mock translation provider for development and testing.
///
/// Returns `"[<lang>] <text>"` without any network call.
#[derive(Debug, Clone, Default)]
pub struct MockTranslationProvider {
    /// Every call fails with HTTP 500.
    pub simulate_failure: bool,
    /// Calls targeting these languages fail with HTTP 500.
    pub failing_languages: HashSet<String>,
    /// Artificial latency per call.
    pub delay: Option<Duration>,
    /// Usage reported by the probe.
    pub usage: Option<ProviderUsage>,
    calls: Arc<AtomicUsize>,
}

impl MockTranslationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, language: &str) -> Self {
        self.failing_languages.insert(language.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of translate calls made so far, across clones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for MockTranslationProvider {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        _source_language: &str,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.simulate_failure || self.failing_languages.contains(target_language) {
            tracing::warn!(
                target_language = %target_language,
                "Mock translation provider simulating failure"
            );
            return Err(TranslationError::Http {
                status: 500,
                body: "Simulated failure".to_string(),
            });
        }

        Ok(format!("[{}] {}", target_language, text))
    }

    async fn usage(&self) -> Result<ProviderUsage, TranslationError> {
        if self.simulate_failure {
            return Err(TranslationError::Transport("Simulated failure".to_string()));
        }
        Ok(self.usage.unwrap_or(ProviderUsage {
            character_count: 0,
            character_limit: 500_000,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_detection() {
        let err = TranslationError::Http {
            status: 456,
            body: "Quota exceeded".to_string(),
        };
        assert!(err.is_quota_exceeded());
        assert_eq!(err.status(), Some(456));

        let err = TranslationError::Http {
            status: 403,
            body: "Forbidden".to_string(),
        };
        assert!(!err.is_quota_exceeded());
        assert!(!TranslationError::Timeout(30_000).is_quota_exceeded());
    }

    #[test]
    fn test_error_messages_carry_status_and_body() {
        let err = TranslationError::Http {
            status: 429,
            body: "Too many requests".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Translation API returned HTTP 429: Too many requests"
        );
    }

    #[test]
    fn test_usage_remaining() {
        let usage = ProviderUsage {
            character_count: 499_000,
            character_limit: 500_000,
        };
        assert_eq!(usage.remaining(), 1000);
    }

    #[tokio::test]
    async fn test_mock_translates() {
        let provider = MockTranslationProvider::new();
        let text = provider.translate("Dobrý deň", "en", "sk").await.unwrap();
        assert_eq!(text, "[en] Dobrý deň");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let provider = MockTranslationProvider::failing();
        assert!(provider.translate("x", "en", "sk").await.is_err());
        assert!(provider.usage().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_fails_on_language_only() {
        let provider = MockTranslationProvider::new().fail_on("de");
        assert!(provider.translate("x", "de", "sk").await.is_err());
        assert!(provider.translate("x", "en", "sk").await.is_ok());
        let clone = provider.clone();
        assert_eq!(clone.call_count(), 2);
    }
}

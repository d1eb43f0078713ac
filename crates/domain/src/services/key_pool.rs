//! Selection among stored translation API keys.
//!
//! A pool is built per call from the active keys. The selection mode decides
//! the order in which keys are tried; a failing key hands over to the next
//! candidate and the last error is returned when all of them fail.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::job_store::CredentialSource;
use super::translation_provider::{
    KeyedTranslationClient, ProviderUsage, TranslationError, TranslationProvider,
};
use crate::models::api_key_credential::{ApiKeyCredential, KeySelectionMode, KeyStatus};

/// Name reported for the key taken from configuration.
pub const CONFIGURED_KEY_NAME: &str = "configured";

/// One key available to the pool.
#[derive(Clone, PartialEq, Eq)]
pub struct PoolKey {
    /// `None` for the key taken from configuration.
    pub id: Option<i64>,
    pub name: String,
    pub api_key: String,
    pub is_primary: bool,
    pub status: KeyStatus,
}

impl PoolKey {
    pub fn configured(api_key: impl Into<String>) -> Self {
        Self {
            id: None,
            name: CONFIGURED_KEY_NAME.to_string(),
            api_key: api_key.into(),
            is_primary: true,
            status: KeyStatus::Active,
        }
    }
}

impl From<&ApiKeyCredential> for PoolKey {
    fn from(credential: &ApiKeyCredential) -> Self {
        Self {
            id: Some(credential.id),
            name: credential.name.clone(),
            api_key: credential.api_key.clone(),
            is_primary: credential.is_primary,
            status: credential.status,
        }
    }
}

impl fmt::Debug for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKey")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_primary", &self.is_primary)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPoolError {
    #[error("No active translation API key")]
    NoActiveKey,

    #[error("All {attempts} API key(s) failed, last error from '{key_name}': {source}")]
    AllKeysFailed {
        attempts: usize,
        key_name: String,
        #[source]
        source: TranslationError,
    },
}

impl KeyPoolError {
    /// The translation error behind the failure, if any key was tried.
    pub fn translation_error(&self) -> Option<&TranslationError> {
        match self {
            KeyPoolError::NoActiveKey => None,
            KeyPoolError::AllKeysFailed { source, .. } => Some(source),
        }
    }
}

/// A successful pooled call and the key that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTranslation {
    pub text: String,
    pub key_id: Option<i64>,
    pub key_name: String,
    /// Keys tried, the successful one included.
    pub attempts: usize,
}

/// Ordered set of active keys plus the shared rotation counter.
#[derive(Debug, Clone)]
pub struct KeyPool {
    keys: Vec<PoolKey>,
    rotation: Arc<AtomicUsize>,
}

impl KeyPool {
    /// `keys` must already be filtered to active ones, oldest first.
    pub fn new(keys: Vec<PoolKey>, rotation: Arc<AtomicUsize>) -> Self {
        Self { keys, rotation }
    }

    /// Builds a pool from stored credentials, falling back to the configured
    /// key when none is active.
    pub fn from_credentials(
        credentials: &[ApiKeyCredential],
        configured_key: Option<&str>,
        rotation: Arc<AtomicUsize>,
    ) -> Self {
        let mut keys: Vec<PoolKey> = credentials
            .iter()
            .filter(|credential| credential.is_active)
            .map(PoolKey::from)
            .collect();

        if keys.is_empty() {
            if let Some(key) = configured_key.filter(|key| !key.trim().is_empty()) {
                keys.push(PoolKey::configured(key));
            }
        }

        Self::new(keys, rotation)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The flagged primary key, or the oldest key when none is flagged.
    pub fn primary(&self) -> Option<&PoolKey> {
        self.keys
            .iter()
            .find(|key| key.is_primary)
            .or_else(|| self.keys.first())
    }

    /// Keys in the order a call in `mode` tries them.
    pub fn candidates(&self, mode: KeySelectionMode) -> Result<Vec<&PoolKey>, KeyPoolError> {
        let primary = self.primary().ok_or(KeyPoolError::NoActiveKey)?;

        let candidates = match mode {
            KeySelectionMode::PrimaryOnly => vec![primary],
            KeySelectionMode::Fallback => {
                let ordered: Vec<&PoolKey> = std::iter::once(primary)
                    .chain(self.keys.iter().filter(|key| !std::ptr::eq(*key, primary)))
                    .collect();
                let usable: Vec<&PoolKey> = ordered
                    .iter()
                    .copied()
                    .filter(|key| key.status != KeyStatus::QuotaExceeded)
                    .collect();
                if usable.is_empty() {
                    ordered
                } else {
                    usable
                }
            }
            KeySelectionMode::Sequential => {
                let start = self.rotation.fetch_add(1, Ordering::Relaxed) % self.keys.len();
                self.keys[start..]
                    .iter()
                    .chain(self.keys[..start].iter())
                    .collect()
            }
        };

        Ok(candidates)
    }

    /// Translates with the first candidate that succeeds.
    pub async fn translate(
        &self,
        client: &dyn KeyedTranslationClient,
        mode: KeySelectionMode,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<PooledTranslation, KeyPoolError> {
        let candidates = self.candidates(mode)?;
        let mut last_error = None;

        for (index, key) in candidates.iter().enumerate() {
            match client
                .translate_with_key(&key.api_key, text, target_language, source_language)
                .await
            {
                Ok(translated) => {
                    if index > 0 {
                        tracing::info!(
                            key_name = %key.name,
                            attempts = index + 1,
                            mode = %mode,
                            "Translation served by fallback key"
                        );
                    }
                    return Ok(PooledTranslation {
                        text: translated,
                        key_id: key.id,
                        key_name: key.name.clone(),
                        attempts: index + 1,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        key_name = %key.name,
                        mode = %mode,
                        error = %e,
                        quota_exceeded = e.is_quota_exceeded(),
                        "Translation API key failed"
                    );
                    last_error = Some((key.name.clone(), e));
                }
            }
        }

        match last_error {
            Some((key_name, source)) => Err(KeyPoolError::AllKeysFailed {
                attempts: candidates.len(),
                key_name,
                source,
            }),
            None => Err(KeyPoolError::NoActiveKey),
        }
    }

    /// Usage of the primary key.
    pub async fn usage(
        &self,
        client: &dyn KeyedTranslationClient,
    ) -> Result<ProviderUsage, TranslationError> {
        let primary = self.primary().ok_or(TranslationError::NoActiveKey)?;
        client.usage_with_key(&primary.api_key).await
    }
}

/// [`TranslationProvider`] backed by the stored API keys.
///
/// The pool is rebuilt from the credential source on every call, so key
/// changes made through the admin API apply to the next job.
pub struct PooledTranslationProvider {
    credentials: Arc<dyn CredentialSource>,
    client: Arc<dyn KeyedTranslationClient>,
    configured_key: Option<String>,
    mode: KeySelectionMode,
    rotation: Arc<AtomicUsize>,
}

impl PooledTranslationProvider {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        client: Arc<dyn KeyedTranslationClient>,
        configured_key: Option<String>,
        mode: KeySelectionMode,
        rotation: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            credentials,
            client,
            configured_key,
            mode,
            rotation,
        }
    }

    /// Mode used by queue jobs.
    pub fn mode(&self) -> KeySelectionMode {
        self.mode
    }

    pub fn client(&self) -> &dyn KeyedTranslationClient {
        self.client.as_ref()
    }

    /// Current pool of active keys.
    pub async fn load_pool(&self) -> Result<KeyPool, sqlx::Error> {
        let credentials = self.credentials.active_credentials().await?;
        Ok(KeyPool::from_credentials(
            &credentials,
            self.configured_key.as_deref(),
            self.rotation.clone(),
        ))
    }

    async fn pool_for_call(&self) -> Result<KeyPool, TranslationError> {
        self.load_pool()
            .await
            .map_err(|e| TranslationError::Transport(format!("Failed to load API keys: {}", e)))
    }
}

#[async_trait]
impl TranslationProvider for PooledTranslationProvider {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<String, TranslationError> {
        let pool = self.pool_for_call().await?;
        pool.translate(
            self.client.as_ref(),
            self.mode,
            text,
            target_language,
            source_language,
        )
        .await
        .map(|translation| translation.text)
        .map_err(|e| match e {
            KeyPoolError::NoActiveKey => TranslationError::NoActiveKey,
            KeyPoolError::AllKeysFailed { source, .. } => source,
        })
    }

    async fn usage(&self) -> Result<ProviderUsage, TranslationError> {
        let pool = self.pool_for_call().await?;
        pool.usage(self.client.as_ref()).await
    }
}

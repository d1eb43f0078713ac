//! Translation API key credentials and key selection modes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Health of a stored API key, refreshed by explicit test/refresh actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Active,
    Error,
    QuotaExceeded,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Error => "error",
            KeyStatus::QuotaExceeded => "quota_exceeded",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(KeyStatus::Active),
            "error" => Ok(KeyStatus::Error),
            "quota_exceeded" => Ok(KeyStatus::QuotaExceeded),
            other => Err(format!("Unknown key status: {}", other)),
        }
    }
}

/// How a call picks among the active API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelectionMode {
    /// Only the primary key is used.
    PrimaryOnly,
    /// Primary first, then the remaining active keys on failure.
    #[default]
    Fallback,
    /// Round-robin start over active keys, failing over to the next one.
    Sequential,
}

impl KeySelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySelectionMode::PrimaryOnly => "primary_only",
            KeySelectionMode::Fallback => "fallback",
            KeySelectionMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for KeySelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeySelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_only" | "primary" => Ok(KeySelectionMode::PrimaryOnly),
            "fallback" => Ok(KeySelectionMode::Fallback),
            "sequential" | "round_robin" => Ok(KeySelectionMode::Sequential),
            other => Err(format!("Unknown key selection mode: {}", other)),
        }
    }
}

/// A stored translation API key.
#[derive(Clone, PartialEq)]
pub struct ApiKeyCredential {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub masked_key: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub status: KeyStatus,
    pub quota_used: Option<i64>,
    pub quota_limit: Option<i64>,
    pub quota_remaining: Option<i64>,
    pub last_error: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Key material stays out of logs.
impl fmt::Debug for ApiKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("masked_key", &self.masked_key)
            .field("is_primary", &self.is_primary)
            .field("is_active", &self.is_active)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Request to store a new API key.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateApiKeyCredentialRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 10, max = 200, message = "API key must be 10-200 characters"))]
    pub api_key: String,

    #[serde(default)]
    pub is_primary: bool,
}

/// Request to activate or deactivate a key.
#[derive(Debug, Clone, Deserialize)]
pub struct SetKeyActiveRequest {
    pub is_active: bool,
}

/// API representation of a stored key (never includes the key itself).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiKeyCredentialResponse {
    pub id: i64,
    pub name: String,
    pub masked_key: String,
    pub is_primary: bool,
    pub is_active: bool,
    pub status: KeyStatus,
    pub quota_used: Option<i64>,
    pub quota_limit: Option<i64>,
    pub quota_remaining: Option<i64>,
    pub last_error: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyCredential> for ApiKeyCredentialResponse {
    fn from(key: ApiKeyCredential) -> Self {
        Self {
            id: key.id,
            name: key.name,
            masked_key: key.masked_key,
            is_primary: key.is_primary,
            is_active: key.is_active,
            status: key.status,
            quota_used: key.quota_used,
            quota_limit: key.quota_limit,
            quota_remaining: key.quota_remaining,
            last_error: key.last_error,
            last_tested_at: key.last_tested_at,
            last_synced_at: key.last_synced_at,
            created_at: key.created_at,
        }
    }
}

/// Response for listing stored keys.
#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeyCredentialsResponse {
    pub api_keys: Vec<ApiKeyCredentialResponse>,
    pub total: usize,
}

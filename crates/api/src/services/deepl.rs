//! DeepL-compatible HTTP client.
//!
//! Keys ending in `:fx` belong to the free tier and are sent to the free
//! endpoint; every other key goes to the pro endpoint, unless a base URL is
//! configured.

use async_trait::async_trait;
use domain::services::{KeyedTranslationClient, ProviderUsage, TranslationError};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::DeeplConfig;

pub const FREE_API_URL: &str = "https://api-free.deepl.com";
pub const PRO_API_URL: &str = "https://api.deepl.com";

/// Longest error body kept in a [`TranslationError`].
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    character_count: i64,
    character_limit: i64,
}

pub struct DeeplClient {
    client: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl DeeplClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(config: &DeeplConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dealer-translate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url_override()
                .map(|url| url.trim_end_matches('/').to_string()),
            timeout,
        })
    }

    /// Endpoint root for a key.
    pub fn base_url_for(&self, api_key: &str) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None if shared::crypto::is_free_tier_key(api_key) => FREE_API_URL,
            None => PRO_API_URL,
        }
    }

    fn auth_header(api_key: &str) -> String {
        format!("DeepL-Auth-Key {}", api_key.trim())
    }

    fn transport_error(&self, e: reqwest::Error) -> TranslationError {
        if e.is_timeout() {
            TranslationError::Timeout(self.timeout.as_millis() as u64)
        } else {
            TranslationError::Transport(e.to_string())
        }
    }

    /// Non-2xx responses become [`TranslationError::Http`] with a bounded body.
    async fn check_status(&self, response: Response) -> Result<Response, TranslationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TranslationError::Http {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        })
    }
}

#[async_trait]
impl KeyedTranslationClient for DeeplClient {
    async fn translate_with_key(
        &self,
        api_key: &str,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/v2/translate", self.base_url_for(api_key));
        let target = target_language.to_uppercase();
        let source = source_language.to_uppercase();

        debug!(url = %url, target_lang = %target, characters = text.chars().count(), "Calling translate API");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(api_key))
            .form(&[
                ("text", text),
                ("target_lang", target.as_str()),
                ("source_lang", source.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let parsed: TranslateResponse = self
            .check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|translation| translation.text)
            .ok_or_else(|| TranslationError::MalformedResponse("No translations in response".into()))
    }

    async fn usage_with_key(&self, api_key: &str) -> Result<ProviderUsage, TranslationError> {
        let url = format!("{}/v2/usage", self.base_url_for(api_key));

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, Self::auth_header(api_key))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let usage: UsageResponse = self
            .check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

        Ok(ProviderUsage {
            character_count: usage.character_count,
            character_limit: usage.character_limit,
        })
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}…", &body[..index]),
        None => body.to_string(),
    }
}

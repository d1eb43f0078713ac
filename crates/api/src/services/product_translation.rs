//! Synchronous per-product translation through the key pool.
//!
//! Runs alongside the job queue and does not touch `translation_jobs`. Every
//! field/language attempt is appended to `translation_logs`; successful
//! translations are upserted into `product_translations`.

use std::sync::Arc;
use std::time::Instant;

use domain::models::translation_log::{
    ProductFieldResult, TranslateProductRequest, TranslateProductResponse, LOG_STATUS_ERROR,
    LOG_STATUS_SUCCESS,
};
use domain::models::{KeySelectionMode, NewTranslationLog};
use domain::services::{KeyPool, PooledTranslationProvider, TranslationPipeline};
use persistence::repositories::{
    ContentRepository, ProductTranslationRepository, TranslationLogRepository,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::metrics::{record_characters, record_job_results};

const METRICS_SOURCE: &str = "product";

/// Error recorded for pairs skipped because the month's budget ran out.
const BUDGET_EXHAUSTED_MESSAGE: &str = "monthly quota exhausted";

pub struct ProductTranslationService {
    content: ContentRepository,
    translations: ProductTranslationRepository,
    logs: TranslationLogRepository,
    provider: Arc<PooledTranslationProvider>,
    pipeline: Arc<TranslationPipeline>,
    default_mode: KeySelectionMode,
}

/// One field/language pair to translate.
struct PendingField<'a> {
    field_name: &'a str,
    text: &'a str,
    target_language: &'a str,
}

impl ProductTranslationService {
    pub fn new(
        content: ContentRepository,
        translations: ProductTranslationRepository,
        logs: TranslationLogRepository,
        provider: Arc<PooledTranslationProvider>,
        pipeline: Arc<TranslationPipeline>,
        default_mode: KeySelectionMode,
    ) -> Self {
        Self {
            content,
            translations,
            logs,
            provider,
            pipeline,
            default_mode,
        }
    }

    /// Translates every non-blank field of a product into the requested
    /// languages.
    pub async fn translate_product(
        &self,
        product_id: Uuid,
        request: &TranslateProductRequest,
    ) -> Result<TranslateProductResponse, ApiError> {
        let product = self
            .content
            .find_product(product_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", product_id)))?;

        let targets = self
            .pipeline
            .scheduler
            .resolve_targets(&request.target_languages)?;

        if !self.pipeline.quota.check_monthly_limit().await? {
            return Err(ApiError::ServiceUnavailable(
                "Monthly translation quota exhausted".into(),
            ));
        }

        let pool = self.provider.load_pool().await?;
        if pool.is_empty() {
            return Err(ApiError::ServiceUnavailable(
                "No active translation API key".into(),
            ));
        }

        let mode = request.mode.unwrap_or(self.default_mode);
        let fields = product.fields();
        let languages = targets.as_slice();
        let pending: Vec<PendingField<'_>> = fields
            .iter()
            .filter(|field| shared::validation::is_translatable(&field.source_text))
            .flat_map(move |field| {
                languages.iter().map(move |language| PendingField {
                    field_name: &field.field_name,
                    text: &field.source_text,
                    target_language: language,
                })
            })
            .collect();

        let mut response = TranslateProductResponse {
            product_id,
            mode,
            succeeded: 0,
            failed: 0,
            total_characters_used: 0,
            results: Vec::with_capacity(pending.len()),
        };

        let mut reserved = 0;
        let result = self
            .translate_fields(&pool, mode, product_id, &mut reserved, &pending, &mut response)
            .await;
        // Characters already billed by the API count even if a later write failed.
        self.pipeline
            .quota
            .settle(reserved, response.total_characters_used)
            .await?;
        record_job_results(
            METRICS_SOURCE,
            response.succeeded as u64,
            response.failed as u64,
        );
        record_characters(METRICS_SOURCE, response.total_characters_used);
        result?;

        tracing::info!(
            product_id = %product_id,
            mode = %mode,
            succeeded = response.succeeded,
            failed = response.failed,
            characters = response.total_characters_used,
            "Product translation finished"
        );

        Ok(response)
    }

    async fn translate_fields(
        &self,
        pool: &KeyPool,
        mode: KeySelectionMode,
        product_id: Uuid,
        reserved: &mut i64,
        pending: &[PendingField<'_>],
        response: &mut TranslateProductResponse,
    ) -> Result<(), ApiError> {
        let settings = self.pipeline.settings();
        let source_language = settings.source_language.as_str();

        for (index, field) in pending.iter().enumerate() {
            if index > 0 && !settings.request_delay.is_zero() {
                tokio::time::sleep(settings.request_delay).await;
            }

            let characters = shared::validation::billable_characters(field.text);
            let request_payload = json!({
                "text": field.text,
                "source_lang": source_language,
                "target_lang": field.target_language,
                "mode": mode,
            });
            let mut log = NewTranslationLog {
                product_id,
                api_key_id: None,
                api_key_name: None,
                translation_mode: mode,
                field_name: field.field_name.to_string(),
                source_language: source_language.to_string(),
                target_language: field.target_language.to_string(),
                status: LOG_STATUS_ERROR,
                characters_used: 0,
                error_message: None,
                processing_time_ms: 0,
                request_payload,
                response_payload: None,
            };

            let fits = {
                let mut budget = self.pipeline.quota.budget().await?;
                let fits = characters <= budget.available();
                if fits {
                    budget.reserve(characters);
                    *reserved += characters;
                }
                fits
            };
            if !fits {
                log.error_message = Some(BUDGET_EXHAUSTED_MESSAGE.to_string());
                self.logs.insert(&log).await?;
                response.failed += 1;
                response.results.push(ProductFieldResult {
                    field_name: log.field_name,
                    target_language: log.target_language,
                    success: false,
                    translated_text: None,
                    api_key_name: None,
                    error: Some(BUDGET_EXHAUSTED_MESSAGE.to_string()),
                    characters_used: 0,
                });
                continue;
            }

            let started = Instant::now();
            let outcome = pool
                .translate(
                    self.provider.client(),
                    mode,
                    field.text,
                    field.target_language,
                    source_language,
                )
                .await;
            log.processing_time_ms = started.elapsed().as_millis() as i64;

            match outcome {
                Ok(translation) => {
                    self.translations
                        .upsert(
                            product_id,
                            field.target_language,
                            field.field_name,
                            &translation.text,
                        )
                        .await?;

                    log.api_key_id = translation.key_id;
                    log.api_key_name = Some(translation.key_name.clone());
                    log.status = LOG_STATUS_SUCCESS;
                    log.characters_used = characters;
                    log.response_payload = Some(json!({
                        "text": translation.text,
                        "attempts": translation.attempts,
                    }));
                    self.logs.insert(&log).await?;

                    response.succeeded += 1;
                    response.total_characters_used += characters;
                    response.results.push(ProductFieldResult {
                        field_name: log.field_name,
                        target_language: log.target_language,
                        success: true,
                        translated_text: Some(translation.text),
                        api_key_name: Some(translation.key_name),
                        error: None,
                        characters_used: characters,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        product_id = %product_id,
                        field = field.field_name,
                        target_language = field.target_language,
                        error = %e,
                        "Product field translation failed"
                    );

                    let key_name = match &e {
                        domain::services::KeyPoolError::AllKeysFailed { key_name, .. } => {
                            Some(key_name.clone())
                        }
                        domain::services::KeyPoolError::NoActiveKey => None,
                    };
                    log.api_key_name = key_name.clone();
                    log.error_message = Some(e.to_string());
                    log.response_payload = e.translation_error().map(|source| {
                        json!({ "status": source.status(), "error": source.to_string() })
                    });
                    self.logs.insert(&log).await?;

                    response.failed += 1;
                    response.results.push(ProductFieldResult {
                        field_name: log.field_name,
                        target_language: log.target_language,
                        success: false,
                        translated_text: None,
                        api_key_name: key_name,
                        error: log.error_message,
                        characters_used: 0,
                    });
                }
            }
        }

        Ok(())
    }
}

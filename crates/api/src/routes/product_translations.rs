//! Synchronous product translation routes and their audit log.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::translation_log::{
    ListTranslationLogsQuery, TranslateProductRequest, TranslateProductResponse,
};
use domain::models::TranslationLog;
use persistence::entities::ProductTranslationEntity;
use persistence::repositories::{ContentRepository, ProductTranslationRepository, TranslationLogRepository};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ProductTranslationsResponse {
    pub product_id: Uuid,
    pub translations: Vec<ProductTranslationEntity>,
}

#[derive(Debug, Serialize)]
pub struct TranslationLogsResponse {
    pub logs: Vec<TranslationLog>,
    pub total: usize,
}

/// POST /api/v1/admin/products/:product_id/translate
///
/// Translates the product's fields immediately through the key pool. Failed
/// fields are reported in the results without failing the request. The work
/// runs on its own task so a disconnecting client cannot cut it short.
pub async fn translate_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<TranslateProductRequest>,
) -> Result<Json<TranslateProductResponse>, ApiError> {
    let translator = state.product_translator.clone();
    let response = tokio::spawn(async move {
        translator.translate_product(product_id, &request).await
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Product translation task failed: {}", e)))??;
    Ok(Json(response))
}

/// GET /api/v1/admin/products/:product_id/translations
pub async fn list_product_translations(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductTranslationsResponse>, ApiError> {
    let content = ContentRepository::new(state.pool.clone());
    if content.find_product(product_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Product not found: {}",
            product_id
        )));
    }

    let repo = ProductTranslationRepository::new(state.pool.clone());
    let translations = repo.list_for_product(product_id).await?;

    Ok(Json(ProductTranslationsResponse {
        product_id,
        translations,
    }))
}

/// GET /api/v1/admin/translation-logs
pub async fn list_translation_logs(
    State(state): State<AppState>,
    Query(query): Query<ListTranslationLogsQuery>,
) -> Result<Json<TranslationLogsResponse>, ApiError> {
    let repo = TranslationLogRepository::new(state.pool.clone());
    let logs = repo.list(query.product_id, query.limit_clamped()).await?;

    Ok(Json(TranslationLogsResponse {
        total: logs.len(),
        logs,
    }))
}

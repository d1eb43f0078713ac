//! Translation API key management routes.
//!
//! Stored keys form the pool the translation calls draw from. Responses only
//! ever carry the masked key.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::api_key_credential::{
    ApiKeyCredentialResponse, CreateApiKeyCredentialRequest, ListApiKeyCredentialsResponse,
    SetKeyActiveRequest,
};
use domain::models::KeyStatus;
use domain::services::TranslationError;
use persistence::repositories::ApiKeyCredentialRepository;
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

fn key_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("API key not found: {}", id))
}

/// Status a failed usage probe leaves on the key.
fn status_for_error(error: &TranslationError) -> KeyStatus {
    if error.is_quota_exceeded() {
        KeyStatus::QuotaExceeded
    } else {
        KeyStatus::Error
    }
}

/// GET /api/v1/admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
) -> Result<Json<ListApiKeyCredentialsResponse>, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let api_keys: Vec<ApiKeyCredentialResponse> =
        repo.list().await?.into_iter().map(Into::into).collect();

    Ok(Json(ListApiKeyCredentialsResponse {
        total: api_keys.len(),
        api_keys,
    }))
}

/// POST /api/v1/admin/api-keys
///
/// The first stored key becomes primary even when not requested.
pub async fn create_api_key(
    State(state): State<AppState>,
    Json(request): Json<CreateApiKeyCredentialRequest>,
) -> Result<(StatusCode, Json<ApiKeyCredentialResponse>), ApiError> {
    request.validate()?;

    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let is_primary = request.is_primary || repo.list().await?.is_empty();

    let created = repo
        .create(request.name.trim(), request.api_key.trim(), is_primary)
        .await?;

    info!(
        key_id = created.id,
        name = %created.name,
        masked_key = %created.masked_key,
        is_primary = created.is_primary,
        "Translation API key stored"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// DELETE /api/v1/admin/api-keys/:id
pub async fn delete_api_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    if !repo.delete(id).await? {
        return Err(key_not_found(id));
    }

    info!(key_id = id, "Translation API key deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/api-keys/:id/primary
pub async fn set_primary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiKeyCredentialResponse>, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let key = repo.set_primary(id).await?.ok_or_else(|| key_not_found(id))?;

    info!(key_id = id, name = %key.name, "Primary translation API key changed");
    Ok(Json(key.into()))
}

/// POST /api/v1/admin/api-keys/:id/active
pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SetKeyActiveRequest>,
) -> Result<Json<ApiKeyCredentialResponse>, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let key = repo
        .set_active(id, request.is_active)
        .await?
        .ok_or_else(|| key_not_found(id))?;

    info!(key_id = id, is_active = key.is_active, "Translation API key toggled");
    Ok(Json(key.into()))
}

/// POST /api/v1/admin/api-keys/:id/test
///
/// Probes the usage endpoint with the key and stores the outcome. A failing
/// key is not an error of this request: the response carries the new status
/// and `last_error`.
pub async fn test_api_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiKeyCredentialResponse>, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let key = repo.find_by_id(id).await?.ok_or_else(|| key_not_found(id))?;

    let probe = state.provider.client().usage_with_key(&key.api_key).await;
    let updated = match probe {
        Ok(usage) => {
            let status = if usage.remaining() <= 0 {
                KeyStatus::QuotaExceeded
            } else {
                KeyStatus::Active
            };
            repo.record_test_result(id, status, Some(usage), None).await?
        }
        Err(e) => {
            warn!(key_id = id, error = %e, "Translation API key test failed");
            let message = e.to_string();
            repo.record_test_result(id, status_for_error(&e), None, Some(&message))
                .await?
        }
    };

    Ok(Json(updated.ok_or_else(|| key_not_found(id))?.into()))
}

/// POST /api/v1/admin/api-keys/:id/refresh
///
/// Refreshes the provider-side usage counters of the key.
pub async fn refresh_usage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiKeyCredentialResponse>, ApiError> {
    let repo = ApiKeyCredentialRepository::new(state.pool.clone());
    let key = repo.find_by_id(id).await?.ok_or_else(|| key_not_found(id))?;

    let usage = state
        .provider
        .client()
        .usage_with_key(&key.api_key)
        .await
        .map_err(|e| {
            warn!(key_id = id, error = %e, "Failed to refresh translation API key usage");
            ApiError::ServiceUnavailable(format!("Usage lookup failed: {}", e))
        })?;

    let updated = repo
        .record_usage(id, usage)
        .await?
        .ok_or_else(|| key_not_found(id))?;

    info!(
        key_id = id,
        quota_used = ?updated.quota_used,
        quota_limit = ?updated.quota_limit,
        "Translation API key usage refreshed"
    );
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_error() {
        let quota = TranslationError::Http {
            status: 456,
            body: "Quota exceeded".to_string(),
        };
        assert_eq!(status_for_error(&quota), KeyStatus::QuotaExceeded);

        let forbidden = TranslationError::Http {
            status: 403,
            body: "Forbidden".to_string(),
        };
        assert_eq!(status_for_error(&forbidden), KeyStatus::Error);
        assert_eq!(
            status_for_error(&TranslationError::Timeout(30_000)),
            KeyStatus::Error
        );
    }
}

//! Translation job queue routes.
//!
//! Scheduling, batch processing, priority drains and the read-only
//! diagnostics of the back office.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::models::quota::QuotaUsageResponse;
use domain::models::stats::{RecentTranslation, StatusLookup, TranslationOverview};
use domain::models::translation_job::{CheckStatusQuery, ScheduleContentRequest};
use domain::models::{BatchOutcome, ContentType, PriorityStatus, ScheduleOutcome};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_batch_outcome;

/// Upper bound for one on-demand batch.
const MAX_JOBS_PER_REQUEST: u32 = 50;

const DEFAULT_RECENT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ScheduleAllQuery {
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub max_jobs: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuotaQuery {
    /// `YYYY-MM`; the current month when absent.
    pub month: Option<String>,
}

/// POST /api/v1/admin/translations/schedule
pub async fn schedule_content(
    State(state): State<AppState>,
    Json(request): Json<ScheduleContentRequest>,
) -> Result<(StatusCode, Json<ScheduleOutcome>), ApiError> {
    request.validate()?;

    let outcome = state
        .pipeline
        .scheduler
        .schedule_content(
            request.content_type,
            &request.content_id,
            &request.fields,
            &request.target_languages,
        )
        .await?;

    info!(
        content_type = %request.content_type.as_str(),
        content_id = %request.content_id,
        scheduled = outcome.scheduled,
        "Translation jobs scheduled"
    );

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/v1/admin/translations/schedule-all
///
/// Schedules every existing FAQ item and product, or only those of
/// `content_type`.
pub async fn schedule_all_existing(
    State(state): State<AppState>,
    Query(query): Query<ScheduleAllQuery>,
) -> Result<Json<ScheduleOutcome>, ApiError> {
    let outcome = state
        .pipeline
        .scheduler
        .schedule_all_existing(query.content_type)
        .await?;

    info!(
        content_items = outcome.content_items,
        scheduled = outcome.scheduled,
        "Existing content scheduled for translation"
    );

    Ok(Json(outcome))
}

/// POST /api/v1/admin/translations/process
pub async fn process_pending_batch(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let max_jobs = query
        .max_jobs
        .unwrap_or(state.pipeline.settings().batch_size)
        .clamp(1, MAX_JOBS_PER_REQUEST);

    let outcome = state.pipeline.batches.process_pending_batch(max_jobs).await?;
    record_batch_outcome("manual", &outcome);

    Ok(Json(outcome))
}

/// POST /api/v1/admin/translations/priority/:language
///
/// Returns 202 when a drain was spawned and 200 when nothing was marked.
pub async fn start_priority(
    State(state): State<AppState>,
    Path(language): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let language = language.trim().to_lowercase();
    let started = state.pipeline.drains.start(&language).await?;

    let status = if started.total > 0 {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(started)))
}

/// GET /api/v1/admin/translations/priority/:language
pub async fn get_priority_status(
    State(state): State<AppState>,
    Path(language): Path<String>,
) -> Result<Json<PriorityStatus>, ApiError> {
    let language = language.trim().to_lowercase();
    let status = state.pipeline.drains.status(&language).await?;
    Ok(Json(status))
}

/// GET /api/v1/admin/translations/overview
pub async fn get_overview(
    State(state): State<AppState>,
) -> Result<Json<TranslationOverview>, ApiError> {
    Ok(Json(state.pipeline.diagnostics.overview().await?))
}

/// GET /api/v1/admin/translations/recent
pub async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<RecentTranslation>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.pipeline.diagnostics.recent(limit).await?))
}

/// GET /api/v1/admin/translations/status
pub async fn check_status(
    State(state): State<AppState>,
    Query(query): Query<CheckStatusQuery>,
) -> Result<Json<StatusLookup>, ApiError> {
    Ok(Json(state.pipeline.diagnostics.check_status(&query).await?))
}

/// GET /api/v1/admin/translations/quota
pub async fn get_quota(
    State(state): State<AppState>,
    Query(query): Query<QuotaQuery>,
) -> Result<Json<QuotaUsageResponse>, ApiError> {
    let month = query.month.as_deref().map(str::trim);
    if let Some(month) = month {
        if !is_month_key(month) {
            return Err(ApiError::Validation(format!(
                "month must be formatted as YYYY-MM, got '{}'",
                month
            )));
        }
    }

    let quota = state.pipeline.quota.usage(month).await?;
    Ok(Json(quota.into()))
}

fn is_month_key(value: &str) -> bool {
    match value.split_once('-') {
        Some((year, month)) => {
            year.len() == 4
                && year.chars().all(|c| c.is_ascii_digit())
                && month.len() == 2
                && month.chars().all(|c| c.is_ascii_digit())
                && matches!(month.parse::<u32>(), Ok(1..=12))
        }
        None => false,
    }
}

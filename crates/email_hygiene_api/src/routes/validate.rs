//! Single and batch validation route handlers

use crate::{api_handler::*, AppState};
use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// POST /v1/validate
#[instrument(skip_all, fields(request_id))]
pub async fn validate_email_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> ApiResult<ValidateResponse> {
    let request_id = request_id_or_new(request.request_id);
    tracing::Span::current().record("request_id", request_id.as_str());

    Ok(Json(validate_one(&state, &request.email, request_id).await))
}

/// GET /v1/validate?email=jane@example.com
#[instrument(skip_all, fields(request_id))]
pub async fn validate_email_query_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ValidateQuery>,
) -> ApiResult<ValidateResponse> {
    let request_id = new_request_id();
    tracing::Span::current().record("request_id", request_id.as_str());

    let Some(email) = query.email else {
        warn!("Validation request without an email parameter");
        return Err(ApiError::InvalidRequest(
            "query parameter 'email' is required".to_string(),
        ));
    };

    Ok(Json(validate_one(&state, &email, request_id).await))
}

async fn validate_one(state: &AppState, email: &str, request_id: String) -> ValidateResponse {
    let result = state.pipeline.validate_email(email).await;
    info!(
        "Validation completed: status={}, corrected={}, recheck_needed={}",
        result.status, result.was_corrected, result.recheck_needed
    );
    ValidateResponse { request_id, result }
}

/// POST /v1/validate/batch
///
/// Entries are validated sequentially and returned in input order.
#[instrument(skip_all, fields(request_id, batch_size = request.emails.len()))]
pub async fn validate_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<BatchResponse> {
    let request_id = request_id_or_new(request.request_id);
    tracing::Span::current().record("request_id", request_id.as_str());

    let max = state.config.batch.max_items;
    if request.emails.len() > max {
        warn!("Rejecting batch of {} emails (limit {})", request.emails.len(), max);
        return Err(ApiError::BatchTooLarge {
            got: request.emails.len(),
            max,
        });
    }

    let results = state.pipeline.validate_batch(&request.emails).await;
    info!("Batch validation completed: {} results", results.len());

    Ok(Json(BatchResponse {
        request_id,
        count: results.len(),
        results,
    }))
}

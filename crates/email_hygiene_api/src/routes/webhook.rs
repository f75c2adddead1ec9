//! CRM contact webhook
//!
//! Validates the contact's email, then writes the verdict back through the
//! configured [`ContactUpdater`](crate::crm::ContactUpdater).

use crate::{api_handler::*, AppState};
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// POST /webhooks/contact
#[instrument(skip_all, fields(request_id, contact_id = %request.contact_id))]
pub async fn contact_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WebhookRequest>,
) -> ApiResult<WebhookResponse> {
    let request_id = new_request_id();
    tracing::Span::current().record("request_id", request_id.as_str());

    if request.contact_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("contact_id must not be empty".to_string()));
    }

    let result = state.pipeline.validate_email(&request.email).await;

    let crm_updated = match state
        .contact_updater
        .update_contact(&request.contact_id, &result)
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            warn!("CRM write-back failed: {}", e);
            false
        }
    };

    info!(
        "Contact webhook processed: status={}, crm_updated={}",
        result.status, crm_updated
    );

    Ok(Json(WebhookResponse {
        request_id,
        contact_id: request.contact_id,
        crm_updated,
        result,
    }))
}

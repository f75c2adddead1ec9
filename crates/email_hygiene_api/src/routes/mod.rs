//! API Routes Module
//!
//! - `validate`: single and batch email validation
//! - `webhook`: CRM contact webhook with write-back
//! - `health`: health checks and monitoring endpoints

pub mod health;
pub mod validate;
pub mod webhook;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build all API routes and apply the shared application state
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Validation endpoints
        .route(
            "/v1/validate",
            get(validate::validate_email_query_handler).post(validate::validate_email_handler),
        )
        .route("/v1/validate/batch", post(validate::validate_batch_handler))
        // CRM integration
        .route("/webhooks/contact", post(webhook::contact_webhook_handler))
        // Health and monitoring endpoints
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/admin/stats", get(health::stats_handler))
        .with_state(state)
}

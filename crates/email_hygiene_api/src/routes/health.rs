//! Health check and monitoring routes

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use email_hygiene_core::PipelineStats;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub valid_domains: usize,
    pub timestamp: String,
}

/// GET /ready
///
/// Ready once the lookup store holds at least the seed domains.
pub async fn ready_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let valid_domains = state.pipeline.lookup().domain_count().await;
    let ready = valid_domains > 0;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            valid_domains,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// GET /metrics
///
/// Prometheus text exposition of the pipeline statistics.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    let stats = state.pipeline.get_stats().await;
    (StatusCode::OK, render_metrics(&stats))
}

pub fn render_metrics(stats: &PipelineStats) -> String {
    let metrics: [(&str, &str, &str, u64); 7] = [
        (
            "email_hygiene_valid_domains",
            "gauge",
            "Domains in the valid-domain set",
            stats.valid_domains_count as u64,
        ),
        (
            "email_hygiene_known_valid_emails",
            "gauge",
            "Emails in the known-valid set",
            stats.known_valid_emails_count as u64,
        ),
        (
            "email_hygiene_domain_typo_rules",
            "gauge",
            "Domain typo correction rules",
            stats.domain_typo_rules as u64,
        ),
        (
            "email_hygiene_tld_rules",
            "gauge",
            "TLD correction rules",
            stats.tld_rules as u64,
        ),
        (
            "email_hygiene_validations_total",
            "counter",
            "Emails validated",
            stats.validations_total,
        ),
        (
            "email_hygiene_corrections_total",
            "counter",
            "Emails rewritten by a correction rule",
            stats.corrections_total,
        ),
        (
            "email_hygiene_deliverability_checks_total",
            "counter",
            "Calls made to the deliverability checker",
            stats.deliverability_checks_total,
        ),
    ];

    let mut out = String::new();
    for (name, kind, help, value) in metrics {
        // Writing to a String cannot fail
        let _ = writeln!(out, "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n");
    }
    let _ = writeln!(
        out,
        "# HELP email_hygiene_build_info Build information\n# TYPE email_hygiene_build_info gauge\nemail_hygiene_build_info{{version=\"{}\"}} 1",
        env!("CARGO_PKG_VERSION")
    );
    out
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub version: String,
    pub pipeline_stats: PipelineStats,
    pub timestamp: String,
}

/// GET /admin/stats
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        pipeline_stats: state.pipeline.get_stats().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

//! Email Hygiene API Server
//!
//! Exposes the email hygiene pipeline over HTTP and writes validation
//! verdicts back to the CRM from its contact webhook.

use anyhow::Context;
use axum::Router;
use email_hygiene_core::lookup::FileLookupBackend;
use email_hygiene_core::privacy::PrivacyProcessor;
use email_hygiene_core::recorder::JsonlCorrectionRecorder;
use email_hygiene_core::zerobounce::ZeroBounceChecker;
use email_hygiene_core::{DomainCorrector, ValidationPipeline};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api_handler;
mod config;
mod crm;
mod routes;

use config::AppConfig;
use crm::{ContactUpdater, HubSpotContactUpdater, NoopContactUpdater};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ValidationPipeline>,
    pub contact_updater: Arc<dyn ContactUpdater>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config);

    info!("Starting Email Hygiene API v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = build_pipeline(&config)
        .await
        .context("failed to initialize validation pipeline")?;

    let stats = pipeline.get_stats().await;
    info!(
        "Pipeline initialized - {} valid domains, {} known-valid emails, {} typo rules, {} tld rules",
        stats.valid_domains_count,
        stats.known_valid_emails_count,
        stats.domain_typo_rules,
        stats.tld_rules
    );

    let contact_updater = build_contact_updater(&config)?;

    let app_state = AppState {
        pipeline: Arc::new(pipeline),
        contact_updater,
        config: Arc::new(config.clone()),
    };

    let app = create_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.host))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Validation API: http://{}/v1/validate", addr);
    info!("Contact webhook: http://{}/webhooks/contact", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Wire the pipeline to file storage and the deliverability provider per config
async fn build_pipeline(config: &AppConfig) -> anyhow::Result<ValidationPipeline> {
    let corrector = DomainCorrector::new().with_extra_domain_typos(
        config
            .validation
            .extra_domain_typos
            .iter()
            .map(|(typo, fixed)| (typo.clone(), fixed.clone())),
    );
    let mut builder =
        ValidationPipeline::builder(config.validation.to_core()).corrector(corrector);

    match &config.storage.data_dir {
        Some(data_dir) => {
            info!("Using data directory {}", data_dir.display());
            builder = builder
                .lookup_backend(Arc::new(FileLookupBackend::new(data_dir)))
                .recorder(Arc::new(JsonlCorrectionRecorder::new(data_dir)));
        }
        None => warn!("No data directory configured, learned emails are kept in memory only"),
    }

    if config.validation.use_deliverability_check {
        let checker = ZeroBounceChecker::new(config.deliverability.clone())?;
        builder = builder.checker(Arc::new(checker));
    }

    if let Some(salt) = &config.security.privacy_salt {
        builder = builder.privacy(PrivacyProcessor::new(salt.as_bytes().to_vec()));
    }

    Ok(builder.build().await?)
}

fn build_contact_updater(config: &AppConfig) -> anyhow::Result<Arc<dyn ContactUpdater>> {
    match config.crm.access_token.clone().filter(|t| !t.is_empty()) {
        Some(token) => Ok(Arc::new(HubSpotContactUpdater::new(&config.crm, token)?)),
        None => {
            info!("No CRM token configured, contact write-back disabled");
            Ok(Arc::new(NoopContactUpdater))
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors_origins = &state.config.security.cors_origins;
    let allow_origin = if cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(cors_origins.iter().filter_map(|o| o.parse().ok()))
    };

    routes::build_routes(Arc::new(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
}

/// Initialize tracing and logging
fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

//! Deliverability checks through the ZeroBounce v2 validate API
//!
//! Provider statuses are decoded into a closed enum. Anything the provider
//! returns that we do not recognise lands in the catch-all arm and is
//! reported as `check_failed`, never as one of the known states.

use crate::deliverability::{DeliverabilityChecker, DeliverabilityOutcome};
use crate::{Result, ValidationError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// ZeroBounce connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroBounceConfig {
    /// API root, without the `/v2` path
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account API key; checks fail fast when it is missing
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.zerobounce.net".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ZeroBounceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Status values documented by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ProviderStatus {
    Valid,
    Invalid,
    #[serde(rename = "catch-all")]
    CatchAll,
    Unknown,
    Spamtrap,
    Abuse,
    DoNotMail,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    status: ProviderStatus,
    #[serde(default)]
    sub_status: Option<String>,
}

/// [`DeliverabilityChecker`] backed by the ZeroBounce HTTP API
pub struct ZeroBounceChecker {
    client: Client,
    config: ZeroBounceConfig,
}

impl ZeroBounceChecker {
    /// Create a checker with its own HTTP client.
    ///
    /// A missing API key is not an error here; each check then fails with
    /// `missing_api_key` so the service can still start.
    ///
    /// # Arguments
    /// * `config` - Endpoint, API key and request timeout
    ///
    /// # Returns
    /// * `Ok(ZeroBounceChecker)` - Ready to serve checks
    /// * `Err(ValidationError::Deliverability)` - The HTTP client could not be built
    pub fn new(config: ZeroBounceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ValidationError::Deliverability(format!("failed to build HTTP client: {}", e)))?;

        info!(
            "ZeroBounce checker initialized (base url: {}, api key configured: {})",
            config.base_url,
            config.api_key.as_deref().is_some_and(|k| !k.is_empty())
        );

        Ok(Self { client, config })
    }

    fn validate_url(&self, api_key: &str, email: &str) -> Option<Url> {
        let endpoint = format!("{}/v2/validate", self.config.base_url.trim_end_matches('/'));
        Url::parse_with_params(
            &endpoint,
            &[("api_key", api_key), ("email", email), ("ip_address", "")],
        )
        .map_err(|e| warn!("Invalid ZeroBounce endpoint {}: {}", endpoint, e))
        .ok()
    }
}

#[async_trait]
impl DeliverabilityChecker for ZeroBounceChecker {
    /// GET `/v2/validate` for one email.
    ///
    /// Transport errors and non-2xx replies map to `request_failed`, an
    /// undecodable body to `bad_response`.
    async fn check(&self, email: &str) -> DeliverabilityOutcome {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("ZeroBounce API key is not configured");
            return DeliverabilityOutcome::check_failed("missing_api_key");
        };
        let Some(url) = self.validate_url(api_key, email) else {
            return DeliverabilityOutcome::check_failed("request_failed");
        };

        let response = match self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => {
                warn!("ZeroBounce request failed: {}", e);
                return DeliverabilityOutcome::check_failed("request_failed");
            }
        };

        match response.json::<ValidateResponse>().await {
            Ok(body) => {
                debug!("ZeroBounce returned {:?}", body.status);
                map_response(body)
            }
            Err(e) => {
                warn!("Could not decode ZeroBounce response: {}", e);
                DeliverabilityOutcome::check_failed("bad_response")
            }
        }
    }
}

/// Collapse a provider status into the pipeline's four states.
///
/// Spamtrap, abuse and do-not-mail count as invalid, catch-all as unknown.
/// The provider's own sub-status wins over the default label.
fn map_response(body: ValidateResponse) -> DeliverabilityOutcome {
    let sub_status = body.sub_status.filter(|s| !s.trim().is_empty());
    match body.status {
        ProviderStatus::Valid => DeliverabilityOutcome::valid(),
        ProviderStatus::Invalid => DeliverabilityOutcome::invalid(sub_status),
        ProviderStatus::Spamtrap => {
            DeliverabilityOutcome::invalid(sub_status.or_else(|| Some("spamtrap".to_string())))
        }
        ProviderStatus::Abuse => {
            DeliverabilityOutcome::invalid(sub_status.or_else(|| Some("abuse".to_string())))
        }
        ProviderStatus::DoNotMail => {
            DeliverabilityOutcome::invalid(sub_status.or_else(|| Some("do_not_mail".to_string())))
        }
        ProviderStatus::CatchAll => {
            DeliverabilityOutcome::unknown(sub_status.or_else(|| Some("catch_all".to_string())))
        }
        ProviderStatus::Unknown => DeliverabilityOutcome::unknown(sub_status),
        ProviderStatus::Unrecognized => DeliverabilityOutcome::check_failed("unrecognized_status"),
    }
}

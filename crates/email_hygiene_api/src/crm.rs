//! CRM write-back for validated contacts
//!
//! After the webhook validates a contact's email, the verdict is pushed back
//! onto the contact record. Write-back is a side channel: its failures are
//! reported to the caller but never change the validation result.

use crate::config::CrmConfig;
use async_trait::async_trait;
use email_hygiene_core::ValidationResult;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("CRM rejected update for contact {contact_id} with status {status}")]
    Rejected { contact_id: String, status: u16 },
    #[error("Invalid contact id: {0:?}")]
    InvalidContactId(String),
}

#[async_trait]
pub trait ContactUpdater: Send + Sync + 'static {
    /// Push the validation verdict onto a contact.
    ///
    /// Returns `Ok(false)` when nothing was sent.
    async fn update_contact(
        &self,
        contact_id: &str,
        result: &ValidationResult,
    ) -> Result<bool, CrmError>;
}

/// Updates HubSpot contacts through the CRM v3 objects API
pub struct HubSpotContactUpdater {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HubSpotContactUpdater {
    pub fn new(config: &CrmConfig, access_token: String) -> Result<Self, CrmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!("HubSpot contact updater initialized ({})", config.base_url);
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

fn is_numeric_id(contact_id: &str) -> bool {
    !contact_id.is_empty() && contact_id.bytes().all(|b| b.is_ascii_digit())
}

/// Contact properties written for a validation result
pub fn contact_properties(result: &ValidationResult) -> serde_json::Value {
    let mut properties = json!({
        "email_validation_status": result.status.as_str(),
        "email_validation_sub_status": result.sub_status.clone().unwrap_or_default(),
        "email_recheck_needed": result.recheck_needed.to_string(),
        "email_validated_at": chrono::Utc::now().to_rfc3339(),
    });
    if result.was_corrected {
        properties["email"] = json!(result.current_email);
        properties["email_original"] = json!(result.original_email);
    }
    json!({ "properties": properties })
}

#[async_trait]
impl ContactUpdater for HubSpotContactUpdater {
    async fn update_contact(
        &self,
        contact_id: &str,
        result: &ValidationResult,
    ) -> Result<bool, CrmError> {
        // HubSpot record ids are numeric; anything else could escape the path
        if !is_numeric_id(contact_id) {
            warn!("Refusing CRM update for malformed contact id {:?}", contact_id);
            return Err(CrmError::InvalidContactId(contact_id.to_string()));
        }

        let url = format!("{}/crm/v3/objects/contacts/{}", self.base_url, contact_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(&contact_properties(result))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("HubSpot update for contact {} failed: {}", contact_id, status);
            return Err(CrmError::Rejected {
                contact_id: contact_id.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("HubSpot contact {} updated", contact_id);
        Ok(true)
    }
}

/// Used when no CRM token is configured
pub struct NoopContactUpdater;

#[async_trait]
impl ContactUpdater for NoopContactUpdater {
    async fn update_contact(
        &self,
        contact_id: &str,
        result: &ValidationResult,
    ) -> Result<bool, CrmError> {
        debug!(
            "CRM write-back disabled, skipping contact {} (status {})",
            contact_id, result.status
        );
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use email_hygiene_core::{CorrectionType, ValidationStatus};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn corrected_result() -> ValidationResult {
        ValidationResult {
            original_email: "jane@gmial.com".to_string(),
            current_email: "jane@gmail.com".to_string(),
            format_valid: true,
            was_corrected: true,
            correction_type: Some(CorrectionType::DomainTypo),
            is_known_valid: false,
            domain_valid: true,
            status: ValidationStatus::Unknown,
            sub_status: None,
            recheck_needed: true,
            validation_steps: Vec::new(),
            error: None,
        }
    }

    fn updater_for(server: &MockServer) -> HubSpotContactUpdater {
        let config = CrmConfig {
            base_url: server.uri(),
            access_token: None,
            timeout_secs: 5,
        };
        HubSpotContactUpdater::new(&config, "pat-token".to_string()).unwrap()
    }

    #[test]
    fn test_properties_include_correction() {
        let body = contact_properties(&corrected_result());
        assert_eq!(body["properties"]["email"], "jane@gmail.com");
        assert_eq!(body["properties"]["email_original"], "jane@gmial.com");
        assert_eq!(body["properties"]["email_validation_status"], "unknown");
        assert_eq!(body["properties"]["email_recheck_needed"], "true");
    }

    #[test]
    fn test_properties_leave_email_alone_when_uncorrected() {
        let mut result = corrected_result();
        result.was_corrected = false;
        result.correction_type = None;
        let body = contact_properties(&result);
        assert!(body["properties"].get("email").is_none());
    }

    #[tokio::test]
    async fn test_hubspot_update() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/crm/v3/objects/contacts/1234"))
            .and(header("authorization", "Bearer pat-token"))
            .and(body_partial_json(serde_json::json!({
                "properties": {"email": "jane@gmail.com", "email_validation_status": "unknown"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1234"})))
            .expect(1)
            .mount(&server)
            .await;

        let updated = updater_for(&server)
            .update_contact("1234", &corrected_result())
            .await
            .unwrap();
        assert!(updated);
    }

    #[tokio::test]
    async fn test_hubspot_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = updater_for(&server)
            .update_contact("5678", &corrected_result())
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_hubspot_refuses_path_traversal_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let updater = updater_for(&server);
        for contact_id in ["../companies/9", "12/../34", "12?archived=true", ""] {
            let err = updater
                .update_contact(contact_id, &corrected_result())
                .await
                .unwrap_err();
            assert!(matches!(err, CrmError::InvalidContactId(ref id) if id == contact_id));
        }
    }

    #[tokio::test]
    async fn test_noop_updater_sends_nothing() {
        let updated = NoopContactUpdater
            .update_contact("1234", &corrected_result())
            .await
            .unwrap();
        assert!(!updated);
    }
}

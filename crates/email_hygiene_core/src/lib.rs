//! # email_hygiene_core
//!
//! Email normalization and validation pipeline for B2B contact records.
//!
//! ## Features
//!
//! - **Format checking** against a conservative email grammar
//! - **Typo correction** from static domain and Australian TLD tables
//! - **Gmail alias stripping** (`john+promo@gmail.com` -> `john@gmail.com`)
//! - **Learned lookups** of valid domains and known-valid emails
//! - **Optional deliverability checks** through a third-party API
//! - **Sequential batch validation** with pacing between outbound checks
//!
//! ## Example
//!
//! ```rust,no_run
//! use email_hygiene_core::{ValidationConfig, ValidationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ValidationPipeline::builder(ValidationConfig::default())
//!         .build()
//!         .await?;
//!
//!     let result = pipeline.validate_email("john@gmial.com").await;
//!     println!("{} -> {:?}", result.current_email, result.status);
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod corrections;
pub mod deliverability;
pub mod format;
pub mod lookup;
pub mod privacy;
pub mod recorder;
pub mod validation_pipeline;

#[cfg(feature = "zerobounce")]
pub mod zerobounce;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Configuration for the email validation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Call the deliverability checker for emails not already known to be valid
    pub use_deliverability_check: bool,
    /// Strip `+tag` suffixes from gmail.com local parts
    pub remove_gmail_aliases: bool,
    /// Correct misspelled Australian TLD suffixes
    pub check_australian_tlds: bool,
    /// Upper bound for a single deliverability check, in milliseconds
    pub deliverability_timeout_ms: u64,
    /// Delay between successive batch entries when deliverability checks are on
    pub batch_pacing_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            use_deliverability_check: false,
            remove_gmail_aliases: false,
            check_australian_tlds: false,
            deliverability_timeout_ms: 10_000,
            batch_pacing_ms: 250,
        }
    }
}

/// Coarse outcome of a validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Unknown,
    CheckFailed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::Unknown => "unknown",
            ValidationStatus::CheckFailed => "check_failed",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which correction rule last altered an email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    Whitespace,
    DomainTypo,
    GmailAlias,
    Tld,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionType::Whitespace => "whitespace",
            CorrectionType::DomainTypo => "domain_typo",
            CorrectionType::GmailAlias => "gmail_alias",
            CorrectionType::Tld => "tld",
        }
    }
}

impl fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage named by a [`ValidationStep`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    FormatCheck,
    Correction,
    KnownValidCheck,
    DomainCheck,
    DeliverabilityCheck,
    DomainOnlyDecision,
}

/// One entry of the audit trail attached to every result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStep {
    pub step: StepKind,
    pub passed: bool,
    pub detail: Option<String>,
}

impl ValidationStep {
    pub fn new(step: StepKind, passed: bool, detail: impl Into<Option<String>>) -> Self {
        Self {
            step,
            passed,
            detail: detail.into(),
        }
    }
}

/// Complete validation result for one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The input, exactly as received
    pub original_email: String,
    /// Final normalized form
    pub current_email: String,
    pub format_valid: bool,
    pub was_corrected: bool,
    /// `None` when no correction rule fired
    pub correction_type: Option<CorrectionType>,
    pub is_known_valid: bool,
    pub domain_valid: bool,
    pub status: ValidationStatus,
    pub sub_status: Option<String>,
    /// The result is provisional and should be validated again later
    pub recheck_needed: bool,
    /// Ordered audit trail, one entry per executed step
    pub validation_steps: Vec<ValidationStep>,
    /// Set only on failure records produced by the batch runner
    pub error: Option<String>,
}

impl ValidationResult {
    /// Minimal record standing in for a batch entry whose validation blew up
    pub fn failure(original_email: &str, error: impl Into<String>) -> Self {
        Self {
            original_email: original_email.to_string(),
            current_email: original_email.to_string(),
            format_valid: false,
            was_corrected: false,
            correction_type: None,
            is_known_valid: false,
            domain_valid: false,
            status: ValidationStatus::CheckFailed,
            sub_status: Some("internal_error".to_string()),
            recheck_needed: true,
            validation_steps: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Errors that can occur while building or feeding the pipeline
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Lookup storage failed: {0}")]
    Storage(String),
    #[error("Deliverability check failed: {0}")]
    Deliverability(String),
    #[error("Correction recording failed: {0}")]
    Recording(String),
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

// Re-export main types
pub use corrections::{CorrectionOutcome, DomainCorrector};
pub use deliverability::{DeliverabilityChecker, DeliverabilityOutcome};
pub use lookup::{LookupBackend, LookupStore};
pub use recorder::{CorrectionEvent, CorrectionRecorder};
pub use validation_pipeline::{PipelineStats, ValidationPipeline};
pub use ValidationConfig as Config;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert!(!config.use_deliverability_check);
        assert!(!config.remove_gmail_aliases);
        assert!(!config.check_australian_tlds);
        assert_eq!(config.deliverability_timeout_ms, 10_000);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ValidationStatus::CheckFailed).unwrap();
        assert_eq!(json, "\"check_failed\"");
        assert_eq!(ValidationStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_correction_type_labels() {
        assert_eq!(CorrectionType::DomainTypo.as_str(), "domain_typo");
        assert_eq!(CorrectionType::GmailAlias.to_string(), "gmail_alias");
        let json = serde_json::to_string(&Some(CorrectionType::Tld)).unwrap();
        assert_eq!(json, "\"tld\"");
        let none: Option<CorrectionType> = None;
        assert_eq!(serde_json::to_string(&none).unwrap(), "null");
    }

    #[test]
    fn test_failure_record() {
        let result = ValidationResult::failure("a@b.com", "boom");
        assert_eq!(result.status, ValidationStatus::CheckFailed);
        assert!(result.recheck_needed);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.validation_steps.is_empty());
    }
}

//! Main validation pipeline orchestrating every email check
//!
//! Steps run in a fixed order and each one appends a record to the result's
//! audit trail:
//!
//! 1. format check (failure is terminal)
//! 2. correction (always runs, only rewrites the email)
//! 3. known-valid lookup (a hit is terminal)
//! 4. domain lookup (always runs)
//! 5. deliverability check, or the domain-only decision when checks are off
//!
//! Collaborator failures never escape: recorder and persistence errors are
//! logged, checker failures and timeouts become `check_failed`.

use crate::corrections::DomainCorrector;
use crate::deliverability::{DeliverabilityChecker, DeliverabilityOutcome};
use crate::format::{is_valid_format, strip_whitespace};
use crate::lookup::{LookupBackend, LookupStore, MemoryLookupBackend};
use crate::privacy::PrivacyProcessor;
use crate::recorder::{CorrectionEvent, CorrectionRecorder, NoopCorrectionRecorder};
use crate::{
    CorrectionType, Result, StepKind, ValidationConfig, ValidationError, ValidationResult,
    ValidationStatus, ValidationStep,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Source tag stored alongside emails confirmed by the deliverability checker
pub const DELIVERABILITY_SOURCE: &str = "deliverability_check";

/// Builder wiring the pipeline to its collaborators
pub struct ValidationPipelineBuilder {
    config: ValidationConfig,
    corrector: Option<DomainCorrector>,
    lookup_backend: Option<Arc<dyn LookupBackend>>,
    recorder: Option<Arc<dyn CorrectionRecorder>>,
    checker: Option<Arc<dyn DeliverabilityChecker>>,
    privacy: Option<PrivacyProcessor>,
}

impl ValidationPipelineBuilder {
    pub fn corrector(mut self, corrector: DomainCorrector) -> Self {
        self.corrector = Some(corrector);
        self
    }

    pub fn lookup_backend(mut self, backend: Arc<dyn LookupBackend>) -> Self {
        self.lookup_backend = Some(backend);
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn CorrectionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn checker(mut self, checker: Arc<dyn DeliverabilityChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn privacy(mut self, privacy: PrivacyProcessor) -> Self {
        self.privacy = Some(privacy);
        self
    }

    /// Load the lookup store and assemble the pipeline
    ///
    /// # Returns
    /// * `Ok(ValidationPipeline)` on success
    /// * `Err(ValidationError)` if the configuration is inconsistent or the
    ///   lookup backend cannot be read
    pub async fn build(self) -> Result<ValidationPipeline> {
        info!("Initializing validation pipeline");

        if self.config.use_deliverability_check && self.checker.is_none() {
            return Err(ValidationError::Configuration(
                "deliverability checks are enabled but no checker is configured".to_string(),
            ));
        }
        if self.config.deliverability_timeout_ms == 0 {
            return Err(ValidationError::Configuration(
                "deliverability_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let backend = self
            .lookup_backend
            .unwrap_or_else(|| Arc::new(MemoryLookupBackend::new()));
        let lookup = LookupStore::load(backend).await?;

        info!(
            "Validation pipeline initialized (deliverability: {}, gmail aliases: {}, au tlds: {})",
            self.config.use_deliverability_check,
            self.config.remove_gmail_aliases,
            self.config.check_australian_tlds
        );

        Ok(ValidationPipeline {
            config: self.config,
            corrector: self.corrector.unwrap_or_default(),
            lookup,
            recorder: self
                .recorder
                .unwrap_or_else(|| Arc::new(NoopCorrectionRecorder)),
            checker: self.checker,
            privacy: self
                .privacy
                .unwrap_or_else(PrivacyProcessor::with_random_salt),
            validations_total: AtomicU64::new(0),
            corrections_total: AtomicU64::new(0),
            deliverability_checks_total: AtomicU64::new(0),
        })
    }
}

/// Main validation pipeline coordinating all email checks
pub struct ValidationPipeline {
    config: ValidationConfig,
    corrector: DomainCorrector,
    lookup: LookupStore,
    recorder: Arc<dyn CorrectionRecorder>,
    checker: Option<Arc<dyn DeliverabilityChecker>>,
    privacy: PrivacyProcessor,
    validations_total: AtomicU64,
    corrections_total: AtomicU64,
    deliverability_checks_total: AtomicU64,
}

impl ValidationPipeline {
    pub fn builder(config: ValidationConfig) -> ValidationPipelineBuilder {
        ValidationPipelineBuilder {
            config,
            corrector: None,
            lookup_backend: None,
            recorder: None,
            checker: None,
            privacy: None,
        }
    }

    /// Create a pipeline with in-memory lookups and no recorder or checker
    pub async fn new(config: ValidationConfig) -> Result<Self> {
        Self::builder(config).build().await
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn lookup(&self) -> &LookupStore {
        &self.lookup
    }

    /// Validate a single email through the complete pipeline.
    ///
    /// Always returns a structurally complete result; malformed input is
    /// reported as `invalid`/`bad_format`, never as an error.
    #[instrument(skip(self, email), fields(email = %self.privacy.mask_email(email)))]
    pub async fn validate_email(&self, email: &str) -> ValidationResult {
        self.validations_total.fetch_add(1, Ordering::Relaxed);
        let mut steps = Vec::with_capacity(5);

        // Step 1: format check
        if !is_valid_format(&strip_whitespace(email)) {
            debug!("Email failed format check");
            steps.push(ValidationStep::new(
                StepKind::FormatCheck,
                false,
                Some("bad_format".to_string()),
            ));
            return ValidationResult {
                original_email: email.to_string(),
                current_email: email.to_string(),
                format_valid: false,
                was_corrected: false,
                correction_type: None,
                is_known_valid: false,
                domain_valid: false,
                status: ValidationStatus::Invalid,
                sub_status: Some("bad_format".to_string()),
                recheck_needed: false,
                validation_steps: steps,
                error: None,
            };
        }
        steps.push(ValidationStep::new(StepKind::FormatCheck, true, None));

        // Step 2: typo / alias / TLD correction
        let correction = self.corrector.correct(email, &self.config);
        let current_email = correction.corrected_email.clone();
        match correction.correction_type {
            Some(kind) => {
                let applied: Vec<&str> = correction.applied.iter().map(|c| c.as_str()).collect();
                debug!("Email corrected ({})", applied.join(", "));
                steps.push(ValidationStep::new(
                    StepKind::Correction,
                    true,
                    Some(format!("{} (applied: {})", kind, applied.join(", "))),
                ));
                self.record_correction(email, &current_email, kind).await;
            }
            None => {
                steps.push(ValidationStep::new(
                    StepKind::Correction,
                    true,
                    Some("no correction needed".to_string()),
                ));
            }
        }

        let mut result = ValidationResult {
            original_email: email.to_string(),
            current_email,
            format_valid: true,
            was_corrected: correction.was_corrected(),
            correction_type: correction.correction_type,
            is_known_valid: false,
            domain_valid: false,
            status: ValidationStatus::Unknown,
            sub_status: None,
            recheck_needed: true,
            validation_steps: Vec::new(),
            error: None,
        };

        // Step 3: known-valid lookup
        if self.lookup.contains_email(&result.current_email).await {
            debug!("Email is already known to be valid");
            steps.push(ValidationStep::new(
                StepKind::KnownValidCheck,
                true,
                Some("known valid email".to_string()),
            ));
            result.is_known_valid = true;
            result.status = ValidationStatus::Valid;
            result.recheck_needed = false;
            result.validation_steps = steps;
            return result;
        }
        steps.push(ValidationStep::new(StepKind::KnownValidCheck, false, None));

        // Step 4: domain lookup
        result.domain_valid = self.lookup.contains_email_domain(&result.current_email).await;
        steps.push(ValidationStep::new(
            StepKind::DomainCheck,
            result.domain_valid,
            Some(if result.domain_valid {
                "domain recognized".to_string()
            } else {
                "domain not recognized".to_string()
            }),
        ));

        // Step 5: deliverability decision
        if self.config.use_deliverability_check {
            let outcome = self.check_deliverability(&result.current_email).await;
            steps.push(ValidationStep::new(
                StepKind::DeliverabilityCheck,
                outcome.status == ValidationStatus::Valid,
                Some(match &outcome.sub_status {
                    Some(sub) => format!("{} ({})", outcome.status, sub),
                    None => outcome.status.to_string(),
                }),
            ));

            if outcome.status == ValidationStatus::Valid {
                self.lookup
                    .add_valid_email(&result.current_email, DELIVERABILITY_SOURCE)
                    .await;
            }

            result.status = outcome.status;
            result.sub_status = outcome.sub_status;
            result.recheck_needed = outcome.recheck_needed;
        } else {
            let (status, sub_status) = if result.domain_valid {
                (ValidationStatus::Unknown, None)
            } else {
                (
                    ValidationStatus::Invalid,
                    Some("domain_not_recognized".to_string()),
                )
            };
            steps.push(ValidationStep::new(
                StepKind::DomainOnlyDecision,
                result.domain_valid,
                Some(status.to_string()),
            ));
            result.status = status;
            result.sub_status = sub_status;
            result.recheck_needed = result.domain_valid;
        }

        debug!(
            "Email validation complete: status={}, recheck_needed={}",
            result.status, result.recheck_needed
        );
        result.validation_steps = steps;
        result
    }

    async fn check_deliverability(&self, email: &str) -> DeliverabilityOutcome {
        let Some(checker) = &self.checker else {
            warn!("Deliverability check requested without a checker");
            return DeliverabilityOutcome::check_failed("checker_not_configured");
        };

        self.deliverability_checks_total
            .fetch_add(1, Ordering::Relaxed);
        let timeout = Duration::from_millis(self.config.deliverability_timeout_ms);
        let call = AssertUnwindSafe(tokio::time::timeout(timeout, checker.check(email)));
        match call.catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                warn!("Deliverability check timed out after {:?}", timeout);
                DeliverabilityOutcome::check_failed("timeout")
            }
            Err(_) => {
                error!("Deliverability checker panicked");
                DeliverabilityOutcome::check_failed("checker_panicked")
            }
        }
    }

    async fn record_correction(&self, original: &str, corrected: &str, kind: CorrectionType) {
        self.corrections_total.fetch_add(1, Ordering::Relaxed);
        let event = CorrectionEvent::new(original, corrected, kind);
        if let Err(e) = self.recorder.record(&event).await {
            warn!("Failed to record {} correction: {}", kind, e);
        }
    }

    /// Get pipeline statistics for monitoring
    pub async fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            valid_domains_count: self.lookup.domain_count().await,
            known_valid_emails_count: self.lookup.email_count().await,
            domain_typo_rules: self.corrector.domain_rule_count(),
            tld_rules: self.corrector.tld_rule_count(),
            validations_total: self.validations_total.load(Ordering::Relaxed),
            corrections_total: self.corrections_total.load(Ordering::Relaxed),
            deliverability_checks_total: self.deliverability_checks_total.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about the validation pipeline
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStats {
    pub valid_domains_count: usize,
    pub known_valid_emails_count: usize,
    pub domain_typo_rules: usize,
    pub tld_rules: usize,
    pub validations_total: u64,
    pub corrections_total: u64,
    pub deliverability_checks_total: u64,
}

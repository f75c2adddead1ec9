//! Deliverability checker contract
//!
//! The pipeline hands a corrected email to a [`DeliverabilityChecker`] and
//! adopts the returned [`DeliverabilityOutcome`] verbatim. The trait method
//! is infallible: implementations translate every failure into
//! [`ValidationStatus::CheckFailed`] themselves.

use crate::ValidationStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Coarse verdict from an external verification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverabilityOutcome {
    pub status: ValidationStatus,
    pub sub_status: Option<String>,
    pub recheck_needed: bool,
}

impl DeliverabilityOutcome {
    /// Confirmed deliverable, no recheck
    pub fn valid() -> Self {
        Self::with_status(ValidationStatus::Valid, None)
    }

    pub fn invalid(sub_status: Option<String>) -> Self {
        Self::with_status(ValidationStatus::Invalid, sub_status)
    }

    pub fn unknown(sub_status: Option<String>) -> Self {
        Self::with_status(ValidationStatus::Unknown, sub_status)
    }

    /// The check could not be completed. `reason` becomes the sub-status.
    pub fn check_failed(reason: impl Into<String>) -> Self {
        Self::with_status(ValidationStatus::CheckFailed, Some(reason.into()))
    }

    /// recheck_needed follows from the status: only unknown and check_failed are provisional
    pub fn with_status(status: ValidationStatus, sub_status: Option<String>) -> Self {
        let recheck_needed = matches!(
            status,
            ValidationStatus::Unknown | ValidationStatus::CheckFailed
        );
        Self {
            status,
            sub_status,
            recheck_needed,
        }
    }
}

/// External per-email verification service
#[async_trait]
pub trait DeliverabilityChecker: Send + Sync + 'static {
    /// Check a single, already corrected email.
    ///
    /// Implementations never return an error. Network failures, bad
    /// responses and missing credentials all come back as
    /// [`DeliverabilityOutcome::check_failed`] with a reason.
    ///
    /// # Arguments
    /// * `email` - Normalized email that passed format and domain checks
    ///
    /// # Returns
    /// * The provider verdict with `recheck_needed` already derived
    async fn check(&self, email: &str) -> DeliverabilityOutcome;
}

/// Checker returning a fixed outcome, counting how often it was asked
pub struct StaticChecker {
    outcome: DeliverabilityOutcome,
    calls: AtomicUsize,
}

impl StaticChecker {
    pub fn new(outcome: DeliverabilityOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `check` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliverabilityChecker for StaticChecker {
    async fn check(&self, _email: &str) -> DeliverabilityOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

//! Sequential batch validation
//!
//! Entries are validated one after another, never concurrently, so the
//! outbound deliverability API sees a bounded request rate. A failure on one
//! entry is converted into a failure record and the batch carries on.

use crate::validation_pipeline::ValidationPipeline;
use crate::{StepKind, ValidationResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, instrument};

impl ValidationPipeline {
    /// Validate `emails` in order, returning exactly one result per input.
    ///
    /// When deliverability checks are enabled the runner waits
    /// `batch_pacing_ms` after every entry that reached the checker, so two
    /// checker calls are never closer together than the pacing delay. Entries
    /// settled earlier (bad format, known-valid) add no delay.
    ///
    /// # Arguments
    /// * `emails` - Raw input emails, validated strictly one after another
    ///
    /// # Returns
    /// * One `ValidationResult` per input, in input order. An entry whose
    ///   validation panicked is replaced by [`ValidationResult::failure`].
    #[instrument(skip_all, fields(batch_size = emails.len()))]
    pub async fn validate_batch(&self, emails: &[String]) -> Vec<ValidationResult> {
        let pacing = self
            .config()
            .use_deliverability_check
            .then(|| Duration::from_millis(self.config().batch_pacing_ms))
            .filter(|d| !d.is_zero());

        let mut results: Vec<ValidationResult> = Vec::with_capacity(emails.len());
        for (index, email) in emails.iter().enumerate() {
            if let (Some(delay), Some(previous)) = (pacing, results.last()) {
                if reached_checker(previous) {
                    tokio::time::sleep(delay).await;
                }
            }

            let result = match AssertUnwindSafe(self.validate_email(email))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("Validation of batch entry {} failed: {}", index, message);
                    ValidationResult::failure(email, message)
                }
            };
            results.push(result);
        }

        info!("Batch validation complete: {} entries", results.len());
        results
    }
}

fn reached_checker(result: &ValidationResult) -> bool {
    result
        .validation_steps
        .iter()
        .any(|step| step.step == StepKind::DeliverabilityCheck)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "validation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::deliverability::{DeliverabilityChecker, DeliverabilityOutcome, StaticChecker};
    use crate::lookup::MemoryLookupBackend;
    use crate::{ValidationConfig, ValidationPipeline, ValidationStatus};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    /// Blows up on one specific email, passes everything else
    struct TrippingChecker {
        trip_on: &'static str,
    }

    #[async_trait]
    impl DeliverabilityChecker for TrippingChecker {
        async fn check(&self, email: &str) -> DeliverabilityOutcome {
            if email == self.trip_on {
                panic!("checker exploded");
            }
            DeliverabilityOutcome::valid()
        }
    }

    fn emails(items: &[&str]) -> Vec<String> {
        items.iter().map(|e| e.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let pipeline = ValidationPipeline::builder(ValidationConfig::default())
            .build()
            .await
            .unwrap();

        let results = pipeline
            .validate_batch(&emails(&["a@gmail.com", "bad-email", "c@gmail.com"]))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].original_email, "a@gmail.com");
        assert_eq!(results[1].original_email, "bad-email");
        assert_eq!(results[2].original_email, "c@gmail.com");
        assert_eq!(results[1].status, ValidationStatus::Invalid);
        assert_eq!(results[1].sub_status.as_deref(), Some("bad_format"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pipeline = ValidationPipeline::builder(ValidationConfig::default())
            .build()
            .await
            .unwrap();
        assert!(pipeline.validate_batch(&[]).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_entry_does_not_abort_batch() {
        let pipeline = ValidationPipeline::builder(ValidationConfig {
            use_deliverability_check: true,
            ..ValidationConfig::default()
        })
        .checker(Arc::new(TrippingChecker {
            trip_on: "boom@acme.com",
        }))
        .build()
        .await
        .unwrap();

        let results = pipeline
            .validate_batch(&emails(&["ok@acme.com", "boom@acme.com", "fine@acme.com"]))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ValidationStatus::Valid);
        assert_eq!(results[1].status, ValidationStatus::CheckFailed);
        assert_eq!(results[1].original_email, "boom@acme.com");
        assert_eq!(results[1].error.as_deref(), Some("checker exploded"));
        assert!(results[1].recheck_needed);
        assert_eq!(results[2].status, ValidationStatus::Valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_entries_when_checks_enabled() {
        let checker = Arc::new(StaticChecker::new(DeliverabilityOutcome::unknown(None)));
        let pipeline = ValidationPipeline::builder(ValidationConfig {
            use_deliverability_check: true,
            batch_pacing_ms: 250,
            ..ValidationConfig::default()
        })
        .checker(checker.clone())
        .build()
        .await
        .unwrap();

        let started = tokio::time::Instant::now();
        pipeline
            .validate_batch(&emails(&["a@acme.com", "b@acme.com", "c@acme.com"]))
            .await;

        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(checker.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_skips_entries_settled_before_the_checker() {
        let checker = Arc::new(StaticChecker::new(DeliverabilityOutcome::unknown(None)));
        let pipeline = ValidationPipeline::builder(ValidationConfig {
            use_deliverability_check: true,
            batch_pacing_ms: 250,
            ..ValidationConfig::default()
        })
        .lookup_backend(Arc::new(
            MemoryLookupBackend::new().with_emails(["known@acme.com"]),
        ))
        .checker(checker.clone())
        .build()
        .await
        .unwrap();

        let started = tokio::time::Instant::now();
        let results = pipeline
            .validate_batch(&emails(&[
                "a@acme.com",
                "bad-email",
                "known@acme.com",
                "d@acme.com",
                "e@acme.com",
            ]))
            .await;

        // Pauses follow "a" and "d", the entries that called the checker
        // and were followed by another entry
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(checker.calls(), 3);
        assert_eq!(results[1].status, ValidationStatus::Invalid);
        assert!(results[2].is_known_valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pacing_when_checks_disabled() {
        let pipeline = ValidationPipeline::builder(ValidationConfig::default())
            .build()
            .await
            .unwrap();

        let started = tokio::time::Instant::now();
        pipeline
            .validate_batch(&emails(&["a@acme.com", "b@acme.com", "c@acme.com"]))
            .await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}

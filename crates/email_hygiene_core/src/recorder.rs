//! Recording of applied corrections
//!
//! Every time the pipeline rewrites an email it reports the event to a
//! [`CorrectionRecorder`]. Recording is best-effort; the pipeline logs and
//! drops recorder errors.

use crate::{CorrectionType, Result, ValidationError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const CORRECTIONS_FILE: &str = "corrections.jsonl";

/// A single applied correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionEvent {
    pub original: String,
    pub corrected: String,
    pub kind: CorrectionType,
    pub recorded_at: DateTime<Utc>,
}

impl CorrectionEvent {
    pub fn new(original: &str, corrected: &str, kind: CorrectionType) -> Self {
        Self {
            original: original.to_string(),
            corrected: corrected.to_string(),
            kind,
            recorded_at: Utc::now(),
        }
    }
}

/// Collaborator that stores correction events
#[async_trait]
pub trait CorrectionRecorder: Send + Sync + 'static {
    /// Store one event.
    ///
    /// # Arguments
    /// * `event` - The applied correction, original and corrected forms included
    ///
    /// # Returns
    /// * `Ok(())` - Event stored
    /// * `Err(ValidationError::Recording)` - Storage failed; callers log and carry on
    async fn record(&self, event: &CorrectionEvent) -> Result<()>;
}

/// Appends one JSON object per line to `corrections.jsonl`
pub struct JsonlCorrectionRecorder {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlCorrectionRecorder {
    /// Create a recorder writing to `corrections.jsonl` inside `data_dir`.
    ///
    /// Nothing touches the disk until the first event; the directory is
    /// created on demand.
    ///
    /// # Arguments
    /// * `data_dir` - Directory holding the correction log
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(CORRECTIONS_FILE),
            write_lock: Mutex::new(()),
        }
    }
}

impl JsonlCorrectionRecorder {
    /// Path of the correction log
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, event: &CorrectionEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event).context("failed to encode correction")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush().await.context("failed to flush corrections log")?;
        Ok(())
    }
}

#[async_trait]
impl CorrectionRecorder for JsonlCorrectionRecorder {
    async fn record(&self, event: &CorrectionEvent) -> Result<()> {
        self.append(event)
            .await
            .map_err(|e| ValidationError::Recording(format!("{:#}", e)))
    }
}

/// Keeps events in memory
#[derive(Default)]
pub struct MemoryCorrectionRecorder {
    events: Mutex<Vec<CorrectionEvent>>,
}

impl MemoryCorrectionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<CorrectionEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl CorrectionRecorder for MemoryCorrectionRecorder {
    async fn record(&self, event: &CorrectionEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Discards every event
pub struct NoopCorrectionRecorder;

#[async_trait]
impl CorrectionRecorder for NoopCorrectionRecorder {
    async fn record(&self, _event: &CorrectionEvent) -> Result<()> {
        Ok(())
    }
}

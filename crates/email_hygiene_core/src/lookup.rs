//! Learned lookup sets: valid domains and known-valid emails
//!
//! The in-memory sets are owned by [`LookupStore`] and guarded by async
//! read/write locks so overlapping requests can share one store. Both sets
//! only ever grow. Persistence goes through a [`LookupBackend`] and is
//! best-effort: a failed write is logged, never surfaced to the caller.

use crate::format::extract_domain;
use crate::{Result, ValidationError};
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Domains trusted without a per-email deliverability check
pub const SEED_DOMAINS: [&str; 6] = [
    "gmail.com",
    "outlook.com",
    "hotmail.com",
    "yahoo.com",
    "icloud.com",
    "aol.com",
];

pub const VALID_DOMAINS_FILE: &str = "valid_domains.txt";
pub const KNOWN_VALID_EMAILS_FILE: &str = "known_valid_emails.txt";

/// Persistence collaborator behind the lookup sets
#[async_trait]
pub trait LookupBackend: Send + Sync + 'static {
    /// Load every persisted valid domain
    async fn load_valid_domains(&self) -> Result<Vec<String>>;

    /// Load every persisted known-valid email
    async fn load_known_valid_emails(&self) -> Result<Vec<String>>;

    /// Persist a newly confirmed email together with where the confirmation came from
    async fn persist_valid_email(&self, email: &str, source: &str) -> Result<()>;
}

/// In-memory lookup sets backed by a persistence collaborator
pub struct LookupStore {
    backend: Arc<dyn LookupBackend>,
    valid_domains: RwLock<HashSet<String>>,
    known_valid_emails: RwLock<HashSet<String>>,
}

impl LookupStore {
    /// Build the store from the seed domains plus everything the backend holds.
    ///
    /// Entries are trimmed and lower-cased; blank lines are skipped.
    ///
    /// # Arguments
    /// * `backend` - Persistence collaborator; it is kept for later writes
    ///
    /// # Returns
    /// * `Ok(LookupStore)` - Seed domains unioned with the persisted sets
    /// * `Err(ValidationError)` - The backend could not be read
    pub async fn load(backend: Arc<dyn LookupBackend>) -> Result<Self> {
        let mut valid_domains: HashSet<String> =
            SEED_DOMAINS.iter().map(|d| d.to_string()).collect();
        valid_domains.extend(
            backend
                .load_valid_domains()
                .await?
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty()),
        );

        let known_valid_emails: HashSet<String> = backend
            .load_known_valid_emails()
            .await?
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        info!(
            "Lookup store loaded with {} valid domains and {} known-valid emails",
            valid_domains.len(),
            known_valid_emails.len()
        );

        Ok(Self {
            backend,
            valid_domains: RwLock::new(valid_domains),
            known_valid_emails: RwLock::new(known_valid_emails),
        })
    }

    /// Case-insensitive membership test for a domain
    pub async fn contains_domain(&self, domain: &str) -> bool {
        self.valid_domains
            .read()
            .await
            .contains(&domain.to_lowercase())
    }

    /// Case-insensitive membership test for a full email
    pub async fn contains_email(&self, email: &str) -> bool {
        self.known_valid_emails
            .read()
            .await
            .contains(&email.to_lowercase())
    }

    /// Whether the domain part of `email` is a valid domain.
    ///
    /// Input without exactly one `@` is reported as not valid.
    pub async fn contains_email_domain(&self, email: &str) -> bool {
        match extract_domain(email) {
            Some(domain) => self.contains_domain(&domain).await,
            None => false,
        }
    }

    /// Record a confirmed email in memory and persist it.
    ///
    /// Returns whether the email was new. Persistence failures are logged
    /// and otherwise ignored.
    pub async fn add_valid_email(&self, email: &str, source: &str) -> bool {
        let email = email.to_lowercase();
        let inserted = self.known_valid_emails.write().await.insert(email.clone());
        if !inserted {
            debug!("Email already known to be valid, nothing to persist");
            return false;
        }

        if let Err(e) = self.backend.persist_valid_email(&email, source).await {
            warn!("Failed to persist known-valid email (source: {}): {}", source, e);
        }
        true
    }

    /// Get the number of valid domains
    pub async fn domain_count(&self) -> usize {
        self.valid_domains.read().await.len()
    }

    /// Get the number of known-valid emails
    pub async fn email_count(&self) -> usize {
        self.known_valid_emails.read().await.len()
    }
}

/// Flat-file backend: one entry per line in a data directory
pub struct FileLookupBackend {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLookupBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn read_list(&self, file_name: &str) -> Result<Vec<String>> {
        let path = self.data_dir.join(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(parse_lookup_list(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Lookup list {} does not exist yet", path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(ValidationError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn append_email(&self, email: &str, source: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.data_dir.join(KNOWN_VALID_EMAILS_FILE);
        let line = format!("{} # {} {}\n", email, source, chrono::Utc::now().to_rfc3339());

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", path.display()))?;
        file.flush().await.context("failed to flush lookup list")?;
        Ok(())
    }
}

#[async_trait]
impl LookupBackend for FileLookupBackend {
    async fn load_valid_domains(&self) -> Result<Vec<String>> {
        self.read_list(VALID_DOMAINS_FILE).await
    }

    async fn load_known_valid_emails(&self) -> Result<Vec<String>> {
        self.read_list(KNOWN_VALID_EMAILS_FILE).await
    }

    async fn persist_valid_email(&self, email: &str, source: &str) -> Result<()> {
        self.append_email(email, source)
            .await
            .map_err(|e| ValidationError::Storage(format!("{:#}", e)))
    }
}

/// In-process backend, used in tests and when no data directory is configured
#[derive(Default)]
pub struct MemoryLookupBackend {
    domains: Vec<String>,
    emails: Vec<String>,
    persisted: Mutex<Vec<(String, String)>>,
    fail_persist: bool,
}

impl MemoryLookupBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails.extend(emails.into_iter().map(Into::into));
        self
    }

    /// Make every persist call fail
    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    /// `(email, source)` pairs persisted so far
    pub async fn persisted(&self) -> Vec<(String, String)> {
        self.persisted.lock().await.clone()
    }
}

#[async_trait]
impl LookupBackend for MemoryLookupBackend {
    async fn load_valid_domains(&self) -> Result<Vec<String>> {
        Ok(self.domains.clone())
    }

    async fn load_known_valid_emails(&self) -> Result<Vec<String>> {
        Ok(self.emails.clone())
    }

    async fn persist_valid_email(&self, email: &str, source: &str) -> Result<()> {
        if self.fail_persist {
            return Err(ValidationError::Storage("persistence disabled".to_string()));
        }
        self.persisted
            .lock()
            .await
            .push((email.to_string(), source.to_string()));
        Ok(())
    }
}

/// Parse a lookup list: one entry per line, `#` starts a comment
fn parse_lookup_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for line in content.lines() {
        let entry = line.split('#').next().unwrap_or_default().trim();
        if entry.is_empty() {
            continue;
        }
        let entry = entry.to_lowercase();
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    debug!("Parsed {} lookup entries", entries.len());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn store_with(backend: MemoryLookupBackend) -> (LookupStore, Arc<MemoryLookupBackend>) {
        let backend = Arc::new(backend);
        let store = LookupStore::load(backend.clone()).await.unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn test_seed_domains_always_present() {
        let (store, _) = store_with(MemoryLookupBackend::new()).await;
        for domain in SEED_DOMAINS {
            assert!(store.contains_domain(domain).await);
        }
        assert_eq!(store.domain_count().await, SEED_DOMAINS.len());
        assert_eq!(store.email_count().await, 0);
    }

    #[tokio::test]
    async fn test_loaded_entries_are_lowercased() {
        let backend = MemoryLookupBackend::new()
            .with_domains(["AcmeCorp.COM.au"])
            .with_emails(["Jane@AcmeCorp.com.au"]);
        let (store, _) = store_with(backend).await;

        assert!(store.contains_domain("acmecorp.com.au").await);
        assert!(store.contains_domain("ACMECORP.COM.AU").await);
        assert!(store.contains_email("jane@acmecorp.com.au").await);
        assert!(store.contains_email("JANE@ACMECORP.COM.AU").await);
    }

    #[tokio::test]
    async fn test_contains_email_domain() {
        let (store, _) = store_with(MemoryLookupBackend::new()).await;
        assert!(store.contains_email_domain("x@Gmail.com").await);
        assert!(!store.contains_email_domain("x@unknown.zzz").await);
        assert!(!store.contains_email_domain("no-at-sign").await);
        assert!(!store.contains_email_domain("a@b@gmail.com").await);
    }

    #[tokio::test]
    async fn test_add_valid_email_persists_once() {
        let (store, backend) = store_with(MemoryLookupBackend::new()).await;

        assert!(store.add_valid_email("New@Example.com", "deliverability_check").await);
        assert!(!store.add_valid_email("new@example.com", "deliverability_check").await);

        assert!(store.contains_email("new@example.com").await);
        assert_eq!(
            backend.persisted().await,
            vec![("new@example.com".to_string(), "deliverability_check".to_string())]
        );
    }

    #[tokio::test]
    async fn test_persist_failure_is_not_fatal() {
        let (store, _) = store_with(MemoryLookupBackend::new().failing_persist()).await;
        assert!(store.add_valid_email("a@example.com", "manual").await);
        assert!(store.contains_email("a@example.com").await);
    }

    #[test]
    fn test_parse_lookup_list() {
        let content = r#"
# Company domains
AcmeCorp.com.au
globex.com   # added by import

acmecorp.com.au
"#;
        assert_eq!(
            parse_lookup_list(content),
            vec!["acmecorp.com.au".to_string(), "globex.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VALID_DOMAINS_FILE), "globex.com\n# comment\n").unwrap();

        let backend = Arc::new(FileLookupBackend::new(dir.path()));
        let store = LookupStore::load(backend.clone()).await.unwrap();
        assert!(store.contains_domain("globex.com").await);
        assert!(!store.contains_email("hank@globex.com").await);

        store.add_valid_email("hank@globex.com", "deliverability_check").await;

        let reloaded = LookupStore::load(backend).await.unwrap();
        assert!(reloaded.contains_email("hank@globex.com").await);

        let raw = std::fs::read_to_string(dir.path().join(KNOWN_VALID_EMAILS_FILE)).unwrap();
        assert!(raw.starts_with("hank@globex.com # deliverability_check "));
    }

    #[tokio::test]
    async fn test_file_backend_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileLookupBackend::new(dir.path().join("not-created-yet"));
        assert!(backend.load_valid_domains().await.unwrap().is_empty());
        assert!(backend.load_known_valid_emails().await.unwrap().is_empty());
    }
}

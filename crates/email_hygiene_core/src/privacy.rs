//! Log-safe email masking
//!
//! Contact emails are personal data. Anything the pipeline logs goes through
//! [`PrivacyProcessor::mask_email`], which replaces the local part with a
//! short salted SHA-256 digest and keeps the domain readable.

use crate::format::split_email;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Number of hex characters kept from the digest
const MASK_LEN: usize = 8;

/// Salted hasher used to pseudonymize emails before logging
pub struct PrivacyProcessor {
    salt: Vec<u8>,
}

impl PrivacyProcessor {
    pub fn new(salt: Vec<u8>) -> Self {
        debug!("Privacy processor initialized with {}-byte salt", salt.len());
        Self { salt }
    }

    /// Create a processor with a per-process random salt.
    ///
    /// Masks are stable within one process only.
    pub fn with_random_salt() -> Self {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        let mut salt = Vec::with_capacity(16);
        for _ in 0..2 {
            let mut hasher = RandomState::new().build_hasher();
            hasher.write_usize(salt.len());
            salt.extend_from_slice(&hasher.finish().to_be_bytes());
        }
        Self::new(salt)
    }

    /// Hex SHA-256 of `salt || local_part`
    pub fn hash_local_part(&self, local_part: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.salt);
        hasher.update(local_part.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Mask an email for logging: `<digest prefix>@domain`.
    ///
    /// Input without exactly one `@` is hashed as a whole.
    pub fn mask_email(&self, email: &str) -> String {
        match split_email(email) {
            Some((local, domain)) => {
                let digest = self.hash_local_part(local);
                format!("{}@{}", &digest[..MASK_LEN], domain)
            }
            None => {
                let digest = self.hash_local_part(email);
                format!("<malformed:{}>", &digest[..MASK_LEN])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_part_hashing() {
        let processor = PrivacyProcessor::new(vec![1, 2, 3, 4]);

        let hash1 = processor.hash_local_part("john.doe");
        let hash2 = processor.hash_local_part("john.doe");
        let hash3 = processor.hash_local_part("jane.doe");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_mask_keeps_domain() {
        let processor = PrivacyProcessor::new(vec![9; 8]);
        let masked = processor.mask_email("john.doe@acme.com.au");

        assert!(masked.ends_with("@acme.com.au"));
        assert!(!masked.contains("john"));
        assert_eq!(masked.len(), MASK_LEN + "@acme.com.au".len());
    }

    #[test]
    fn test_mask_malformed_input() {
        let processor = PrivacyProcessor::new(vec![9; 8]);
        let masked = processor.mask_email("a@b@c.com");
        assert!(masked.starts_with("<malformed:"));
        assert!(!masked.contains("c.com"));
    }

    #[test]
    fn test_salt_changes_mask() {
        let first = PrivacyProcessor::new(vec![1]);
        let second = PrivacyProcessor::new(vec![2]);
        assert_ne!(first.mask_email("john@acme.com"), second.mask_email("john@acme.com"));
    }

    #[test]
    fn test_random_salts_differ() {
        let first = PrivacyProcessor::with_random_salt();
        let second = PrivacyProcessor::with_random_salt();
        assert_ne!(first.mask_email("john@acme.com"), second.mask_email("john@acme.com"));
    }
}

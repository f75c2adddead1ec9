//! Typo, alias and TLD correction
//!
//! Corrections come from two static tables loaded once at startup: exact
//! misspelled domains, and misspelled Australian TLD suffixes. There is no
//! fuzzy matching; a domain is either listed or left alone.

use crate::format::{split_email, strip_whitespace};
use crate::{CorrectionType, ValidationConfig};
use std::collections::HashMap;
use tracing::debug;

/// Result of running the correction rules over one email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOutcome {
    /// Email after every applicable rule
    pub corrected_email: String,
    /// Type of the last rule that changed the email
    pub correction_type: Option<CorrectionType>,
    /// Every rule that fired, in application order
    pub applied: Vec<CorrectionType>,
}

impl CorrectionOutcome {
    pub fn was_corrected(&self) -> bool {
        self.correction_type.is_some()
    }

    fn apply(&mut self, kind: CorrectionType) {
        self.correction_type = Some(kind);
        self.applied.push(kind);
    }
}

/// Applies the correction rules in their fixed priority order
pub struct DomainCorrector {
    domain_typos: HashMap<String, String>,
    /// Sorted longest typo suffix first so the most specific rule wins
    tld_typos: Vec<(String, String)>,
}

impl DomainCorrector {
    /// Create a corrector with the built-in tables
    pub fn new() -> Self {
        Self::with_tables(default_domain_typos(), default_tld_typos())
    }

    /// Create a corrector with custom domain and TLD tables
    pub fn with_tables<D, T>(domain_typos: D, tld_typos: T) -> Self
    where
        D: IntoIterator<Item = (String, String)>,
        T: IntoIterator<Item = (String, String)>,
    {
        let domain_typos: HashMap<String, String> = domain_typos
            .into_iter()
            .map(|(typo, fixed)| (typo.to_lowercase(), fixed.to_lowercase()))
            .collect();

        let mut tld_typos: Vec<(String, String)> = tld_typos
            .into_iter()
            .map(|(typo, fixed)| (typo.to_lowercase(), fixed.to_lowercase()))
            .collect();
        tld_typos.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        debug!(
            "Domain corrector initialized with {} domain rules and {} TLD rules",
            domain_typos.len(),
            tld_typos.len()
        );

        Self {
            domain_typos,
            tld_typos,
        }
    }

    /// Merge additional domain typo rules into the built-in table
    pub fn with_extra_domain_typos<I>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (typo, fixed) in extra {
            self.domain_typos
                .insert(typo.trim().to_lowercase(), fixed.trim().to_lowercase());
        }
        self
    }

    /// Run every applicable rule over `email`.
    ///
    /// Whitespace is stripped and the email lower-cased first. Input that does
    /// not split into exactly one local part and one domain gets no further
    /// rules.
    pub fn correct(&self, email: &str, config: &ValidationConfig) -> CorrectionOutcome {
        let stripped = strip_whitespace(email);
        let mut outcome = CorrectionOutcome {
            corrected_email: String::new(),
            correction_type: None,
            applied: Vec::new(),
        };
        if stripped != email {
            outcome.apply(CorrectionType::Whitespace);
        }

        let lowered = stripped.to_lowercase();
        let Some((local, domain)) = split_email(&lowered) else {
            debug!("Skipping corrections for email without exactly one '@'");
            outcome.corrected_email = lowered;
            return outcome;
        };

        let mut local = local.to_string();
        let mut domain = domain.to_string();

        if let Some(fixed) = self.correct_domain_typo(&domain) {
            debug!("Domain typo corrected: {} -> {}", domain, fixed);
            domain = fixed.to_string();
            outcome.apply(CorrectionType::DomainTypo);
        }

        if config.remove_gmail_aliases {
            if let Some(stripped_local) = strip_gmail_alias(&local, &domain) {
                debug!("Gmail alias removed from local part");
                local = stripped_local;
                outcome.apply(CorrectionType::GmailAlias);
            }
        }

        if config.check_australian_tlds {
            if let Some(fixed) = self.correct_tld(&domain) {
                debug!("TLD corrected: {} -> {}", domain, fixed);
                domain = fixed;
                outcome.apply(CorrectionType::Tld);
            }
        }

        outcome.corrected_email = format!("{}@{}", local, domain);
        outcome
    }

    /// Exact, case-insensitive lookup of a misspelled domain
    pub fn correct_domain_typo(&self, domain: &str) -> Option<&str> {
        self.domain_typos
            .get(&domain.to_lowercase())
            .map(String::as_str)
    }

    /// Replace a misspelled Australian TLD suffix, if one matches
    pub fn correct_tld(&self, domain: &str) -> Option<String> {
        let domain = domain.to_lowercase();
        self.tld_typos.iter().find_map(|(typo, fixed)| {
            domain
                .strip_suffix(typo.as_str())
                .filter(|head| !head.is_empty())
                .map(|head| format!("{}{}", head, fixed))
        })
    }

    /// Get the number of domain typo rules
    pub fn domain_rule_count(&self) -> usize {
        self.domain_typos.len()
    }

    /// Get the number of TLD typo rules
    pub fn tld_rule_count(&self) -> usize {
        self.tld_typos.len()
    }
}

impl Default for DomainCorrector {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate a gmail.com local part at its first `+`.
///
/// Returns `None` when the domain is not gmail.com, there is no alias, or
/// nothing precedes the `+`.
pub fn strip_gmail_alias(local: &str, domain: &str) -> Option<String> {
    if domain != "gmail.com" {
        return None;
    }
    local
        .split_once('+')
        .filter(|(base, _)| !base.is_empty())
        .map(|(base, _)| base.to_string())
}

fn default_domain_typos() -> Vec<(String, String)> {
    [
        // Gmail
        ("gmial.com", "gmail.com"),
        ("gmai.com", "gmail.com"),
        ("gmal.com", "gmail.com"),
        ("gamil.com", "gmail.com"),
        ("gmaill.com", "gmail.com"),
        ("gnail.com", "gmail.com"),
        ("gmail.co", "gmail.com"),
        ("gmail.con", "gmail.com"),
        ("gmail.cm", "gmail.com"),
        ("gmail.om", "gmail.com"),
        ("gmail.comm", "gmail.com"),
        ("gmail.com.au", "gmail.com"),
        ("googlemail.con", "googlemail.com"),

        // Microsoft
        ("hotmial.com", "hotmail.com"),
        ("hotmal.com", "hotmail.com"),
        ("hotmil.com", "hotmail.com"),
        ("hotnail.com", "hotmail.com"),
        ("hotmail.con", "hotmail.com"),
        ("hotmail.co", "hotmail.com"),
        ("outlok.com", "outlook.com"),
        ("outllok.com", "outlook.com"),
        ("outlook.con", "outlook.com"),
        ("outlook.co", "outlook.com"),
        ("livee.com", "live.com"),

        // Yahoo
        ("yaho.com", "yahoo.com"),
        ("yahooo.com", "yahoo.com"),
        ("yhoo.com", "yahoo.com"),
        ("yahoo.con", "yahoo.com"),
        ("yahoo.co", "yahoo.com"),

        // Apple and AOL
        ("iclod.com", "icloud.com"),
        ("icoud.com", "icloud.com"),
        ("icloud.con", "icloud.com"),
        ("icloud.co", "icloud.com"),
        ("aol.con", "aol.com"),

        // Australian ISPs
        ("bigpond.con", "bigpond.com"),
        ("bigpon.com", "bigpond.com"),
        ("bigponed.com", "bigpond.com"),
        ("biqpond.com", "bigpond.com"),
        ("optusnet.com", "optusnet.com.au"),
        ("optusnet.con.au", "optusnet.com.au"),
        ("iinet.com.au", "iinet.net.au"),
        ("tpg.net.au", "tpg.com.au"),
    ]
    .iter()
    .map(|&(typo, fixed)| (typo.to_string(), fixed.to_string()))
    .collect()
}

fn default_tld_typos() -> Vec<(String, String)> {
    [
        // .com.au
        (".comau", ".com.au"),
        (".com.a", ".com.au"),
        (".com.u", ".com.au"),
        (".con.au", ".com.au"),
        (".cm.au", ".com.au"),
        (".om.au", ".com.au"),
        (".com.aus", ".com.au"),

        // .net.au
        (".net.aus", ".net.au"),
        (".netau", ".net.au"),
        (".net.a", ".net.au"),
        (".nte.au", ".net.au"),

        // .org.au
        (".org.aus", ".org.au"),
        (".orgau", ".org.au"),
        (".org.a", ".org.au"),
        (".ogr.au", ".org.au"),

        // .edu.au / .gov.au
        (".edu.aus", ".edu.au"),
        (".eduau", ".edu.au"),
        (".gov.aus", ".gov.au"),
        (".govau", ".gov.au"),
    ]
    .iter()
    .map(|&(typo, fixed)| (typo.to_string(), fixed.to_string()))
    .collect()
}

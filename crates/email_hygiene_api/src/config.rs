//! Configuration management for the email hygiene API
//!
//! Values are layered with figment: built-in defaults, then an optional
//! `Config.toml` in the working directory, then `EMAIL_HYGIENE_*`
//! environment variables with `__` separating nested keys
//! (`EMAIL_HYGIENE_SERVER__PORT=8080`).

use email_hygiene_core::zerobounce::ZeroBounceConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "Config.toml";
pub const ENV_PREFIX: &str = "EMAIL_HYGIENE_";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub validation: ValidationSettings,
    pub storage: StorageConfig,
    pub deliverability: ZeroBounceConfig,
    pub crm: CrmConfig,
    pub batch: BatchConfig,
    pub observability: ObservabilityConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Load configuration from defaults, `Config.toml` and the environment
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Pipeline behaviour switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub use_deliverability_check: bool,
    pub remove_gmail_aliases: bool,
    pub check_australian_tlds: bool,
    pub deliverability_timeout_ms: u64,
    pub batch_pacing_ms: u64,
    /// Additional `typo -> fix` domain rules merged into the built-in table
    pub extra_domain_typos: HashMap<String, String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        let core = email_hygiene_core::ValidationConfig::default();
        Self {
            use_deliverability_check: core.use_deliverability_check,
            remove_gmail_aliases: core.remove_gmail_aliases,
            check_australian_tlds: core.check_australian_tlds,
            deliverability_timeout_ms: core.deliverability_timeout_ms,
            batch_pacing_ms: core.batch_pacing_ms,
            extra_domain_typos: HashMap::new(),
        }
    }
}

impl ValidationSettings {
    pub fn to_core(&self) -> email_hygiene_core::ValidationConfig {
        email_hygiene_core::ValidationConfig {
            use_deliverability_check: self.use_deliverability_check,
            remove_gmail_aliases: self.remove_gmail_aliases,
            check_australian_tlds: self.check_australian_tlds,
            deliverability_timeout_ms: self.deliverability_timeout_ms,
            batch_pacing_ms: self.batch_pacing_ms,
        }
    }
}

/// Where lookup lists and the corrections log live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Without a data directory everything stays in memory
    pub data_dir: Option<PathBuf>,
}

/// CRM write-back settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    pub base_url: String,
    /// Private app token; the webhook skips write-back when unset
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            access_token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Largest accepted batch request
    pub max_items: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_items: 100 }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "email_hygiene_api=debug,email_hygiene_core=debug,tower_http=info"
                .to_string(),
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Salt for masking emails in logs; random per process when unset
    pub privacy_salt: Option<String>,
    /// Allowed CORS origins (empty = allow all)
    pub cors_origins: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.batch.max_items, 100);
        assert!(config.storage.data_dir.is_none());
        assert!(config.crm.access_token.is_none());
        assert!(config.deliverability.api_key.is_none());
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_validation_defaults_match_core() {
        let core = AppConfig::default().validation.to_core();
        assert!(!core.use_deliverability_check);
        assert!(!core.remove_gmail_aliases);
        assert!(!core.check_australian_tlds);
        assert_eq!(core.deliverability_timeout_ms, 10_000);
        assert_eq!(core.batch_pacing_ms, 250);
    }

    #[test]
    fn test_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [server]
                port = 4000

                [validation]
                remove_gmail_aliases = true

                [validation.extra_domain_typos]
                "acmecorp.con" = "acmecorp.com"

                [storage]
                data_dir = "/var/lib/email-hygiene"
                "#,
            )?;
            jail.set_env("EMAIL_HYGIENE_SERVER__PORT", "8080");
            jail.set_env("EMAIL_HYGIENE_BATCH__MAX_ITEMS", "25");

            let config = AppConfig::load()?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.batch.max_items, 25);
            assert!(config.validation.remove_gmail_aliases);
            assert_eq!(
                config.validation.extra_domain_typos.get("acmecorp.con").map(String::as_str),
                Some("acmecorp.com")
            );
            assert_eq!(
                config.storage.data_dir,
                Some(PathBuf::from("/var/lib/email-hygiene"))
            );
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = AppConfig::load()?;
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.deliverability.base_url, "https://api.zerobounce.net");
            Ok(())
        });
    }
}

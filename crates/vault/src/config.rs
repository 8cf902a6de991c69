//! Configuration loading and validation for the vault.
//!
//! All values are read from environment variables at startup. The host
//! process should exit with the returned error if anything is missing or
//! invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::{self, MasterSecret};

/// Validated vault configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Raw master secret, at least 32 characters. **Required.**
    ///
    /// Optional at the type level so that absence surfaces as a configuration
    /// error from the cipher layer rather than a generic deserialisation error.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum number of blocking decrypt workers per text search.
    #[serde(default = "default_search_concurrency")]
    pub search_concurrency: usize,

    /// Page size used when a listing does not ask for one.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: usize,

    /// Upper bound on any requested page size.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: usize,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_search_concurrency() -> usize {
    4
}
fn default_page_limit() -> usize {
    20
}
fn default_max_page_limit() -> usize {
    100
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_level", &self.log_level)
            .field("search_concurrency", &self.search_concurrency)
            .field("default_page_limit", &self.default_page_limit)
            .field("max_page_limit", &self.max_page_limit)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation,
    /// including a missing or short `ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    fn load(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Derive (or fetch the cached) process-wide master secret.
    ///
    /// The key is checked even when a secret is already cached.
    ///
    /// # Errors
    ///
    /// Returns [`crypto::CipherError::Configuration`] if `ENCRYPTION_KEY` is
    /// absent or too short.
    pub fn master_secret(&self) -> Result<MasterSecret, crypto::CipherError> {
        let raw = crypto::master::check_raw(self.encryption_key.as_deref())?;
        crypto::master_secret(Some(raw))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        crypto::derive_master_secret(self.encryption_key.as_deref())
            .context("ENCRYPTION_KEY is invalid")?;

        if self.search_concurrency == 0 {
            anyhow::bail!("SEARCH_CONCURRENCY must be > 0");
        }
        if self.default_page_limit == 0 {
            anyhow::bail!("DEFAULT_PAGE_LIMIT must be > 0");
        }
        if self.max_page_limit < self.default_page_limit {
            anyhow::bail!("MAX_PAGE_LIMIT must be >= DEFAULT_PAGE_LIMIT");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            encryption_key: Some("config-test-secret-long-enough-000001".into()),
            log_level: default_log_level(),
            search_concurrency: default_search_concurrency(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_search_concurrency(), 4);
        assert_eq!(default_page_limit(), 20);
        assert_eq!(default_max_page_limit(), 100);
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_key() {
        let cfg = Config {
            encryption_key: None,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_key() {
        let cfg = Config {
            encryption_key: Some("short".into()),
            ..valid()
        };
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("at least 32 characters"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let cfg = Config {
            search_concurrency: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_page_limits() {
        let cfg = Config {
            default_page_limit: 50,
            max_page_limit: 10,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let mut map = config::Map::new();
        for (k, v) in vars {
            map.insert((*k).to_string(), (*v).to_string());
        }
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn load_reads_environment_variables() {
        let cfg = Config::load(env(&[
            ("ENCRYPTION_KEY", "config-test-secret-long-enough-000001"),
            ("SEARCH_CONCURRENCY", "8"),
            ("MAX_PAGE_LIMIT", "50"),
        ]))
        .unwrap();
        assert_eq!(cfg.search_concurrency, 8);
        assert_eq!(cfg.max_page_limit, 50);
        assert_eq!(cfg.default_page_limit, 20);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn load_without_key_fails() {
        let err = Config::load(env(&[("LOG_LEVEL", "debug")])).unwrap_err();
        assert!(format!("{err:#}").contains("ENCRYPTION_KEY"));
    }

    #[test]
    fn master_secret_requires_key_even_when_cached() {
        valid().master_secret().unwrap();
        let cfg = Config {
            encryption_key: None,
            ..valid()
        };
        assert!(matches!(
            cfg.master_secret().unwrap_err(),
            crypto::CipherError::Configuration(_)
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let printed = format!("{:?}", valid());
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("config-test-secret"));
    }
}

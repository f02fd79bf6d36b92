//! Adapter Configuration
//!
//! Explicit configuration for the store and its distributed lock. Every
//! knob lives here rather than in module-level constants, and precedence is
//! single-layered: a field the caller sets always wins over the built-in
//! default.

use crate::provider::BlobError;
use serde::{Deserialize, Serialize};

/// Configuration for a blob-backed filesystem store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage account name. Required; validated before any I/O.
    pub account_name: String,
    /// Storage account access key. Required; validated before any I/O.
    pub account_key: String,
    /// Container holding every object of the store. Doubles as the target
    /// of the store-wide lease.
    pub container: String,
    pub lock: LockConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            account_key: String::new(),
            container: "jsreport".to_string(),
            lock: LockConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(account_name: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            account_key: account_key.into(),
            ..Default::default()
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Fail fast on missing credentials, before any store round trip.
    pub fn validate(&self) -> Result<(), BlobError> {
        if self.account_name.is_empty() {
            return Err(BlobError::Configuration(
                "storage account name is not set".to_string(),
            ));
        }
        if self.account_key.is_empty() {
            return Err(BlobError::Configuration(
                "storage account key is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tuning for the store-wide distributed lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// When false, lock and release become no-ops issuing no lease.
    pub enabled: bool,
    /// How long an unreleased lease lives before the store reclaims it.
    /// Critical sections should stay short relative to this.
    pub lease_duration_secs: u64,
    /// Acquisition attempt budget. Large relative to expected contention,
    /// since a failed acquisition is the only signal of it.
    pub retry_attempts: u32,
    /// Linear-backoff delay unit between acquisition attempts.
    pub retry_delay_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lease_duration_secs: 30,
            retry_attempts: 100,
            retry_delay_ms: 10,
        }
    }
}

impl LockConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"account_name":"acct","account_key":"key"}"#).unwrap();
        assert_eq!(config.container, "jsreport");
        assert!(config.lock.enabled);
        assert_eq!(config.lock.lease_duration_secs, 30);
        assert_eq!(config.lock.retry_attempts, 100);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: StoreConfig = serde_json::from_str(
            r#"{
                "account_name": "acct",
                "account_key": "key",
                "container": "reports",
                "lock": {"enabled": false, "lease_duration_secs": 60}
            }"#,
        )
        .unwrap();
        assert_eq!(config.container, "reports");
        assert!(!config.lock.enabled);
        assert_eq!(config.lock.lease_duration_secs, 60);
        // Fields absent from the overriding object still default.
        assert_eq!(config.lock.retry_attempts, 100);
    }

    #[test]
    fn validation_requires_credentials() {
        let missing_name = StoreConfig::new("", "key");
        assert!(matches!(
            missing_name.validate(),
            Err(BlobError::Configuration(_))
        ));

        let missing_key = StoreConfig::new("acct", "");
        assert!(matches!(
            missing_key.validate(),
            Err(BlobError::Configuration(_))
        ));

        assert!(StoreConfig::new("acct", "key").validate().is_ok());
    }
}

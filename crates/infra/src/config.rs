//! Configuration: runtime parameters and process settings.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use stardust_core::Amount;
use stardust_purchasing::DEFAULT_MD_APPROVAL_THRESHOLD;

/// Parameter key holding the MD approval threshold (decimal, e.g. `50000.00`).
pub const MD_APPROVAL_THRESHOLD_KEY: &str = "purchasing.md_approval_threshold";

/// Parameter key holding the outgoing mail sender address.
pub const SMTP_FROM_KEY: &str = "mail.smtp_from";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("parameter '{key}' has malformed value '{value}'")]
    Malformed { key: String, value: String },

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Process-wide key/value parameter store, editable at runtime.
pub trait ConfigParameters: Send + Sync {
    fn get_param(&self, key: &str) -> Option<String>;
    fn set_param(&self, key: &str, value: String);
}

impl<S> ConfigParameters for Arc<S>
where
    S: ConfigParameters + ?Sized,
{
    fn get_param(&self, key: &str) -> Option<String> {
        (**self).get_param(key)
    }

    fn set_param(&self, key: &str, value: String) {
        (**self).set_param(key, value)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConfigParameters {
    params: RwLock<HashMap<String, String>>,
}

impl InMemoryConfigParameters {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigParameters for InMemoryConfigParameters {
    fn get_param(&self, key: &str) -> Option<String> {
        self.params.read().ok()?.get(key).cloned()
    }

    fn set_param(&self, key: &str, value: String) {
        if let Ok(mut params) = self.params.write() {
            params.insert(key.to_string(), value);
        }
    }
}

/// Current MD approval threshold; the default applies when the key is unset.
pub fn md_approval_threshold(params: &dyn ConfigParameters) -> Result<Amount, ConfigError> {
    match params.get_param(MD_APPROVAL_THRESHOLD_KEY) {
        None => Ok(DEFAULT_MD_APPROVAL_THRESHOLD),
        Some(raw) => raw.parse::<Amount>().map_err(|_| ConfigError::Malformed {
            key: MD_APPROVAL_THRESHOLD_KEY.to_string(),
            value: raw,
        }),
    }
}

/// Server process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Seeds `purchasing.md_approval_threshold` when set.
    pub md_approval_threshold: Option<Amount>,
    /// Seeds `mail.smtp_from` when set.
    pub smtp_from: Option<String>,
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

impl ServerConfig {
    /// Read `BIND_ADDR`, `JWT_SECRET`, `MD_APPROVAL_THRESHOLD` and `SMTP_FROM`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::InvalidSetting {
            name: "BIND_ADDR",
            reason: format!("{bind_raw}: {e}"),
        })?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let md_approval_threshold = lookup("MD_APPROVAL_THRESHOLD")
            .map(|raw| {
                raw.parse::<Amount>().map_err(|e| ConfigError::InvalidSetting {
                    name: "MD_APPROVAL_THRESHOLD",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            md_approval_threshold,
            smtp_from: lookup("SMTP_FROM").filter(|s| !s.trim().is_empty()),
        })
    }

    /// Write the seeded values into a parameter store.
    pub fn seed(&self, params: &dyn ConfigParameters) {
        if let Some(threshold) = self.md_approval_threshold {
            params.set_param(MD_APPROVAL_THRESHOLD_KEY, threshold.to_string());
        }
        if let Some(from) = &self.smtp_from {
            params.set_param(SMTP_FROM_KEY, from.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_defaults_and_parses() {
        let params = InMemoryConfigParameters::new();
        assert_eq!(md_approval_threshold(&params), Ok(Amount::from_major(50_000)));

        params.set_param(MD_APPROVAL_THRESHOLD_KEY, "1250.5".to_string());
        assert_eq!(md_approval_threshold(&params), Ok(Amount::from_minor(125_050)));

        params.set_param(MD_APPROVAL_THRESHOLD_KEY, "fifty".to_string());
        assert!(matches!(
            md_approval_threshold(&params),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn server_config_defaults() {
        let cfg = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.jwt_secret, "dev-secret");
        assert_eq!(cfg.md_approval_threshold, None);
    }

    #[test]
    fn server_config_seeds_parameters() {
        let cfg = ServerConfig::from_lookup(|name| match name {
            "MD_APPROVAL_THRESHOLD" => Some("75000".to_string()),
            "SMTP_FROM" => Some("purchasing@stardust.test".to_string()),
            _ => None,
        })
        .unwrap();

        let params = InMemoryConfigParameters::new();
        cfg.seed(&params);
        assert_eq!(md_approval_threshold(&params), Ok(Amount::from_major(75_000)));
        assert_eq!(
            params.get_param(SMTP_FROM_KEY).as_deref(),
            Some("purchasing@stardust.test")
        );
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let err = ServerConfig::from_lookup(|name| (name == "BIND_ADDR").then(|| "nowhere".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "BIND_ADDR", .. }));
    }
}

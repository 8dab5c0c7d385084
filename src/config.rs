//! Core configuration.
//!
//! All fields default, so an empty JSON object is a valid configuration.
//! Environment overrides use the `RECSYS_` prefix.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Well-known local storage key holding the anonymous visitor id.
pub const DEFAULT_ANON_ID_KEY: &str = "recsys_anon_id";

/// Dashboard list cache TTL - 5 minutes
pub const DEFAULT_LIST_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub anon_id_storage_key: String,
    pub list_cache_ttl_secs: u64,
    pub domain_key_attempts: u32,
    pub domain_key_len: usize,
    pub max_value_len: usize,
    pub trim_values: bool,
    /// Treat values carrying script or markup payloads as extraction failures.
    pub reject_markup: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            anon_id_storage_key: DEFAULT_ANON_ID_KEY.to_string(),
            list_cache_ttl_secs: DEFAULT_LIST_CACHE_TTL_SECS,
            domain_key_attempts: 8,
            domain_key_len: 32,
            max_value_len: 2048,
            trim_values: true,
            reject_markup: false,
        }
    }
}

impl CoreConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Defaults overlaid with `RECSYS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("RECSYS_ANON_ID_KEY") {
            if !key.trim().is_empty() {
                config.anon_id_storage_key = key;
            }
        }
        overlay(&lookup, "RECSYS_LIST_CACHE_TTL_SECS", &mut config.list_cache_ttl_secs);
        overlay(&lookup, "RECSYS_DOMAIN_KEY_ATTEMPTS", &mut config.domain_key_attempts);
        overlay(&lookup, "RECSYS_DOMAIN_KEY_LEN", &mut config.domain_key_len);
        overlay(&lookup, "RECSYS_MAX_VALUE_LEN", &mut config.max_value_len);
        overlay(&lookup, "RECSYS_TRIM_VALUES", &mut config.trim_values);
        overlay(&lookup, "RECSYS_REJECT_MARKUP", &mut config.reject_markup);

        config
    }

    pub fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_secs)
    }
}

fn overlay<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("CONFIG_OVERRIDE_IGNORED var={} value={:?}", name, raw),
        }
    }
}

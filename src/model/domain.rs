//! Tracked domains and their unguessable keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainKey(String);

impl DomainKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: i64,
    pub key: DomainKey,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Hex SHA-256 of a fresh UUIDv4, truncated to `len` characters.
pub fn random_domain_key(len: usize) -> DomainKey {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(len.clamp(8, 64));
    DomainKey(key)
}

/// Generate a key that `exists` does not know about, retrying up to
/// `config.domain_key_attempts` times.
pub fn generate_domain_key<F>(config: &CoreConfig, exists: F) -> Result<DomainKey>
where
    F: Fn(&DomainKey) -> bool,
{
    generate_with(config, exists, || random_domain_key(config.domain_key_len))
}

fn generate_with<F, G>(config: &CoreConfig, exists: F, mut next: G) -> Result<DomainKey>
where
    F: Fn(&DomainKey) -> bool,
    G: FnMut() -> DomainKey,
{
    for attempt in 1..=config.domain_key_attempts.max(1) {
        let candidate = next();
        if !exists(&candidate) {
            return Ok(candidate);
        }
        log::warn!("DOMAIN_KEY_COLLISION attempt={}", attempt);
    }
    Err(CoreError::conflict(format!(
        "could not generate a unique domain key after {} attempts",
        config.domain_key_attempts.max(1)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_random_key_shape() {
        let key = random_domain_key(32);
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, random_domain_key(32));
    }

    #[test]
    fn test_collision_retries_then_succeeds() {
        let config = CoreConfig::default();
        let calls = Cell::new(0);
        let key = generate_with(
            &config,
            |k| k.as_str() == "taken",
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    DomainKey::new("taken")
                } else {
                    DomainKey::new("fresh")
                }
            },
        )
        .unwrap();
        assert_eq!(key.as_str(), "fresh");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhausted_attempts_conflict() {
        let config = CoreConfig {
            domain_key_attempts: 2,
            ..CoreConfig::default()
        };
        let err = generate_with(&config, |_| true, || DomainKey::new("taken")).unwrap_err();
        assert_eq!(err.status(), 409);
    }
}

//! Batch context for signal collection.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::logging::structured::LogContext;

/// Context for one batch of captured signals from a domain.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch_id: String,
    pub domain_key: String,
    pub received_at: DateTime<Utc>,
    pub config: CoreConfig,
}

impl BatchContext {
    pub fn new(domain_key: &str, config: CoreConfig) -> Self {
        let batch_id = format!("batch-{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self {
            batch_id,
            domain_key: domain_key.to_string(),
            received_at: Utc::now(),
            config,
        }
    }

    /// `[batch=..]` context for per-signal log lines.
    pub fn log_context(&self) -> LogContext {
        LogContext::for_batch(&self.batch_id)
    }
}

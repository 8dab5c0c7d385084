//! Structured logging utilities.
//!
//! Provides context-aware logging with the domain key, rule id or batch id
//! included in every log message.

use std::fmt;

/// Logging context for work scoped to a tracked domain.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub scope: String,
    pub rule_id: Option<i64>,
}

impl LogContext {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            rule_id: None,
        }
    }

    pub fn for_domain(domain_key: &str) -> Self {
        Self::new(&format!("domain={}", domain_key))
    }

    pub fn for_batch(batch_id: &str) -> Self {
        Self::new(&format!("batch={}", batch_id))
    }

    pub fn with_rule(&self, rule_id: i64) -> Self {
        Self {
            scope: self.scope.clone(),
            rule_id: Some(rule_id),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule_id {
            Some(id) => write!(f, "[{}] [rule={}]", self.scope, id),
            None => write!(f, "[{}]", self.scope),
        }
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_display() {
        let ctx = LogContext::for_domain("ab12");
        assert_eq!(format!("{}", ctx), "[domain=ab12]");

        let ctx_with_rule = ctx.with_rule(42);
        assert_eq!(format!("{}", ctx_with_rule), "[domain=ab12] [rule=42]");
    }

    #[test]
    fn test_batch_context_display() {
        assert_eq!(LogContext::for_batch("batch-1").to_string(), "[batch=batch-1]");
    }
}

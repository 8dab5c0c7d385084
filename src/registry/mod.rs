//! Pattern/Operator registry.
//!
//! Read-only reference data used by rules and return methods:
//! - Operators (`contains`, `equals`, `starts_with`, `ends_with`)
//! - Named patterns (which signal string a comparison reads)
//! - Event types a rule may emit

pub mod operator;
pub mod pattern;

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, Result};

pub use operator::*;
pub use pattern::*;

/// A row of the event type reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: i64,
    pub name: String,
}

/// Lookup lists for operators, patterns and event types.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    operators: BTreeMap<i64, Operator>,
    patterns: BTreeMap<i64, Pattern>,
    event_types: BTreeMap<i64, EventType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the administrative seed data.
    pub fn seeded() -> Self {
        let mut registry = Self::new();
        for op in Operator::ALL {
            registry.operators.insert(op.seed_id(), op);
        }
        for pattern in seeded_patterns() {
            registry.patterns.insert(pattern.id, pattern);
        }
        for (id, name) in [
            (1, "Click"),
            (2, "Rating"),
            (3, "Review"),
            (4, "Page View"),
            (5, "Add To Cart"),
        ] {
            registry.event_types.insert(
                id,
                EventType {
                    id,
                    name: name.to_string(),
                },
            );
        }
        registry
    }

    pub fn operator(&self, id: i64) -> Result<Operator> {
        self.operators
            .get(&id)
            .copied()
            .ok_or_else(|| CoreError::not_found(EntityKind::Operator, id))
    }

    pub fn pattern(&self, id: i64) -> Result<&Pattern> {
        self.patterns
            .get(&id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Pattern, id))
    }

    pub fn event_type(&self, id: i64) -> Result<&EventType> {
        self.event_types
            .get(&id)
            .ok_or_else(|| CoreError::not_found(EntityKind::EventType, id))
    }

    pub fn operators(&self) -> Vec<(i64, Operator)> {
        self.operators.iter().map(|(id, op)| (*id, *op)).collect()
    }

    pub fn patterns(&self) -> Vec<&Pattern> {
        self.patterns.values().collect()
    }

    pub fn event_types(&self) -> Vec<&EventType> {
        self.event_types.values().collect()
    }

    /// Replace the registry contents with rows loaded by the host.
    ///
    /// # Arguments
    /// * `operators` - (id, name)
    /// * `patterns` - (id, name)
    /// * `event_types` - (id, name)
    ///
    /// Rows with unknown operator or pattern names are skipped with a warning.
    pub fn load_from_db_rows(
        &mut self,
        operators: Vec<(i64, String)>,
        patterns: Vec<(i64, String)>,
        event_types: Vec<(i64, String)>,
    ) {
        self.operators.clear();
        self.patterns.clear();
        self.event_types.clear();

        for (id, name) in operators {
            match Operator::parse(&name) {
                Some(op) => {
                    self.operators.insert(id, op);
                }
                None => log::warn!("REGISTRY_ROW_SKIPPED table=operators id={} name={}", id, name),
            }
        }

        for (id, name) in patterns {
            match PatternKind::parse(&name) {
                Some(kind) => {
                    self.patterns.insert(id, Pattern { id, name, kind });
                }
                None => log::warn!("REGISTRY_ROW_SKIPPED table=patterns id={} name={}", id, name),
            }
        }

        for (id, name) in event_types {
            self.event_types.insert(id, EventType { id, name });
        }

        log::info!(
            "REGISTRY_LOADED operators={} patterns={} event_types={}",
            self.operators.len(),
            self.patterns.len(),
            self.event_types.len()
        );
    }
}

// Global registry, seeded until the host loads its own rows
lazy_static! {
    static ref REGISTRY: RwLock<Registry> = RwLock::new(Registry::seeded());
}

/// Get a read-only reference to the global registry.
pub fn get_registry() -> RwLockReadGuard<'static, Registry> {
    REGISTRY.read()
}

/// Get a mutable reference to the global registry.
pub fn get_registry_mut() -> RwLockWriteGuard<'static, Registry> {
    REGISTRY.write()
}

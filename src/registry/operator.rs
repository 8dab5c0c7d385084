//! Comparison operators usable in a TrackingTarget, Condition or ReturnMethod.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Contains,
        Operator::Equals,
        Operator::StartsWith,
        Operator::EndsWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::Equals => "equals",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "contains" => Some(Operator::Contains),
            "equals" => Some(Operator::Equals),
            "starts_with" | "startswith" => Some(Operator::StartsWith),
            "ends_with" | "endswith" => Some(Operator::EndsWith),
            _ => None,
        }
    }

    /// Seeded numeric id.
    pub fn seed_id(&self) -> i64 {
        match self {
            Operator::Contains => 1,
            Operator::Equals => 2,
            Operator::StartsWith => 3,
            Operator::EndsWith => 4,
        }
    }

    /// Compare `subject` (what the signal exposes) against `expected` (what the
    /// author configured). Case-sensitive.
    pub fn compare(&self, subject: &str, expected: &str) -> bool {
        match self {
            Operator::Contains => subject.contains(expected),
            Operator::Equals => subject == expected,
            Operator::StartsWith => subject.starts_with(expected),
            Operator::EndsWith => subject.ends_with(expected),
        }
    }
}

//! Serializable pipeline state for reporting.

use chrono::{DateTime, Utc};
use lw_common::Priority;
use serde::Serialize;

use crate::unit::{Unit, UnitProfile, UnitState};

/// One unit's state and timings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSnapshot {
    pub key: String,
    pub dataset: String,
    pub priority: Priority,
    pub state: UnitState,
    pub profile: UnitProfile,
}

impl From<&Unit> for UnitSnapshot {
    fn from(unit: &Unit) -> Self {
        Self {
            key: unit.key().to_string(),
            dataset: unit.dataset().to_string(),
            priority: unit.priority(),
            state: unit.state(),
            profile: *unit.profile(),
        }
    }
}

/// One set's state, units in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetSnapshot {
    pub key: String,
    pub priority: Priority,
    pub loaded: bool,
    pub configured: bool,
    pub units: Vec<UnitSnapshot>,
    pub taken_at: DateTime<Utc>,
}

impl SetSnapshot {
    /// Keys of units in the given state.
    pub fn keys_in(&self, state: UnitState) -> Vec<&str> {
        self.units
            .iter()
            .filter(|unit| unit.state == state)
            .map(|unit| unit.key.as_str())
            .collect()
    }

    pub fn to_json(&self) -> String {
        to_json(self)
    }
}

/// A composite's state, sets in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    pub key: String,
    pub sets: Vec<SetSnapshot>,
    pub taken_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    pub fn set(&self, key: &str) -> Option<&SetSnapshot> {
        self.sets.iter().find(|set| set.key == key)
    }

    pub fn to_json(&self) -> String {
        to_json(self)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|err| format!(r#"{{"error":"serialization_failed","reason":"{}"}}"#, err))
}

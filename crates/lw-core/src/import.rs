//! Declarative import records.
//!
//! The import format is a mapping from set implementation identifier to a
//! set record; each set record maps unit implementation identifiers to unit
//! records:
//!
//! ```json
//! {
//!   "views": {
//!     "name": "app.views",
//!     "config_path": "config/app",
//!     "priority": "high",
//!     "config": {
//!       "blade": {"name": "blade", "dataset": "view.blade", "priority": "normal", "config": {}}
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use lw_common::{Error, PriorityToken, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::source::Settings;

/// A whole declarative specification, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportSpec {
    sets: IndexMap<String, SetRecord>,
}

impl ImportSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from a JSON value. Failures are `InvalidImport`.
    pub fn from_value(value: Json) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidImport(format!(
                "expected a mapping of set identifiers, found {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Add a set record under its implementation identifier.
    pub fn set(mut self, identifier: impl Into<String>, record: SetRecord) -> Self {
        self.insert(identifier, record);
        self
    }

    pub fn insert(&mut self, identifier: impl Into<String>, record: SetRecord) -> &mut Self {
        self.sets.insert(identifier.into(), record);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SetRecord)> {
        self.sets.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "map",
    }
}

/// One set in a declarative specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityToken>,
    /// Unit records keyed by unit implementation identifier.
    #[serde(default, rename = "config")]
    pub units: IndexMap<String, UnitRecord>,
}

impl SetRecord {
    pub fn new(
        name: impl Into<String>,
        config_path: impl Into<String>,
        priority: impl Into<PriorityToken>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            config_path: Some(config_path.into()),
            priority: Some(priority.into()),
            units: IndexMap::new(),
        }
    }

    /// Add a unit record under its implementation identifier.
    pub fn unit(mut self, identifier: impl Into<String>, record: UnitRecord) -> Self {
        self.units.insert(identifier.into(), record);
        self
    }

    /// Required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.as_deref().is_none_or(str::is_empty) {
            missing.push("name");
        }
        if self.config_path.as_deref().is_none_or(str::is_empty) {
            missing.push("config_path");
        }
        if self.priority.is_none() {
            missing.push("priority");
        }
        missing
    }
}

/// One unit in a set record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Unit key; the implementation identifier when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityToken>,
    #[serde(default)]
    pub config: Settings,
}

impl UnitRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn priority(mut self, priority: impl Into<PriorityToken>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn config(mut self, config: Settings) -> Self {
        self.config = config;
        self
    }

    /// The unit key this record produces under `identifier`.
    pub fn key_for<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(identifier)
    }
}

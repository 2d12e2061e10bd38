//! Configuration data sources.
//!
//! A data source hands out named datasets (mappings) to units during `load`.
//! The pipeline only ever reads from it.

use indexmap::IndexMap;
use lw_common::{Error, Result};
use lw_symbols::{query_map, SymbolType, Value};
use serde_json::{Map, Value as Json};
use std::sync::Arc;

/// A unit's settings: an ordered string-keyed mapping.
pub type Settings = Map<String, Json>;

/// Provider of named configuration datasets.
pub trait DataSource: Send + Sync {
    /// Where this source reads from, for error messages.
    fn location(&self) -> &str;

    fn has(&self, key: &str) -> bool;

    /// The dataset stored under `key`.
    ///
    /// Fails with `ConfigNotFound` when nothing is stored there.
    fn read(&self, key: &str) -> Result<Settings>;

    /// Several datasets at once, in the order requested.
    fn read_many(&self, keys: &[&str]) -> Result<IndexMap<String, Settings>> {
        let mut out = IndexMap::with_capacity(keys.len());
        for key in keys {
            out.insert((*key).to_string(), self.read(key)?);
        }
        Ok(out)
    }
}

/// Data source over an in-memory document.
///
/// Keys are dot-paths into the document; `"view.blade"` finds either a
/// top-level `"view.blade"` entry or `blade` inside `view`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    location: String,
    document: Settings,
}

impl MemorySource {
    pub fn new(location: impl Into<String>, document: Settings) -> Self {
        Self {
            location: location.into(),
            document,
        }
    }

    pub fn empty(location: impl Into<String>) -> Self {
        Self::new(location, Settings::new())
    }

    /// Wrap a JSON document, which must be an object.
    pub fn from_value(location: impl Into<String>, document: Json) -> Result<Self> {
        let location = location.into();
        match document {
            Json::Object(map) => Ok(Self::new(location, map)),
            other => Err(Error::InvalidDataset {
                key: location,
                found: kind_of(&other),
            }),
        }
    }

    pub fn document(&self) -> &Settings {
        &self.document
    }

    /// Add or replace a top-level dataset.
    pub fn insert(&mut self, key: impl Into<String>, dataset: Settings) -> &mut Self {
        self.document.insert(key.into(), Json::Object(dataset));
        self
    }
}

impl DataSource for MemorySource {
    fn location(&self) -> &str {
        &self.location
    }

    fn has(&self, key: &str) -> bool {
        query_map(&self.document, key).is_some()
    }

    fn read(&self, key: &str) -> Result<Settings> {
        match query_map(&self.document, key) {
            Some(Json::Object(map)) => Ok(map.clone()),
            Some(other) => Err(Error::InvalidDataset {
                key: key.to_string(),
                found: kind_of(other),
            }),
            None => Err(Error::ConfigNotFound {
                location: self.location.clone(),
                key: key.to_string(),
            }),
        }
    }
}

fn kind_of(value: &Json) -> String {
    SymbolType::of(&Value::Data(value.clone())).to_string()
}

/// In-memory documents keyed by location.
///
/// Stands in for a directory of configuration files: each location a
/// declarative import names is served from the document stored under it.
#[derive(Debug, Clone, Default)]
pub struct SourceLibrary {
    documents: IndexMap<String, Settings>,
}

impl SourceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, document: Settings) -> Self {
        self.insert(location, document);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, document: Settings) -> &mut Self {
        self.documents.insert(location.into(), document);
        self
    }

    pub fn contains(&self, location: &str) -> bool {
        self.documents.contains_key(location)
    }

    /// A fresh source bound to `location`. Unknown locations yield an empty
    /// source, so reads fail with `ConfigNotFound` naming the location.
    pub fn open(&self, location: &str) -> Arc<dyn DataSource> {
        let document = self.documents.get(location).cloned().unwrap_or_default();
        Arc::new(MemorySource::new(location, document))
    }
}

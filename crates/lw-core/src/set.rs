//! Priority-ordered groups of units sharing one data source.

use chrono::{DateTime, Utc};
use lw_common::{Error, Priority, Result};
use lw_symbols::{prefix_splits, query_map, Instance, SymbolTable, TypeCatalog};
use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::capability;
use crate::container::AttachedRegistry;
use crate::factory::FactoryRegistry;
use crate::import::UnitRecord;
use crate::logging::{event_names, Phase};
use crate::snapshot::{SetSnapshot, UnitSnapshot};
use crate::source::DataSource;
use crate::unit::Unit;

/// What a unit sees of the set running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetView {
    pub key: String,
    pub priority: Priority,
    /// Unit keys in execution order.
    pub units: Vec<String>,
}

/// Result of a dot-path lookup through a set.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Set(&'a Set),
    Unit(&'a Unit),
    Setting(&'a Json),
    Missing,
}

impl<'a> Lookup<'a> {
    pub fn as_set(&self) -> Option<&'a Set> {
        match self {
            Lookup::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_unit(&self) -> Option<&'a Unit> {
        match self {
            Lookup::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_setting(&self) -> Option<&'a Json> {
        match self {
            Lookup::Setting(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }
}

/// A priority-ordered registry of units.
///
/// Units are kept sorted by ascending priority, ties in insertion order.
pub struct Set {
    key: String,
    priority: Priority,
    source: Arc<dyn DataSource>,
    registry: Option<AttachedRegistry>,
    base: SymbolTable,
    catalog: Arc<TypeCatalog>,
    units: Vec<Unit>,
    loaded_at: Option<DateTime<Utc>>,
    configured_at: Option<DateTime<Utc>>,
}

impl Set {
    pub fn new(key: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        Self {
            key: key.into(),
            priority: Priority::NORMAL,
            source,
            registry: None,
            base: SymbolTable::new(),
            catalog: Arc::new(TypeCatalog::new()),
            units: Vec::new(),
            loaded_at: None,
            configured_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_registry(mut self, registry: AttachedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_base_symbols(mut self, symbols: SymbolTable) -> Self {
        self.base = symbols;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<TypeCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub fn registry(&self) -> Option<&AttachedRegistry> {
        self.registry.as_ref()
    }

    pub fn set_registry(&mut self, registry: Option<AttachedRegistry>) {
        self.registry = registry;
    }

    pub fn base_symbols(&self) -> &SymbolTable {
        &self.base
    }

    pub fn set_base_symbols(&mut self, symbols: SymbolTable) {
        self.base = symbols;
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: Arc<TypeCatalog>) {
        self.catalog = catalog;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.configured_at.is_some()
    }

    /// Register a unit. Fails with `DuplicateUnit` and leaves the set
    /// unchanged when the key is taken.
    pub fn insert(&mut self, mut unit: Unit) -> Result<()> {
        if self.contains(unit.key()) {
            return Err(Error::DuplicateUnit {
                set: self.key.clone(),
                key: unit.key().to_string(),
            });
        }
        unit.mark_added();
        self.units.push(unit);
        // stable: equal priorities stay in insertion order
        self.units.sort_by_key(Unit::priority);
        Ok(())
    }

    /// Build a unit from a declarative record and register it.
    pub fn insert_record(&mut self, factories: &FactoryRegistry, id: &str, record: &UnitRecord) -> Result<()> {
        let unit = factories.build_unit(id, record)?;
        self.insert(unit)
    }

    pub fn get(&self, key: &str) -> Result<&Unit> {
        self.units
            .iter()
            .find(|unit| unit.key() == key)
            .ok_or_else(|| Error::UnitNotFound {
                set: self.key.clone(),
                key: key.to_string(),
            })
    }

    /// Remove a unit, whatever its state.
    ///
    /// Reinserting a unit under the same key starts it from `Registered`.
    pub fn remove(&mut self, key: &str) -> Result<Unit> {
        let idx = self
            .units
            .iter()
            .position(|unit| unit.key() == key)
            .ok_or_else(|| Error::UnitNotFound {
                set: self.key.clone(),
                key: key.to_string(),
            })?;
        Ok(self.units.remove(idx))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.units.iter().any(|unit| unit.key() == key)
    }

    /// Units in execution order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(Unit::key)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn view(&self) -> SetView {
        SetView {
            key: self.key.clone(),
            priority: self.priority,
            units: self.keys().map(str::to_string).collect(),
        }
    }

    /// Insert `additional` units, then load every unit not yet loaded, in
    /// priority order. Stops at the first failure.
    pub fn load(&mut self, additional: Vec<Unit>) -> Result<()> {
        for unit in additional {
            self.insert(unit)?;
        }

        let source = Arc::clone(&self.source);
        for unit in self.units.iter_mut().filter(|unit| !unit.is_loaded()) {
            if let Err(err) = unit.load(source.as_ref()) {
                warn!(
                    event = event_names::PHASE_ABORTED,
                    phase = %Phase::Load,
                    set = %self.key,
                    unit = %unit.key(),
                    error = %err,
                    "load aborted"
                );
                return Err(err);
            }
        }

        self.loaded_at = Some(Utc::now());
        info!(
            event = event_names::SET_LOADED,
            phase = %Phase::Load,
            set = %self.key,
            units = self.units.len(),
            "set loaded"
        );
        Ok(())
    }

    /// Apply every unit not yet configured, in priority order.
    ///
    /// Each unit resolves against the base symbols overlaid with the set's
    /// capabilities and the unit's own key, dataset and settings. The first
    /// failure aborts the pass; units applied before it stay configured.
    pub fn configure(&mut self) -> Result<()> {
        let view = Instance::new(capability::SET, self.view());

        for idx in 0..self.units.len() {
            if self.units[idx].is_configured() {
                continue;
            }
            let symbols = self.request_symbols(&self.units[idx], &view);
            let catalog = Arc::clone(&self.catalog);
            if let Err(err) = self.units[idx].configure(symbols, catalog) {
                warn!(
                    event = event_names::PHASE_ABORTED,
                    phase = %Phase::Configure,
                    set = %self.key,
                    unit = %self.units[idx].key(),
                    error = %err,
                    "configure aborted"
                );
                return Err(err);
            }
        }

        self.configured_at = Some(Utc::now());
        info!(
            event = event_names::SET_CONFIGURED,
            phase = %Phase::Configure,
            set = %self.key,
            units = self.units.len(),
            "set configured"
        );
        Ok(())
    }

    /// The symbol table one unit's `apply` resolves against.
    pub fn request_symbols(&self, unit: &Unit, view: &Instance) -> SymbolTable {
        let mut overlay = SymbolTable::new();
        overlay
            .define(
                capability::DATA_SOURCE,
                Instance::new(capability::DATA_SOURCE, Arc::clone(&self.source)),
            )
            .define(capability::SET, view.clone())
            .define(capability::CONFIG, unit.settings().clone())
            .define(capability::NAME, unit.key())
            .define(capability::DATASET, unit.dataset());

        if let Some(registry) = &self.registry {
            overlay.define(registry.type_name(), registry.concrete().clone());
            if let Some(generic) = registry.generic() {
                overlay.define(
                    capability::CONTAINER,
                    Instance::new(capability::CONTAINER, Arc::clone(generic)),
                );
            }
        }

        let mut symbols = self.base.clone();
        symbols.merge(&overlay);
        symbols
    }

    /// Look up `path` inside this set.
    ///
    /// Unit keys prefixing `path` are tried longest first; the rest of the
    /// path walks that unit's settings. An empty path, or one that resolves
    /// to nothing, yields the set itself.
    pub fn find(&self, path: &str) -> Lookup<'_> {
        if path.is_empty() {
            return Lookup::Set(self);
        }
        for (unit_key, rest) in prefix_splits(path) {
            let Ok(unit) = self.get(unit_key) else {
                continue;
            };
            if rest.is_empty() {
                return Lookup::Unit(unit);
            }
            if let Some(value) = query_map(unit.settings(), rest) {
                return Lookup::Setting(value);
            }
        }
        Lookup::Set(self)
    }

    pub fn snapshot(&self) -> SetSnapshot {
        SetSnapshot {
            key: self.key.clone(),
            priority: self.priority,
            loaded: self.is_loaded(),
            configured: self.is_configured(),
            units: self.units.iter().map(UnitSnapshot::from).collect(),
            taken_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("source", &self.source.location())
            .field("registry", &self.registry)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

//! The top of the pipeline: priority-ordered sets built from a declarative
//! specification.

use chrono::Utc;
use lw_common::{Error, Result};
use lw_symbols::{DependencyResolver, SymbolTable, TypeCatalog};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::container::AttachedRegistry;
use crate::factory::{FactoryRegistry, SetSeed};
use crate::import::{ImportSpec, SetRecord};
use crate::logging::{event_names, Phase};
use crate::set::{Lookup, Set};
use crate::snapshot::PipelineSnapshot;

/// A priority-ordered registry of sets.
///
/// Every registered set resolves against the composite's base symbols;
/// [`Composite::set_base_symbols`] is the only way to change them.
#[derive(Debug)]
pub struct Composite {
    key: String,
    catalog: Arc<TypeCatalog>,
    base: SymbolTable,
    registry: Option<AttachedRegistry>,
    factories: FactoryRegistry,
    sets: Vec<Set>,
}

impl Composite {
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_catalog(key, Arc::new(TypeCatalog::new()))
    }

    pub fn with_catalog(key: impl Into<String>, catalog: Arc<TypeCatalog>) -> Self {
        Self {
            key: key.into(),
            catalog,
            base: SymbolTable::new(),
            registry: None,
            factories: FactoryRegistry::new(),
            sets: Vec::new(),
        }
    }

    pub fn with_factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    /// Attach the registry imported sets are built with.
    pub fn with_registry(mut self, registry: AttachedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// A fresh resolver over the catalog and the base symbols.
    ///
    /// Anything it constructs is cached in its own table, not in the base.
    pub fn resolver(&self) -> DependencyResolver {
        DependencyResolver::with_symbols(Arc::clone(&self.catalog), self.base.clone())
    }

    pub fn registry(&self) -> Option<&AttachedRegistry> {
        self.registry.as_ref()
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.factories
    }

    pub fn base_symbols(&self) -> &SymbolTable {
        &self.base
    }

    /// Replace the base symbols, here and in every registered set.
    pub fn set_base_symbols(&mut self, symbols: SymbolTable) {
        for set in &mut self.sets {
            set.set_base_symbols(symbols.clone());
        }
        self.base = symbols;
    }

    /// Build and register every set in `spec`, in document order.
    ///
    /// A record that fails leaves nothing of itself registered; sets
    /// imported before it stay.
    pub fn import(&mut self, spec: &ImportSpec) -> Result<()> {
        for (identifier, record) in spec.iter() {
            if let Err(err) = self.import_record(identifier, record) {
                warn!(
                    event = event_names::PHASE_ABORTED,
                    phase = %Phase::Import,
                    composite = %self.key,
                    identifier,
                    error = %err,
                    "import aborted"
                );
                return Err(err);
            }
        }

        info!(
            event = event_names::IMPORT_FINISHED,
            phase = %Phase::Import,
            composite = %self.key,
            sets = self.sets.len(),
            "import finished"
        );
        Ok(())
    }

    /// Decode a JSON specification and import it.
    pub fn import_value(&mut self, value: Json) -> Result<()> {
        let spec = ImportSpec::from_value(value)?;
        self.import(&spec)
    }

    fn import_record(&mut self, identifier: &str, record: &SetRecord) -> Result<()> {
        let (Some(name), Some(location), Some(token)) = (
            record.name.as_deref().filter(|s| !s.is_empty()),
            record.config_path.as_deref().filter(|s| !s.is_empty()),
            record.priority.as_ref(),
        ) else {
            return Err(Error::RequiredParametersMissing {
                set: identifier.to_string(),
                missing: record.missing_fields(),
            });
        };
        let priority = token.resolve()?;
        if self.contains(name) {
            return Err(Error::DuplicateSet { key: name.to_string() });
        }

        let seed = SetSeed {
            key: name.to_string(),
            source: self.factories.build_source(location)?,
            registry: self.registry.clone(),
            catalog: Arc::clone(&self.catalog),
        };
        let mut set = self.factories.build_set(identifier, seed)?;
        set.set_priority(priority);
        for (unit_id, unit_record) in &record.units {
            set.insert_record(&self.factories, unit_id, unit_record)?;
        }

        info!(
            event = event_names::SET_IMPORTED,
            phase = %Phase::Import,
            composite = %self.key,
            identifier,
            set = name,
            priority = %priority,
            units = set.len(),
            "set imported"
        );
        self.insert_set(set)
    }

    /// Register a set. Fails with `DuplicateSet` when its key is taken.
    ///
    /// The set's base symbols are replaced by the composite's.
    pub fn insert_set(&mut self, mut set: Set) -> Result<()> {
        if self.contains(set.key()) {
            return Err(Error::DuplicateSet {
                key: set.key().to_string(),
            });
        }
        set.set_base_symbols(self.base.clone());
        self.sets.push(set);
        self.sets.sort_by_key(Set::priority);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&Set> {
        self.sets
            .iter()
            .find(|set| set.key() == key)
            .ok_or_else(|| Error::SetNotFound { key: key.to_string() })
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Set> {
        self.sets
            .iter_mut()
            .find(|set| set.key() == key)
            .ok_or_else(|| Error::SetNotFound { key: key.to_string() })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sets.iter().any(|set| set.key() == key)
    }

    /// Sets in execution order.
    pub fn sets(&self) -> impl Iterator<Item = &Set> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Load every set not yet loaded, in priority order. Stops at the first
    /// failing set.
    pub fn load_all(&mut self) -> Result<()> {
        for set in self.sets.iter_mut().filter(|set| !set.is_loaded()) {
            debug!(composite = %self.key, set = %set.key(), "loading set");
            if let Err(err) = set.load(Vec::new()) {
                warn!(
                    event = event_names::PHASE_ABORTED,
                    phase = %Phase::Load,
                    composite = %self.key,
                    set = %set.key(),
                    error = %err,
                    "load aborted"
                );
                return Err(err);
            }
        }

        info!(
            event = event_names::LOAD_FINISHED,
            phase = %Phase::Load,
            composite = %self.key,
            sets = self.sets.len(),
            "load finished"
        );
        Ok(())
    }

    /// Configure every set not yet configured, in priority order. Stops at
    /// the first failing set.
    pub fn configure(&mut self) -> Result<()> {
        for set in self.sets.iter_mut().filter(|set| !set.is_configured()) {
            debug!(composite = %self.key, set = %set.key(), "configuring set");
            if let Err(err) = set.configure() {
                warn!(
                    event = event_names::PHASE_ABORTED,
                    phase = %Phase::Configure,
                    composite = %self.key,
                    set = %set.key(),
                    error = %err,
                    "configure aborted"
                );
                return Err(err);
            }
        }

        info!(
            event = event_names::CONFIGURE_FINISHED,
            phase = %Phase::Configure,
            composite = %self.key,
            sets = self.sets.len(),
            "configure finished"
        );
        Ok(())
    }

    /// Look up `path` inside the set `set_key`, or return `default` when
    /// there is no such set.
    pub fn find<'a>(&'a self, set_key: &str, path: &str, default: Lookup<'a>) -> Lookup<'a> {
        match self.get(set_key) {
            Ok(set) => set.find(path),
            Err(_) => default,
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            key: self.key.clone(),
            sets: self.sets.iter().map(Set::snapshot).collect(),
            taken_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::UnitRecord;
    use crate::unit::UnitAction;
    use lw_common::Priority;
    use lw_symbols::Arguments;
    use serde_json::json;

    struct Noop;

    impl UnitAction for Noop {
        fn apply(&mut self, _args: &Arguments) -> Result<()> {
            Ok(())
        }
    }

    fn composite() -> Composite {
        let mut factories = FactoryRegistry::new();
        factories.register_unit("noop", |_: &UnitRecord| Box::new(Noop) as Box<dyn UnitAction>);
        Composite::new("app").with_factories(factories)
    }

    #[test]
    fn test_import_orders_sets_by_priority() {
        let mut app = composite();
        app.import_value(json!({
            "late": {"name": "late", "config_path": "l", "priority": "low"},
            "early": {"name": "early", "config_path": "e", "priority": "high"},
            "middle": {"name": "middle", "config_path": "m", "priority": 0}
        }))
        .unwrap();

        let keys: Vec<_> = app.sets().map(Set::key).collect();
        assert_eq!(keys, vec!["early", "middle", "late"]);
        assert_eq!(app.get("early").unwrap().priority(), Priority::HIGH);
    }

    #[test]
    fn test_required_parameters_missing() {
        let mut app = composite();
        let err = app
            .import_value(json!({"views": {"name": "views", "priority": "high"}}))
            .unwrap_err();
        assert_eq!(
            err,
            Error::RequiredParametersMissing {
                set: "views".into(),
                missing: vec!["config_path"],
            }
        );
        assert!(app.is_empty());
    }

    #[test]
    fn test_failed_unit_leaves_set_unregistered() {
        let mut app = composite();
        let err = app
            .import_value(json!({
                "views": {"name": "views", "config_path": "v", "priority": "high",
                          "config": {"noop": {}, "ghost": {}}}
            }))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownImplementation { kind: "unit", .. }));
        assert!(!app.contains("views"));
    }

    #[test]
    fn test_find_falls_back_to_default() {
        let mut app = composite();
        app.import_value(json!({"views": {"name": "views", "config_path": "v", "priority": 1}}))
            .unwrap();
        assert_eq!(app.find("views", "", Lookup::Missing).as_set().unwrap().key(), "views");
        assert!(app.find("nope", "a.b", Lookup::Missing).is_missing());
    }

    #[test]
    fn test_base_symbols_propagate() {
        let mut app = composite();
        app.import_value(json!({"views": {"name": "views", "config_path": "v", "priority": 1}}))
            .unwrap();
        let mut base = SymbolTable::new();
        base.define("env", "prod");
        app.set_base_symbols(base);
        assert!(app.base_symbols().contains("env"));
        assert!(app.get("views").unwrap().base_symbols().contains("env"));
        assert!(matches!(app.get_mut("other"), Err(Error::SetNotFound { .. })));

        let direct = Set::new("direct", Arc::new(crate::source::MemorySource::empty("d")));
        app.insert_set(direct).unwrap();
        assert!(app.get("direct").unwrap().base_symbols().contains("env"));
    }

    struct Clock {
        zone: String,
    }

    impl lw_symbols::Injectable for Clock {
        const TYPE_NAME: &'static str = "Clock";

        fn dependencies() -> Vec<lw_symbols::Param> {
            vec![lw_symbols::Param::string("zone")]
        }

        fn construct(args: &Arguments) -> Result<Self> {
            Ok(Self {
                zone: args.string("zone")?.to_string(),
            })
        }
    }

    #[test]
    fn test_resolver_sees_base_symbols() {
        let mut catalog = TypeCatalog::new();
        catalog.register::<Clock>();
        let mut app = Composite::with_catalog("app", Arc::new(catalog));
        let mut base = SymbolTable::new();
        base.define("zone", "Europe/Paris");
        app.set_base_symbols(base);

        let mut resolver = app.resolver();
        assert_eq!(resolver.obtain::<Clock>().unwrap().zone, "Europe/Paris");
        assert!(!app.base_symbols().contains("Clock"));
    }
}

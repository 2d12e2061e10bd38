//! Constructors for sets, units and data sources, looked up by
//! implementation identifier during a declarative import.

use indexmap::IndexMap;
use lw_common::{Error, Result};
use lw_symbols::TypeCatalog;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::container::AttachedRegistry;
use crate::import::UnitRecord;
use crate::set::Set;
use crate::source::{DataSource, MemorySource, SourceLibrary};
use crate::unit::{Unit, UnitAction};

/// Everything a set factory gets to build one set from.
pub struct SetSeed {
    /// The set's key (the record's `name`).
    pub key: String,
    /// A fresh data source bound to the record's `config_path`.
    pub source: Arc<dyn DataSource>,
    /// The registry the importing composite carries, if any.
    pub registry: Option<AttachedRegistry>,
    pub catalog: Arc<TypeCatalog>,
}

impl SetSeed {
    /// The plain set this seed describes.
    pub fn into_set(self) -> Set {
        let set = Set::new(self.key, self.source).with_catalog(self.catalog);
        match self.registry {
            Some(registry) => set.with_registry(registry),
            None => set,
        }
    }
}

pub type SetFactory = Arc<dyn Fn(SetSeed) -> Result<Set> + Send + Sync>;
pub type UnitFactory = Arc<dyn Fn(&UnitRecord) -> Box<dyn UnitAction> + Send + Sync>;
pub type SourceFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn DataSource>> + Send + Sync>;

/// Identifier-keyed constructors, populated by the host at startup.
#[derive(Clone)]
pub struct FactoryRegistry {
    sets: IndexMap<String, SetFactory>,
    units: IndexMap<String, UnitFactory>,
    source: SourceFactory,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self {
            sets: IndexMap::new(),
            units: IndexMap::new(),
            source: Arc::new(|location: &str| -> Result<Arc<dyn DataSource>> {
                Ok(Arc::new(MemorySource::empty(location)))
            }),
        }
    }
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set implementation.
    pub fn register_set(
        &mut self,
        identifier: impl Into<String>,
        factory: impl Fn(SetSeed) -> Result<Set> + Send + Sync + 'static,
    ) -> &mut Self {
        self.sets.insert(identifier.into(), Arc::new(factory));
        self
    }

    /// Register a unit implementation.
    pub fn register_unit(
        &mut self,
        identifier: impl Into<String>,
        factory: impl Fn(&UnitRecord) -> Box<dyn UnitAction> + Send + Sync + 'static,
    ) -> &mut Self {
        self.units.insert(identifier.into(), Arc::new(factory));
        self
    }

    /// Replace how data sources are built from `config_path` locations.
    pub fn set_source_factory(
        &mut self,
        factory: impl Fn(&str) -> Result<Arc<dyn DataSource>> + Send + Sync + 'static,
    ) -> &mut Self {
        self.source = Arc::new(factory);
        self
    }

    /// Serve data sources from an in-memory library.
    pub fn use_library(&mut self, library: SourceLibrary) -> &mut Self {
        self.set_source_factory(move |location| Ok(library.open(location)))
    }

    pub fn has_set(&self, identifier: &str) -> bool {
        self.sets.contains_key(identifier)
    }

    pub fn has_unit(&self, identifier: &str) -> bool {
        self.units.contains_key(identifier)
    }

    pub fn build_source(&self, location: &str) -> Result<Arc<dyn DataSource>> {
        (self.source)(location)
    }

    /// Build a set. Unknown identifiers produce the plain set.
    pub fn build_set(&self, identifier: &str, seed: SetSeed) -> Result<Set> {
        match self.sets.get(identifier) {
            Some(factory) => factory(seed),
            None => {
                debug!(identifier, "no set implementation registered, using the plain set");
                Ok(seed.into_set())
            }
        }
    }

    /// Build a unit from its record. Unknown identifiers fail with
    /// `UnknownImplementation`.
    pub fn build_unit(&self, identifier: &str, record: &UnitRecord) -> Result<Unit> {
        let factory = self.units.get(identifier).ok_or_else(|| Error::UnknownImplementation {
            kind: "unit",
            id: identifier.to_string(),
        })?;
        let priority = match &record.priority {
            Some(token) => token.resolve()?,
            None => Default::default(),
        };
        Ok(Unit::from_boxed(record.key_for(identifier), factory(record))
            .with_dataset(record.dataset.clone())
            .with_priority(priority)
            .with_settings(record.config.clone()))
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("sets", &self.sets.keys().collect::<Vec<_>>())
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use lw_common::Priority;
    use lw_symbols::Arguments;
    use serde_json::json;

    struct Noop;

    impl UnitAction for Noop {
        fn apply(&mut self, _args: &Arguments) -> Result<()> {
            Ok(())
        }
    }

    fn seed(key: &str) -> SetSeed {
        SetSeed {
            key: key.to_string(),
            source: Arc::new(MemorySource::empty("mem")),
            registry: None,
            catalog: Arc::new(TypeCatalog::new()),
        }
    }

    #[test]
    fn test_unknown_set_falls_back_to_plain_set() {
        let factories = FactoryRegistry::new();
        let set = factories.build_set("whatever", seed("app")).unwrap();
        assert_eq!(set.key(), "app");
        assert!(set.registry().is_none());
    }

    #[test]
    fn test_registered_set_factory_can_attach_registry() {
        let mut factories = FactoryRegistry::new();
        factories.register_set("memory", |seed: SetSeed| {
            let registry = AttachedRegistry::container("MemoryContainer", Arc::new(MemoryContainer::new()));
            Ok(seed.into_set().with_registry(registry))
        });
        assert!(factories.has_set("memory"));
        let set = factories.build_set("memory", seed("app")).unwrap();
        assert_eq!(set.registry().unwrap().type_name(), "MemoryContainer");
    }

    #[test]
    fn test_build_unit_from_record() {
        let mut factories = FactoryRegistry::new();
        factories.register_unit("noop", |_: &UnitRecord| Box::new(Noop) as Box<dyn UnitAction>);

        let mut config = crate::source::Settings::new();
        config.insert("debug".into(), json!(true));
        let record = UnitRecord::new("blade")
            .dataset("view.blade")
            .priority("high")
            .config(config);

        let unit = factories.build_unit("noop", &record).unwrap();
        assert_eq!(unit.key(), "blade");
        assert_eq!(unit.dataset(), "view.blade");
        assert_eq!(unit.priority(), Priority::HIGH);
        assert_eq!(unit.settings()["debug"], json!(true));

        let unnamed = factories.build_unit("noop", &UnitRecord::default()).unwrap();
        assert_eq!(unnamed.key(), "noop");
        assert_eq!(unnamed.priority(), Priority::NORMAL);
    }

    #[test]
    fn test_unknown_unit_and_bad_priority() {
        let mut factories = FactoryRegistry::new();
        let err = factories.build_unit("missing", &UnitRecord::new("x")).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownImplementation {
                kind: "unit",
                id: "missing".into(),
            }
        );

        factories.register_unit("noop", |_: &UnitRecord| Box::new(Noop) as Box<dyn UnitAction>);
        let err = factories
            .build_unit("noop", &UnitRecord::new("x").priority("urgent"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPriorityToken { .. }));
    }

    #[test]
    fn test_library_source_factory() {
        let mut doc = crate::source::Settings::new();
        doc.insert("db".into(), json!({"host": "h"}));
        let mut factories = FactoryRegistry::new();
        factories.use_library(SourceLibrary::new().with("config/app", doc));

        let source = factories.build_source("config/app").unwrap();
        assert_eq!(source.read("db").unwrap()["host"], json!("h"));
        assert!(factories.build_source("elsewhere").unwrap().read("db").is_err());
    }
}

//! No-mock pipeline tests.
//!
//! Covers:
//! - Declarative import into a composite with in-memory data sources
//! - Load and configure order, idempotence and fail-fast
//! - Capabilities resolved into unit `apply` calls
//! - Lookups and snapshots

use lw_common::{Error, Priority, Result};
use lw_core::capability::{self, CapabilityArgs};
use lw_core::{
    AttachedRegistry, Composite, Container, FactoryRegistry, ImportSpec, Lookup, MemoryContainer,
    MemorySource, Set, SetRecord, SourceLibrary, Unit, UnitAction, UnitRecord, UnitState,
};
use lw_symbols::{Arguments, Injectable, Param, SymbolTable, TypeCatalog};
use serde_json::{json, Map, Value as Json};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<String>>>;

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

fn doc(value: Json) -> Map<String, Json> {
    match value {
        Json::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Records its name on apply and publishes its settings into the container.
struct Publish {
    journal: Journal,
}

impl UnitAction for Publish {
    fn dependencies(&self) -> Vec<Param> {
        vec![
            Param::string("name"),
            capability::config(),
            capability::container("registry"),
        ]
    }

    fn apply(&mut self, args: &Arguments) -> Result<()> {
        let name = args.string("name")?;
        let registry = args.container("registry")?;
        registry.set(name, Json::Object(args.map("config")?.clone()).into());
        self.journal.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Asks for something nothing provides.
struct Needy {
    journal: Journal,
}

impl UnitAction for Needy {
    fn dependencies(&self) -> Vec<Param> {
        vec![Param::string("name"), Param::string("secret")]
    }

    fn apply(&mut self, args: &Arguments) -> Result<()> {
        self.journal.lock().unwrap().push(args.string("name")?.to_string());
        Ok(())
    }
}

fn factories(journal: &Journal) -> FactoryRegistry {
    let mut factories = FactoryRegistry::new();
    let publish = Arc::clone(journal);
    factories.register_unit("publish", move |_: &UnitRecord| {
        Box::new(Publish {
            journal: Arc::clone(&publish),
        }) as Box<dyn UnitAction>
    });
    let needy = Arc::clone(journal);
    factories.register_unit("needy", move |_: &UnitRecord| {
        Box::new(Needy {
            journal: Arc::clone(&needy),
        }) as Box<dyn UnitAction>
    });
    factories.use_library(SourceLibrary::new().with(
        "config/web",
        doc(json!({
            "view": {"cache": true, "paths": {"blade": "/tpl"}},
            "router": {"prefix": "/api"}
        })),
    ));
    factories
}

fn web_spec() -> ImportSpec {
    ImportSpec::new().set(
        "generic",
        SetRecord::new("web", "config/web", "high")
            .unit("needy", UnitRecord::new("B").priority("normal"))
            .unit("publish", UnitRecord::new("A").dataset("view").priority("high")),
    )
}

fn composite(journal: &Journal, registry: &Arc<MemoryContainer>) -> Composite {
    Composite::new("app")
        .with_factories(factories(journal))
        .with_registry(AttachedRegistry::container(
            "MemoryContainer",
            Arc::clone(registry),
        ))
}

#[test]
fn test_end_to_end_order_and_idempotence() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);

    // B's missing "secret" comes from the base symbols.
    let mut base = SymbolTable::new();
    base.define("secret", "s3cr3t");
    app.set_base_symbols(base);

    app.import(&web_spec()).unwrap();
    app.load_all().unwrap();
    app.configure().unwrap();
    assert_eq!(entries(&journal), vec!["A", "B"]);

    app.load_all().unwrap();
    app.configure().unwrap();
    assert_eq!(entries(&journal), vec!["A", "B"]);

    let web = app.get("web").unwrap();
    assert!(web.is_loaded() && web.is_configured());
    assert_eq!(web.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(
        registry.get("A").unwrap().as_map().unwrap()["cache"],
        json!(true)
    );
}

#[test]
fn test_fail_fast_leaves_later_units_untouched() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&ImportSpec::new().set(
        "generic",
        SetRecord::new("web", "config/web", "high")
            .unit("needy", UnitRecord::new("A").priority("high"))
            .unit("publish", UnitRecord::new("B").priority("normal")),
    ))
    .unwrap();
    app.load_all().unwrap();

    let err = app.configure().unwrap_err();
    assert_eq!(
        err,
        Error::CannotResolveDependency {
            parameter: "secret".into(),
            target: "A::apply".into(),
        }
    );
    assert!(entries(&journal).is_empty());

    let web = app.get("web").unwrap();
    assert!(!web.get("A").unwrap().is_configured());
    assert!(!web.get("B").unwrap().is_configured());
    assert!(!web.is_configured());
    assert!(!registry.has("B"));
}

#[test]
fn test_corrected_rerun_does_not_redo_work() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&web_spec()).unwrap();
    app.load_all().unwrap();

    assert!(app.configure().is_err());
    assert_eq!(entries(&journal), vec!["A"]);

    let mut base = SymbolTable::new();
    base.define("secret", "late");
    app.set_base_symbols(base);
    app.configure().unwrap();
    assert_eq!(entries(&journal), vec!["A", "B"]);
}

#[test]
fn test_base_symbols_changed_after_import_reach_units() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&web_spec()).unwrap();

    let mut base = SymbolTable::new();
    base.define("secret", "s");
    app.set_base_symbols(base);
    assert!(app.get("web").unwrap().base_symbols().contains("secret"));

    app.load_all().unwrap();
    app.configure().unwrap();
    assert_eq!(entries(&journal), vec!["A", "B"]);
}

#[test]
fn test_failing_set_aborts_later_sets() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(
        &ImportSpec::new()
            .set(
                "last",
                SetRecord::new("last", "config/web", "low").unit("publish", UnitRecord::new("C")),
            )
            .set(
                "middle",
                SetRecord::new("middle", "config/web", "normal").unit("needy", UnitRecord::new("B")),
            )
            .set(
                "first",
                SetRecord::new("first", "config/web", "high").unit("publish", UnitRecord::new("A")),
            ),
    )
    .unwrap();
    let keys: Vec<_> = app.sets().map(Set::key).collect();
    assert_eq!(keys, vec!["first", "middle", "last"]);

    app.load_all().unwrap();
    let err = app.configure().unwrap_err();
    assert!(matches!(err, Error::CannotResolveDependency { .. }));
    assert_eq!(entries(&journal), vec!["A"]);
    assert!(app.get("first").unwrap().is_configured());
    assert!(!app.get("middle").unwrap().is_configured());
    let last = app.get("last").unwrap();
    assert!(!last.is_configured());
    assert_eq!(last.get("C").unwrap().state(), UnitState::Loaded);
    assert!(!registry.has("C"));

    let mut base = SymbolTable::new();
    base.define("secret", "s");
    app.set_base_symbols(base);
    app.configure().unwrap();
    assert_eq!(entries(&journal), vec!["A", "B", "C"]);
    assert!(app.sets().all(Set::is_configured));
}

#[test]
fn test_failing_load_aborts_later_sets() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import_value(json!({
        "first": {"name": "first", "config_path": "config/web", "priority": "high",
                  "config": {"publish": {"name": "A", "dataset": "view"}}},
        "middle": {"name": "middle", "config_path": "config/web", "priority": "normal",
                   "config": {"publish": {"name": "B", "dataset": "mail"}}},
        "last": {"name": "last", "config_path": "config/web", "priority": "low",
                 "config": {"publish": {"name": "C", "dataset": "router"}}}
    }))
    .unwrap();

    assert!(matches!(app.load_all(), Err(Error::ConfigNotFound { .. })));
    assert!(app.get("first").unwrap().is_loaded());
    assert!(!app.get("middle").unwrap().is_loaded());
    assert!(!app.get("last").unwrap().is_loaded());
    assert_eq!(app.get("last").unwrap().get("C").unwrap().state(), UnitState::Registered);
}

#[test]
fn test_load_merges_under_explicit_settings() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&ImportSpec::new().set(
        "generic",
        SetRecord::new("web", "config/web", 0i64).unit(
            "publish",
            UnitRecord::new("view")
                .dataset("view")
                .config(doc(json!({"cache": false}))),
        ),
    ))
    .unwrap();
    app.load_all().unwrap();

    let unit = app.get("web").unwrap().get("view").unwrap();
    assert_eq!(unit.settings()["cache"], json!(false));
    assert_eq!(unit.settings()["paths"]["blade"], json!("/tpl"));
}

#[test]
fn test_missing_dataset_aborts_load() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&ImportSpec::new().set(
        "generic",
        SetRecord::new("web", "config/web", "low")
            .unit("publish", UnitRecord::new("gone").dataset("mail")),
    ))
    .unwrap();

    let err = app.load_all().unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
    assert!(!app.get("web").unwrap().is_loaded());
}

#[test]
fn test_duplicate_set_and_unit() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&web_spec()).unwrap();

    let err = app.import(&web_spec()).unwrap_err();
    assert_eq!(err, Error::DuplicateSet { key: "web".into() });
    assert_eq!(app.len(), 1);

    let err = app
        .import_value(json!({
            "generic": {"name": "mail", "config_path": "config/mail", "priority": "low",
                        "config": {"publish": {"name": "x"}, "needy": {"name": "x"}}}
        }))
        .unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateUnit {
            set: "mail".into(),
            key: "x".into(),
        }
    );
    assert!(!app.contains("mail"));
}

#[test]
fn test_required_parameters_and_bad_tokens() {
    let mut app = Composite::new("app");
    let err = app
        .import_value(json!({"generic": {"config_path": "config/web"}}))
        .unwrap_err();
    assert_eq!(
        err,
        Error::RequiredParametersMissing {
            set: "generic".into(),
            missing: vec!["name", "priority"],
        }
    );
    assert_eq!(err.code(), 50);

    let err = app
        .import_value(json!({"generic": {"name": "web", "config_path": "c", "priority": "urgent"}}))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPriorityToken { .. }));
    assert!(app.is_empty());
}

#[test]
fn test_find_through_composite() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&web_spec()).unwrap();
    app.load_all().unwrap();

    let found = app.find("web", "A.paths.blade", Lookup::Missing);
    assert_eq!(found.as_setting(), Some(&json!("/tpl")));
    assert_eq!(app.find("web", "A", Lookup::Missing).as_unit().unwrap().key(), "A");
    assert_eq!(app.find("web", "Z.y", Lookup::Missing).as_set().unwrap().key(), "web");
    assert!(app.find("mail", "A", Lookup::Missing).is_missing());
}

#[test]
fn test_snapshot_reports_states() {
    let journal = Journal::default();
    let registry = Arc::new(MemoryContainer::new());
    let mut app = composite(&journal, &registry);
    app.import(&web_spec()).unwrap();
    app.load_all().unwrap();
    let _ = app.configure();

    let snapshot = app.snapshot();
    let web = snapshot.set("web").unwrap();
    assert_eq!(web.priority, Priority::HIGH);
    assert!(web.loaded);
    assert!(!web.configured);
    assert_eq!(web.keys_in(UnitState::Configured), vec!["A"]);
    assert_eq!(web.keys_in(UnitState::Loaded), vec!["B"]);

    let json: Json = serde_json::from_str(&snapshot.to_json()).unwrap();
    assert_eq!(json["key"], "app");
    assert_eq!(json["sets"][0]["units"][0]["state"], "configured");
    assert!(json["sets"][0]["units"][0]["profile"]["configured"].is_string());
    assert!(json["sets"][0]["units"][1]["profile"]["configured"].is_null());
}

/// A registry factory that pre-registers a unit, like a set bound to a
/// specific container.
#[test]
fn test_set_factory_registers_its_own_units() {
    let journal = Journal::default();
    let mut factories = factories(&journal);
    let own = Arc::new(MemoryContainer::new());
    let publish = Arc::clone(&journal);
    let container = Arc::clone(&own);
    factories.register_set("memory", move |seed| {
        let mut set = seed
            .into_set()
            .with_registry(AttachedRegistry::container("OwnContainer", Arc::clone(&container)));
        set.insert(
            Unit::new(
                "bootstrap",
                Publish {
                    journal: Arc::clone(&publish),
                },
            )
            .with_priority(Priority::new(-1000)),
        )?;
        Ok(set)
    });

    let mut app = Composite::new("app").with_factories(factories);
    app.import_value(json!({
        "memory": {"name": "own", "config_path": "config/web", "priority": "normal",
                   "config": {"publish": {"name": "view", "dataset": "view"}}}
    }))
    .unwrap();
    app.load_all().unwrap();
    app.configure().unwrap();

    assert_eq!(entries(&journal), vec!["bootstrap", "view"]);
    assert!(own.has("bootstrap") && own.has("view"));
    assert_eq!(app.get("own").unwrap().registry().unwrap().type_name(), "OwnContainer");
}

struct Clock {
    zone: String,
}

impl Injectable for Clock {
    const TYPE_NAME: &'static str = "Clock";

    fn dependencies() -> Vec<Param> {
        vec![Param::string("zone").with_default("UTC")]
    }

    fn construct(args: &Arguments) -> Result<Self> {
        Ok(Self {
            zone: args.string("zone")?.to_string(),
        })
    }
}

/// Needs a catalogued service and the running set.
struct Scheduler {
    seen: Arc<Mutex<Option<(String, Vec<String>, String)>>>,
}

impl UnitAction for Scheduler {
    fn dependencies(&self) -> Vec<Param> {
        vec![
            Param::of::<Clock>("clock"),
            capability::set("set"),
            capability::data_source("source"),
        ]
    }

    fn apply(&mut self, args: &Arguments) -> Result<()> {
        let clock = args.instance::<Clock>("clock")?;
        let view = args.set_view("set")?;
        let source = args.data_source("source")?;
        *self.seen.lock().unwrap() = Some((clock.zone.clone(), view.units.clone(), source.location().to_string()));
        Ok(())
    }
}

#[test]
fn test_catalogued_dependencies_and_set_view() {
    let mut catalog = TypeCatalog::new();
    catalog.register::<Clock>();

    let seen = Arc::new(Mutex::new(None));
    let mut set = Set::new("jobs", Arc::new(MemorySource::empty("memory://jobs")))
        .with_catalog(Arc::new(catalog))
        .with_priority(Priority::LOW);
    set.insert(Unit::new(
        "scheduler",
        Scheduler {
            seen: Arc::clone(&seen),
        },
    ))
    .unwrap();

    let mut app = Composite::new("app");
    app.insert_set(set).unwrap();
    app.load_all().unwrap();
    app.configure().unwrap();

    let (zone, units, location) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(zone, "UTC");
    assert_eq!(units, vec!["scheduler".to_string()]);
    assert_eq!(location, "memory://jobs");
}

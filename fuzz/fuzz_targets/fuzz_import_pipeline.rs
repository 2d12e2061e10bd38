//! Fuzz target for importing, loading and configuring arbitrary
//! specifications against an in-memory data source.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lw_core::{Composite, FactoryRegistry, SourceLibrary, UnitAction, UnitRecord};
use lw_symbols::{Arguments, Param};

#[derive(Debug, Arbitrary)]
struct Input {
    spec: String,
    document: String,
}

struct Echo;

impl UnitAction for Echo {
    fn dependencies(&self) -> Vec<Param> {
        vec![Param::string("name"), Param::map("config")]
    }

    fn apply(&mut self, args: &Arguments) -> lw_common::Result<()> {
        args.string("name")?;
        args.map("config")?;
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let Ok(serde_json::Value::Object(document)) = serde_json::from_str(&input.document) else {
        return;
    };
    let Ok(spec) = serde_json::from_str(&input.spec) else {
        return;
    };

    let mut factories = FactoryRegistry::new();
    factories.register_unit("echo", |_: &UnitRecord| Box::new(Echo) as Box<dyn UnitAction>);
    factories.use_library(SourceLibrary::new().with("fuzz", document));

    let mut app = Composite::new("fuzz").with_factories(factories);
    if app.import_value(spec).is_ok() {
        let _ = app.load_all();
        // Units that loaded must apply: name and config are always provided
        if app.sets().all(|set| set.is_loaded()) {
            assert!(app.configure().is_ok());
        }
        let _ = app.snapshot().to_json();
    }
});

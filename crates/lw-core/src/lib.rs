//! Loadwright pipeline.
//!
//! Units are grouped into priority-ordered sets, and sets into a composite
//! built from a declarative specification. A pass moves every unit through
//! `load` (read its dataset from the set's data source) and then
//! `configure` (apply it with dependencies resolved from a per-unit symbol
//! table).
//!
//! ```no_run
//! use lw_core::{Composite, FactoryRegistry, UnitAction, UnitRecord};
//! use lw_symbols::Arguments;
//!
//! struct Views;
//!
//! impl UnitAction for Views {
//!     fn apply(&mut self, _args: &Arguments) -> lw_common::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut factories = FactoryRegistry::new();
//! factories.register_unit("views", |_: &UnitRecord| Box::new(Views) as Box<dyn UnitAction>);
//!
//! let mut app = Composite::new("app").with_factories(factories);
//! app.import_value(serde_json::json!({
//!     "generic": {"name": "web", "config_path": "config/web", "priority": "high",
//!                 "config": {"views": {"dataset": "view"}}}
//! }))?;
//! app.load_all()?;
//! app.configure()?;
//! # Ok::<(), lw_common::Error>(())
//! ```

pub mod capability;
pub mod composite;
pub mod container;
pub mod factory;
pub mod import;
pub mod logging;
pub mod set;
pub mod snapshot;
pub mod source;
pub mod unit;

pub use capability::CapabilityArgs;
pub use composite::Composite;
pub use container::{AttachedRegistry, Container, MemoryContainer};
pub use factory::{FactoryRegistry, SetSeed};
pub use import::{ImportSpec, SetRecord, UnitRecord};
pub use logging::{init_default_logging, init_logging, try_init_logging, LogConfig, LogFormat, LogLevel};
pub use set::{Lookup, Set, SetView};
pub use snapshot::{PipelineSnapshot, SetSnapshot, UnitSnapshot};
pub use source::{DataSource, MemorySource, Settings, SourceLibrary};
pub use unit::{Unit, UnitAction, UnitProfile, UnitState};

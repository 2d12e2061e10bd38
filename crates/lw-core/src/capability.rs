//! Names under which a set exposes its collaborators to units, and typed
//! access to them from resolved arguments.

use lw_common::Result;
use lw_symbols::{Arguments, Param};
use std::sync::Arc;

use crate::container::Container;
use crate::set::SetView;
use crate::source::DataSource;

/// The set's data source.
pub const DATA_SOURCE: &str = "DataSource";
/// A read-only view of the set running the unit.
pub const SET: &str = "Set";
/// The generic registry capability, when the attached registry has it.
pub const CONTAINER: &str = "Container";
/// The unit's resolved settings.
pub const CONFIG: &str = "config";
/// The unit's key.
pub const NAME: &str = "name";
/// The unit's dataset key.
pub const DATASET: &str = "dataset";

/// Parameter asking for the set's data source.
pub fn data_source(name: &'static str) -> Param {
    Param::named(name, DATA_SOURCE)
}

/// Parameter asking for the generic registry.
pub fn container(name: &'static str) -> Param {
    Param::named(name, CONTAINER)
}

/// Parameter asking for the running set.
pub fn set(name: &'static str) -> Param {
    Param::named(name, SET)
}

/// Parameter asking for the unit's settings.
pub fn config() -> Param {
    Param::map(CONFIG)
}

/// Typed access to capabilities in resolved arguments.
pub trait CapabilityArgs {
    fn data_source(&self, name: &str) -> Result<Arc<dyn DataSource>>;
    fn container(&self, name: &str) -> Result<Arc<dyn Container>>;
    fn set_view(&self, name: &str) -> Result<Arc<SetView>>;
}

impl CapabilityArgs for Arguments {
    fn data_source(&self, name: &str) -> Result<Arc<dyn DataSource>> {
        self.instance::<Arc<dyn DataSource>>(name)
            .map(|source| Arc::clone(&*source))
    }

    fn container(&self, name: &str) -> Result<Arc<dyn Container>> {
        self.instance::<Arc<dyn Container>>(name)
            .map(|container| Arc::clone(&*container))
    }

    fn set_view(&self, name: &str) -> Result<Arc<SetView>> {
        self.instance::<SetView>(name)
    }
}

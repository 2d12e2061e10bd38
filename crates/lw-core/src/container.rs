//! External registries units can wire values into.

use indexmap::IndexMap;
use lw_common::{Error, Result};
use lw_symbols::{Instance, Value};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Generic key-value registry capability.
///
/// Writes go through `&self` so one registry can be shared by every unit of
/// a set.
pub trait Container: Send + Sync {
    /// Fails with `ContainerEntryNotFound` when `id` is unset.
    fn get(&self, id: &str) -> Result<Value>;

    fn has(&self, id: &str) -> bool;

    fn set(&self, id: &str, value: Value);
}

/// In-process [`Container`] backed by an ordered map.
#[derive(Default)]
pub struct MemoryContainer {
    entries: RwLock<IndexMap<String, Value>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Container for MemoryContainer {
    fn get(&self, id: &str) -> Result<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ContainerEntryNotFound { id: id.to_string() })
    }

    fn has(&self, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    fn set(&self, id: &str, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), value);
    }
}

impl fmt::Debug for MemoryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContainer").field("ids", &self.ids()).finish()
    }
}

/// A registry attached to a set or composite.
///
/// Units can ask for it by its concrete type name, and additionally as
/// `Container` when it offers the generic capability.
#[derive(Clone)]
pub struct AttachedRegistry {
    concrete: Instance,
    generic: Option<Arc<dyn Container>>,
}

impl AttachedRegistry {
    /// Attach a registry that implements [`Container`].
    pub fn container<C: Container + Any>(type_name: impl Into<Cow<'static, str>>, registry: Arc<C>) -> Self {
        let generic: Arc<dyn Container> = registry.clone();
        Self {
            concrete: Instance::from_arc(type_name, registry),
            generic: Some(generic),
        }
    }

    /// Attach a registry known only by its concrete type.
    pub fn opaque(concrete: Instance) -> Self {
        Self {
            concrete,
            generic: None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.concrete.type_name()
    }

    pub fn concrete(&self) -> &Instance {
        &self.concrete
    }

    pub fn generic(&self) -> Option<&Arc<dyn Container>> {
        self.generic.as_ref()
    }
}

impl fmt::Debug for AttachedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedRegistry")
            .field("type_name", &self.type_name())
            .field("generic", &self.generic.is_some())
            .finish()
    }
}

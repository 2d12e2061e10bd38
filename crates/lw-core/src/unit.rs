//! Configuration units.
//!
//! A unit moves through `Registered -> Loaded -> Configured`. Both
//! transitions are idempotent and stamped with the time they succeeded.

use chrono::{DateTime, Utc};
use lw_common::{Priority, Result};
use lw_symbols::{Arguments, DependencyResolver, Param, SymbolTable, TypeCatalog};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::logging::{event_names, Phase};
use crate::source::{DataSource, Settings};

/// Behaviour behind a unit.
pub trait UnitAction: Send {
    /// Parameters `apply` needs, resolved fresh on every configure.
    fn dependencies(&self) -> Vec<Param> {
        Vec::new()
    }

    /// Wire the unit's settings into whatever it configures.
    fn apply(&mut self, args: &Arguments) -> Result<()>;

    /// Settings to merge into the unit during `load`.
    ///
    /// Reads `dataset` from `source`; an empty dataset key loads nothing.
    fn load(&mut self, dataset: &str, source: &dyn DataSource) -> Result<Settings> {
        if dataset.is_empty() {
            return Ok(Settings::new());
        }
        source.read(dataset)
    }
}

/// Lifecycle state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Registered,
    Loaded,
    Configured,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Registered => write!(f, "registered"),
            UnitState::Loaded => write!(f, "loaded"),
            UnitState::Configured => write!(f, "configured"),
        }
    }
}

/// When a unit was added to a set, loaded and configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub added: Option<DateTime<Utc>>,
    pub loaded: Option<DateTime<Utc>>,
    pub configured: Option<DateTime<Utc>>,
}

/// A named, prioritized, two-phase configuration action.
pub struct Unit {
    key: String,
    dataset: String,
    priority: Priority,
    settings: Settings,
    profile: UnitProfile,
    action: Box<dyn UnitAction>,
}

impl Unit {
    pub fn new(key: impl Into<String>, action: impl UnitAction + 'static) -> Self {
        Self::from_boxed(key, Box::new(action))
    }

    pub fn from_boxed(key: impl Into<String>, action: Box<dyn UnitAction>) -> Self {
        Self {
            key: key.into(),
            dataset: String::new(),
            priority: Priority::NORMAL,
            settings: Settings::new(),
            profile: UnitProfile::default(),
            action,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Explicit settings. These win over anything loaded later.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn profile(&self) -> &UnitProfile {
        &self.profile
    }

    pub fn is_loaded(&self) -> bool {
        self.profile.loaded.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.profile.configured.is_some()
    }

    pub fn state(&self) -> UnitState {
        if self.is_configured() {
            UnitState::Configured
        } else if self.is_loaded() {
            UnitState::Loaded
        } else {
            UnitState::Registered
        }
    }

    /// Only meaningful before the unit is inserted into a set, which orders
    /// units at insertion time.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Stamp the moment the unit joined a set.
    pub(crate) fn mark_added(&mut self) {
        self.profile.added = Some(Utc::now());
    }

    pub fn set_dataset(&mut self, dataset: impl Into<String>) {
        self.dataset = dataset.into();
    }

    /// Add entries not already present. Existing keys are kept.
    pub fn merge_settings(&mut self, settings: Settings) {
        for (key, value) in settings {
            self.settings.entry(key).or_insert(value);
        }
    }

    /// Read this unit's dataset and merge it under the existing settings.
    pub fn load(&mut self, source: &dyn DataSource) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let loaded = self.action.load(&self.dataset, source)?;
        self.merge_settings(loaded);
        self.profile.loaded = Some(Utc::now());

        debug!(
            event = event_names::UNIT_LOADED,
            phase = %Phase::Load,
            unit = %self.key,
            dataset = %self.dataset,
            settings = self.settings.len(),
            "unit loaded"
        );
        Ok(())
    }

    /// Apply this unit with arguments resolved from `symbols`.
    pub fn configure(&mut self, symbols: SymbolTable, catalog: Arc<TypeCatalog>) -> Result<()> {
        let mut resolver = DependencyResolver::with_symbols(catalog, symbols);
        self.configure_with(&mut resolver)
    }

    /// Apply this unit through an existing resolver.
    ///
    /// On failure the unit stays unconfigured and the error is returned as is.
    pub fn configure_with(&mut self, resolver: &mut DependencyResolver) -> Result<()> {
        if self.is_configured() {
            return Ok(());
        }

        let target = format!("{}::apply", self.key);
        let params = self.action.dependencies();
        resolver.invoke_with(&target, self.action.as_mut(), &params, |action, args| {
            action.apply(args)
        })?;
        self.profile.configured = Some(Utc::now());

        debug!(
            event = event_names::UNIT_CONFIGURED,
            phase = %Phase::Configure,
            unit = %self.key,
            "unit configured"
        );
        Ok(())
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("key", &self.key)
            .field("dataset", &self.dataset)
            .field("priority", &self.priority)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

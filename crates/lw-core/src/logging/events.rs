//! Pipeline phases and the event names logged at their boundaries.

use serde::{Deserialize, Serialize};

/// Phases a pipeline pass can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building sets and units from a declarative specification.
    Import,
    /// Reading datasets into unit settings.
    Load,
    /// Applying units against their resolved dependencies.
    Configure,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Import => "import",
            Phase::Load => "load",
            Phase::Configure => "configure",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names, emitted as the `event` field.
pub mod event_names {
    pub const SET_IMPORTED: &str = "import.set";
    pub const IMPORT_FINISHED: &str = "import.finished";

    pub const UNIT_LOADED: &str = "load.unit";
    pub const SET_LOADED: &str = "load.set";
    pub const LOAD_FINISHED: &str = "load.finished";

    pub const UNIT_CONFIGURED: &str = "configure.unit";
    pub const SET_CONFIGURED: &str = "configure.set";
    pub const CONFIGURE_FINISHED: &str = "configure.finished";

    pub const PHASE_ABORTED: &str = "phase.aborted";
}

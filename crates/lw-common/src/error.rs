//! Error types for Loadwright.
//!
//! Every failure in the pipeline is raised where it is detected and returned
//! through the enclosing phase call (`load`, `configure`, `import`). Nothing is
//! retried. Each error carries:
//! - A stable error code for machine parsing
//! - A category matching the orchestration taxonomy (duplicate key, not found, ...)
//! - A short headline for human output
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 41,
//!   "category": "resolution",
//!   "message": "cannot resolve dependency 'renderer' of 'views.blade'",
//!   "context": { "parameter": "renderer", "target": "views.blade" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Loadwright operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A symbol, unit or set key collided with an existing registration.
    DuplicateKey,
    /// A symbol, unit, set, container entry or implementation lookup missed.
    NotFound,
    /// A value did not match the declared type it was assigned or read as.
    TypeMismatch,
    /// A priority token could not be interpreted.
    Priority,
    /// The dependency resolver could not source an argument.
    Resolution,
    /// A declarative import specification was incomplete or malformed.
    Import,
    /// A data source could not provide a dataset.
    DataSource,
    /// A unit's own apply logic failed.
    Unit,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::DuplicateKey => write!(f, "duplicate_key"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::TypeMismatch => write!(f, "type_mismatch"),
            ErrorCategory::Priority => write!(f, "priority"),
            ErrorCategory::Resolution => write!(f, "resolution"),
            ErrorCategory::Import => write!(f, "import"),
            ErrorCategory::DataSource => write!(f, "data_source"),
            ErrorCategory::Unit => write!(f, "unit"),
        }
    }
}

/// Unified error type for Loadwright.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Duplicate keys (10-19)
    #[error("symbol '{name}' is already declared")]
    DuplicateSymbol { name: String },

    #[error("unit '{key}' is already registered in set '{set}'")]
    DuplicateUnit { set: String, key: String },

    #[error("set '{key}' is already registered")]
    DuplicateSet { key: String },

    // Lookups (20-29)
    #[error("symbol '{name}' does not exist")]
    SymbolNotFound { name: String },

    #[error("unit '{key}' was not found in set '{set}'")]
    UnitNotFound { set: String, key: String },

    #[error("set '{key}' was not found")]
    SetNotFound { key: String },

    #[error("container entry '{id}' was not found")]
    ContainerEntryNotFound { id: String },

    #[error("no {kind} implementation is registered as '{id}'")]
    UnknownImplementation { kind: &'static str, id: String },

    // Typing (30-39)
    #[error("value for '{name}' does not match expected type '{expected}', '{actual}' given")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("'{token}' is not a valid priority token, try 'high', 'normal', 'low' or an integer")]
    InvalidPriorityToken { token: String },

    // Resolution (40-49)
    #[error("cannot resolve dependency '{parameter}' of '{target}'")]
    CannotResolveDependency { parameter: String, target: String },

    #[error("circular dependency while constructing: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    // Import (50-59)
    #[error("set '{set}' is missing required parameters: {}", missing.join(", "))]
    RequiredParametersMissing {
        set: String,
        missing: Vec<&'static str>,
    },

    #[error("invalid import specification: {0}")]
    InvalidImport(String),

    // Data sources (60-69)
    #[error("configuration '{key}' could not be found in '{location}'")]
    ConfigNotFound { location: String, key: String },

    #[error("configuration '{key}' is a {found}, expected a mapping")]
    InvalidDataset { key: String, found: String },

    // Units (70-79)
    #[error("unit '{unit}' failed to apply: {reason}")]
    ApplyFailed { unit: String, reason: String },
}

impl Error {
    /// Convenience constructor for unit implementations reporting their own failures.
    pub fn apply_failed(unit: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::ApplyFailed {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Duplicate keys
    /// - 20-29: Lookup misses
    /// - 30-39: Typing and priority tokens
    /// - 40-49: Dependency resolution
    /// - 50-59: Declarative import
    /// - 60-69: Data sources
    /// - 70-79: Unit failures
    pub fn code(&self) -> u32 {
        match self {
            Error::DuplicateSymbol { .. } => 10,
            Error::DuplicateUnit { .. } => 11,
            Error::DuplicateSet { .. } => 12,
            Error::SymbolNotFound { .. } => 20,
            Error::UnitNotFound { .. } => 21,
            Error::SetNotFound { .. } => 22,
            Error::ContainerEntryNotFound { .. } => 23,
            Error::UnknownImplementation { .. } => 24,
            Error::TypeMismatch { .. } => 30,
            Error::InvalidPriorityToken { .. } => 31,
            Error::CannotResolveDependency { .. } => 40,
            Error::CircularDependency { .. } => 41,
            Error::RequiredParametersMissing { .. } => 50,
            Error::InvalidImport(_) => 51,
            Error::ConfigNotFound { .. } => 60,
            Error::InvalidDataset { .. } => 61,
            Error::ApplyFailed { .. } => 70,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DuplicateSymbol { .. } | Error::DuplicateUnit { .. } | Error::DuplicateSet { .. } => {
                ErrorCategory::DuplicateKey
            }

            Error::SymbolNotFound { .. }
            | Error::UnitNotFound { .. }
            | Error::SetNotFound { .. }
            | Error::ContainerEntryNotFound { .. }
            | Error::UnknownImplementation { .. } => ErrorCategory::NotFound,

            Error::TypeMismatch { .. } => ErrorCategory::TypeMismatch,

            Error::InvalidPriorityToken { .. } => ErrorCategory::Priority,

            Error::CannotResolveDependency { .. } | Error::CircularDependency { .. } => {
                ErrorCategory::Resolution
            }

            Error::RequiredParametersMissing { .. } | Error::InvalidImport(_) => {
                ErrorCategory::Import
            }

            Error::ConfigNotFound { .. } | Error::InvalidDataset { .. } => ErrorCategory::DataSource,

            Error::ApplyFailed { .. } => ErrorCategory::Unit,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::DuplicateSymbol { .. } => "Duplicate Symbol",
            Error::DuplicateUnit { .. } => "Duplicate Unit",
            Error::DuplicateSet { .. } => "Duplicate Set",
            Error::SymbolNotFound { .. } => "Symbol Not Found",
            Error::UnitNotFound { .. } => "Unit Not Found",
            Error::SetNotFound { .. } => "Set Not Found",
            Error::ContainerEntryNotFound { .. } => "Container Entry Not Found",
            Error::UnknownImplementation { .. } => "Unknown Implementation",
            Error::TypeMismatch { .. } => "Type Mismatch",
            Error::InvalidPriorityToken { .. } => "Invalid Priority Token",
            Error::CannotResolveDependency { .. } => "Cannot Resolve Dependency",
            Error::CircularDependency { .. } => "Circular Dependency",
            Error::RequiredParametersMissing { .. } => "Required Parameters Missing",
            Error::InvalidImport(_) => "Invalid Import Specification",
            Error::ConfigNotFound { .. } => "Configuration Not Found",
            Error::InvalidDataset { .. } => "Invalid Dataset",
            Error::ApplyFailed { .. } => "Unit Apply Failed",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidImport(err.to_string())
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,
    /// Error category for grouping.
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Additional structured context (e.g., unit key, parameter name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DuplicateUnit { set, key } | Error::UnitNotFound { set, key } => {
                context.insert("set".to_string(), serde_json::json!(set));
                context.insert("unit".to_string(), serde_json::json!(key));
            }
            Error::DuplicateSet { key } | Error::SetNotFound { key } => {
                context.insert("set".to_string(), serde_json::json!(key));
            }
            Error::DuplicateSymbol { name } | Error::SymbolNotFound { name } => {
                context.insert("symbol".to_string(), serde_json::json!(name));
            }
            Error::CannotResolveDependency { parameter, target } => {
                context.insert("parameter".to_string(), serde_json::json!(parameter));
                context.insert("target".to_string(), serde_json::json!(target));
            }
            Error::ConfigNotFound { location, key } => {
                context.insert("location".to_string(), serde_json::json!(location));
                context.insert("dataset".to_string(), serde_json::json!(key));
            }
            Error::ApplyFailed { unit, .. } => {
                context.insert("unit".to_string(), serde_json::json!(unit));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

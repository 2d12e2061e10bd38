//! Loadwright common types and errors.
//!
//! This crate provides the foundation shared by the symbol and pipeline crates:
//! - The unified error taxonomy with stable codes and categories
//! - Priority tiers and the tokens that name them

pub mod error;
pub mod priority;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use priority::{Priority, PriorityToken};

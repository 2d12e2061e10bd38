//! Loadwright symbol tables and dependency resolution.
//!
//! - [`SymbolTable`]: typed, insertion-ordered named values with merge and
//!   type-checked mutation
//! - [`DependencyResolver`]: builds argument lists from a table, parameter
//!   defaults and recursive construction of catalogued types
//! - [`query`]: dot-path lookups into nested configuration data

pub mod query;
pub mod resolver;
pub mod table;
pub mod value;

pub use query::{prefix_splits, query, query_map};
pub use resolver::{Arguments, Constructor, DependencyResolver, Injectable, Param, TypeCatalog};
pub use table::{Symbol, SymbolTable};
pub use value::{Callable, Instance, SymbolType, Value};

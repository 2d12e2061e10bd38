//! Typed, insertion-ordered symbol tables.

use indexmap::IndexMap;
use lw_common::{Error, Result};

use crate::value::{SymbolType, Value};

/// A named value with a declared type fixed at creation.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    declared: SymbolType,
    value: Value,
}

impl Symbol {
    /// Create a symbol, rejecting a value that does not match `declared`.
    pub fn new(name: impl Into<String>, declared: SymbolType, value: impl Into<Value>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        check_type(&name, &declared, &value)?;
        Ok(Self { name, declared, value })
    }

    /// Create a symbol whose declared type is the runtime type of `value`.
    pub fn inferred(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            declared: value.symbol_type(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &SymbolType {
        &self.declared
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The stored value, or the result of calling it for callable symbols.
    pub fn resolve(&self) -> Value {
        match (&self.declared, &self.value) {
            (SymbolType::Callable, Value::Callable(callable)) => callable.call(),
            (_, value) => value.clone(),
        }
    }
}

fn check_type(name: &str, declared: &SymbolType, value: &Value) -> Result<()> {
    if declared.accepts(value) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            name: name.to_string(),
            expected: declared.to_string(),
            actual: value.symbol_type().to_string(),
        })
    }
}

/// Insertion-ordered mapping of names to typed symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from symbols, failing on the first repeated name.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Result<Self> {
        let mut table = Self::new();
        for symbol in symbols {
            if table.symbols.contains_key(&symbol.name) {
                return Err(Error::DuplicateSymbol { name: symbol.name });
            }
            table.symbols.insert(symbol.name.clone(), symbol);
        }
        Ok(table)
    }

    /// Add a new symbol. Fails if the name is taken or `value` does not match `ty`.
    pub fn declare(&mut self, name: impl Into<String>, ty: SymbolType, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.symbols.contains_key(&name) {
            return Err(Error::DuplicateSymbol { name });
        }
        let symbol = Symbol::new(name.clone(), ty, value)?;
        self.symbols.insert(name, symbol);
        Ok(())
    }

    /// Insert or replace a symbol, typed by its value.
    ///
    /// A replaced symbol keeps its position in the table.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let symbol = Symbol::inferred(name, value);
        self.symbols.insert(symbol.name.clone(), symbol);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.lookup(name).map(Symbol::value)
    }

    pub fn get_type(&self, name: &str) -> Result<&SymbolType> {
        self.lookup(name).map(Symbol::declared_type)
    }

    /// Replace the value of an existing symbol.
    ///
    /// The declared type never changes; on mismatch the old value is kept.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let symbol = self
            .symbols
            .get_mut(name)
            .ok_or_else(|| Error::SymbolNotFound { name: name.to_string() })?;
        check_type(name, &symbol.declared, &value)?;
        symbol.value = value;
        Ok(())
    }

    /// Like [`get`](Self::get), but callable symbols are evaluated.
    pub fn resolve(&self, name: &str) -> Result<Value> {
        self.lookup(name).map(Symbol::resolve)
    }

    /// Copy every symbol of `other` into this table, replacing same-named entries.
    pub fn merge(&mut self, other: &SymbolTable) -> &mut Self {
        for (name, symbol) in &other.symbols {
            self.symbols.insert(name.clone(), symbol.clone());
        }
        self
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.shift_remove(name)
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<&Symbol> {
        self.symbols
            .get(name)
            .ok_or_else(|| Error::SymbolNotFound { name: name.to_string() })
    }
}

//! Runtime values held by symbols and handed to resolved targets.
//!
//! Plain data is carried as `serde_json::Value`. Service objects are type-erased
//! [`Instance`]s tagged with the type name they are registered under, and lazy
//! values are zero-argument [`Callable`]s.

use serde_json::{Map, Value as Json};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable service object.
#[derive(Clone)]
pub struct Instance {
    type_name: Cow<'static, str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a value under the given type name.
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    /// Wrap an already shared value without re-allocating it.
    pub fn from_arc<T: Any + Send + Sync>(type_name: impl Into<Cow<'static, str>>, value: Arc<T>) -> Self {
        Self {
            type_name: type_name.into(),
            inner: value,
        }
    }

    /// The type name this instance is registered under.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Recover a shared handle to the concrete value.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Borrow the concrete value.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>", self.type_name)
    }
}

/// A zero-argument producer, evaluated when its symbol is resolved.
#[derive(Clone)]
pub struct Callable(Arc<dyn Fn() -> Value + Send + Sync>);

impl Callable {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Callable(Arc::new(f))
    }

    pub fn call(&self) -> Value {
        (self.0)()
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// Any value a symbol can hold.
#[derive(Clone)]
pub enum Value {
    /// Plain data: null, booleans, numbers, strings, lists and maps.
    Data(Json),
    /// Lazily evaluated producer.
    Callable(Callable),
    /// Shared service object.
    Instance(Instance),
}

impl Value {
    pub fn null() -> Self {
        Value::Data(Json::Null)
    }

    /// The runtime type of this value.
    pub fn symbol_type(&self) -> SymbolType {
        SymbolType::of(self)
    }

    pub fn as_data(&self) -> Option<&Json> {
        match self {
            Value::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Json::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(Json::as_i64)
    }

    pub fn as_map(&self) -> Option<&Map<String, Json>> {
        self.as_data().and_then(Json::as_object)
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Data values compare by content, callables and instances by identity.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => write!(f, "{}", data),
            Value::Callable(callable) => fmt::Debug::fmt(callable, f),
            Value::Instance(instance) => fmt::Debug::fmt(instance, f),
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Value::Data(value)
    }
}

impl From<Map<String, Json>> for Value {
    fn from(value: Map<String, Json>) -> Self {
        Value::Data(Json::Object(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Data(Json::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Data(Json::String(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Data(Json::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Data(Json::Bool(value))
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Instance(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Callable(value)
    }
}

/// Declared type of a symbol or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Null,
    Bool,
    Integer,
    Float,
    String,
    List,
    Map,
    Callable,
    /// A service type, identified by the name it is registered under.
    Named(Cow<'static, str>),
}

impl SymbolType {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        SymbolType::Named(name.into())
    }

    /// Runtime type of a value. JSON numbers that fit an integer are integers.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Data(Json::Null) => SymbolType::Null,
            Value::Data(Json::Bool(_)) => SymbolType::Bool,
            Value::Data(Json::Number(n)) if n.is_i64() || n.is_u64() => SymbolType::Integer,
            Value::Data(Json::Number(_)) => SymbolType::Float,
            Value::Data(Json::String(_)) => SymbolType::String,
            Value::Data(Json::Array(_)) => SymbolType::List,
            Value::Data(Json::Object(_)) => SymbolType::Map,
            Value::Callable(_) => SymbolType::Callable,
            Value::Instance(instance) => SymbolType::Named(Cow::Owned(instance.type_name().to_string())),
        }
    }

    /// Whether `value` may be stored under this declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (SymbolType::Named(name), Value::Instance(instance)) => name == instance.type_name(),
            _ => *self == SymbolType::of(value),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SymbolType::Null => "null",
            SymbolType::Bool => "bool",
            SymbolType::Integer => "integer",
            SymbolType::Float => "float",
            SymbolType::String => "string",
            SymbolType::List => "list",
            SymbolType::Map => "map",
            SymbolType::Callable => "callable",
            SymbolType::Named(name) => name,
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

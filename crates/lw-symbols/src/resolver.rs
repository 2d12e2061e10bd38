//! Dependency resolution.
//!
//! Constructible types describe their dependencies explicitly: a [`Param`]
//! list plus a build function, registered in a [`TypeCatalog`]. A
//! [`DependencyResolver`] turns a parameter list into [`Arguments`] by
//! consulting, per parameter and in order:
//!
//! 1. a symbol named after the parameter's service type,
//! 2. the parameter's default, if no symbol carries the parameter's name,
//! 3. recursive construction of the service type through the catalog, caching
//!    the result in the resolver's own table,
//! 4. a symbol named after the parameter whose declared type matches,
//!
//! and fails with `CannotResolveDependency` otherwise.

use indexmap::IndexMap;
use lw_common::{Error, Result};
use serde_json::{Map, Value as Json};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::table::SymbolTable;
use crate::value::{Callable, Instance, SymbolType, Value};

/// One entry of a dependency descriptor.
#[derive(Debug, Clone)]
pub struct Param {
    name: Cow<'static, str>,
    ty: SymbolType,
    default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<Cow<'static, str>>, ty: SymbolType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// A parameter of an injectable service type.
    pub fn of<T: Injectable>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::named(T::TYPE_NAME))
    }

    /// A parameter of a service type known only by name.
    pub fn named(name: impl Into<Cow<'static, str>>, type_name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::named(type_name))
    }

    pub fn string(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::String)
    }

    pub fn integer(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::Integer)
    }

    pub fn boolean(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::Bool)
    }

    pub fn map(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::Map)
    }

    pub fn list(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::List)
    }

    pub fn callable(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, SymbolType::Callable)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &SymbolType {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Resolved arguments for one target, keyed by parameter name.
#[derive(Debug, Clone)]
pub struct Arguments {
    target: String,
    entries: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            entries: IndexMap::new(),
        }
    }

    /// Add an entry. Mostly useful when calling a target by hand.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.entries.get(name).ok_or_else(|| Error::CannotResolveDependency {
            parameter: name.to_string(),
            target: self.target.clone(),
        })
    }

    pub fn string(&self, name: &str) -> Result<&str> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| self.mismatch(name, "string", value))
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| self.mismatch(name, "integer", value))
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        value
            .as_data()
            .and_then(Json::as_f64)
            .ok_or_else(|| self.mismatch(name, "float", value))
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value
            .as_data()
            .and_then(Json::as_bool)
            .ok_or_else(|| self.mismatch(name, "bool", value))
    }

    pub fn map(&self, name: &str) -> Result<&Map<String, Json>> {
        let value = self.get(name)?;
        value.as_map().ok_or_else(|| self.mismatch(name, "map", value))
    }

    pub fn list(&self, name: &str) -> Result<&Vec<Json>> {
        let value = self.get(name)?;
        value
            .as_data()
            .and_then(Json::as_array)
            .ok_or_else(|| self.mismatch(name, "list", value))
    }

    pub fn callable(&self, name: &str) -> Result<&Callable> {
        let value = self.get(name)?;
        value
            .as_callable()
            .ok_or_else(|| self.mismatch(name, "callable", value))
    }

    /// The service instance passed as `name`, downcast to `T`.
    pub fn instance<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.get(name)?;
        value
            .as_instance()
            .and_then(Instance::downcast::<T>)
            .ok_or_else(|| self.mismatch(name, std::any::type_name::<T>(), value))
    }

    fn mismatch(&self, name: &str, expected: &str, actual: &Value) -> Error {
        Error::TypeMismatch {
            name: format!("{}.{}", self.target, name),
            expected: expected.to_string(),
            actual: actual.symbol_type().to_string(),
        }
    }
}

/// A type the resolver can construct from its declared dependencies.
pub trait Injectable: Any + Send + Sync + Sized {
    /// Name the type is registered and looked up under.
    const TYPE_NAME: &'static str;

    /// Constructor parameters, in order.
    fn dependencies() -> Vec<Param> {
        Vec::new()
    }

    fn construct(args: &Arguments) -> Result<Self>;
}

type BuildFn = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;

/// Dependency descriptor plus build function for one type.
#[derive(Clone)]
pub struct Constructor {
    type_name: Cow<'static, str>,
    params: Vec<Param>,
    build: BuildFn,
}

impl Constructor {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn build(&self, args: &Arguments) -> Result<Instance> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Registry of constructible types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    constructors: IndexMap<String, Constructor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an [`Injectable`] type under its `TYPE_NAME`.
    pub fn register<T: Injectable>(&mut self) -> &mut Self {
        self.register_with(T::TYPE_NAME, T::dependencies(), |args| {
            T::construct(args).map(|value| Instance::new(T::TYPE_NAME, value))
        })
    }

    /// Register an ad-hoc constructor. Re-registering a name replaces it.
    pub fn register_with(
        &mut self,
        type_name: impl Into<Cow<'static, str>>,
        params: Vec<Param>,
        build: impl Fn(&Arguments) -> Result<Instance> + Send + Sync + 'static,
    ) -> &mut Self {
        let type_name = type_name.into();
        self.constructors.insert(
            type_name.to_string(),
            Constructor {
                type_name,
                params,
                build: Arc::new(build),
            },
        );
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Constructor> {
        self.constructors.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

/// Assembles arguments from a symbol table, defaults and the type catalog.
///
/// Instances built while resolving a dependency are defined in the
/// resolver's own table under their type name and reused afterwards, both
/// later in the same invocation and by later invocations on this resolver.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    catalog: Arc<TypeCatalog>,
    symbols: SymbolTable,
    resolving: Vec<String>,
}

impl DependencyResolver {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self::with_symbols(catalog, SymbolTable::new())
    }

    pub fn with_symbols(catalog: Arc<TypeCatalog>, symbols: SymbolTable) -> Self {
        Self {
            catalog,
            symbols,
            resolving: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    /// Resolve every parameter of `target`, in order.
    pub fn resolve_arguments(&mut self, target: &str, params: &[Param]) -> Result<Arguments> {
        let mut args = Arguments::new(target);
        for param in params {
            let value = self.resolve_param(target, param)?;
            args.entries.insert(param.name().to_string(), value);
        }
        Ok(args)
    }

    /// Construct a new instance of a catalogued type.
    ///
    /// The instance itself is not cached; its dependencies are.
    pub fn make_named(&mut self, type_name: &str) -> Result<Instance> {
        let catalog = Arc::clone(&self.catalog);
        let ctor = catalog.get(type_name).ok_or_else(|| Error::UnknownImplementation {
            kind: "type",
            id: type_name.to_string(),
        })?;
        self.construct(type_name, ctor.params(), |args| ctor.build(args))
    }

    /// Construct a new `T`, through the catalog when registered there and
    /// from `T`'s own descriptor otherwise.
    pub fn make<T: Injectable>(&mut self) -> Result<Arc<T>> {
        let instance = if self.catalog.contains(T::TYPE_NAME) {
            self.make_named(T::TYPE_NAME)?
        } else {
            self.construct(T::TYPE_NAME, &T::dependencies(), |args| {
                T::construct(args).map(|value| Instance::new(T::TYPE_NAME, value))
            })?
        };
        instance.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
            name: T::TYPE_NAME.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            actual: instance.type_name().to_string(),
        })
    }

    /// The shared `T` held in this resolver's table, constructing and caching
    /// it on first request.
    pub fn obtain<T: Injectable>(&mut self) -> Result<Arc<T>> {
        if let Some(existing) = self
            .symbols
            .symbol(T::TYPE_NAME)
            .and_then(|symbol| symbol.resolve().as_instance().and_then(Instance::downcast::<T>))
        {
            return Ok(existing);
        }
        let made = self.make::<T>()?;
        self.symbols
            .define(T::TYPE_NAME, Instance::from_arc(T::TYPE_NAME, Arc::clone(&made)));
        Ok(made)
    }

    /// Resolve `params` and call a free function with them.
    pub fn call<R>(
        &mut self,
        target: &str,
        params: &[Param],
        f: impl FnOnce(&Arguments) -> Result<R>,
    ) -> Result<R> {
        let args = self.resolve_arguments(target, params)?;
        f(&args)
    }

    /// Call a method on `receiver`, constructing a new receiver when none is
    /// supplied. Only the method's own parameters are resolved.
    pub fn invoke<T: Injectable, R>(
        &mut self,
        receiver: Option<Arc<T>>,
        method: &str,
        params: &[Param],
        f: impl FnOnce(&T, &Arguments) -> Result<R>,
    ) -> Result<R> {
        let receiver = match receiver {
            Some(receiver) => receiver,
            None => self.make::<T>()?,
        };
        let target = format!("{}::{}", T::TYPE_NAME, method);
        let args = self.resolve_arguments(&target, params)?;
        f(&receiver, &args)
    }

    /// Call a method on a mutably borrowed receiver.
    pub fn invoke_with<S: ?Sized, R>(
        &mut self,
        target: &str,
        receiver: &mut S,
        params: &[Param],
        f: impl FnOnce(&mut S, &Arguments) -> Result<R>,
    ) -> Result<R> {
        let args = self.resolve_arguments(target, params)?;
        f(receiver, &args)
    }

    fn resolve_param(&mut self, target: &str, param: &Param) -> Result<Value> {
        if let SymbolType::Named(type_name) = param.ty() {
            if let Some(symbol) = self.symbols.symbol(type_name) {
                trace!(callee = target, parameter = param.name(), "resolved from type symbol");
                return Ok(symbol.resolve());
            }
        }

        if let Some(default) = param.default_value() {
            if !self.symbols.contains(param.name()) {
                trace!(callee = target, parameter = param.name(), "using default");
                return Ok(default.clone());
            }
        }

        if let SymbolType::Named(type_name) = param.ty() {
            if self.catalog.contains(type_name) {
                let instance = self.make_named(type_name)?;
                self.symbols.define(type_name.to_string(), instance.clone());
                debug!(callee = target, type_name = %type_name, "constructed and cached dependency");
                return Ok(Value::Instance(instance));
            }
        }

        if let Some(symbol) = self.symbols.symbol(param.name()) {
            if symbol.declared_type() == param.ty() {
                trace!(callee = target, parameter = param.name(), "resolved from named symbol");
                return Ok(symbol.value().clone());
            }
        }

        Err(Error::CannotResolveDependency {
            parameter: param.name().to_string(),
            target: target.to_string(),
        })
    }

    fn construct(
        &mut self,
        type_name: &str,
        params: &[Param],
        build: impl FnOnce(&Arguments) -> Result<Instance>,
    ) -> Result<Instance> {
        if self.resolving.iter().any(|t| t == type_name) {
            let mut chain = self.resolving.clone();
            chain.push(type_name.to_string());
            return Err(Error::CircularDependency { chain });
        }

        self.resolving.push(type_name.to_string());
        let built = self
            .resolve_arguments(type_name, params)
            .and_then(|args| build(&args));
        self.resolving.pop();

        let instance = built?;
        if instance.type_name() != type_name {
            return Err(Error::TypeMismatch {
                name: type_name.to_string(),
                expected: type_name.to_string(),
                actual: instance.type_name().to_string(),
            });
        }
        Ok(instance)
    }
}

//! Statically registered host bindings
//!
//! A [`Host`] lists the properties and methods it exposes to expressions by
//! filling a [`Registry`]. [`RegistryContext`] builds that registry once and
//! dispatches lookups and calls against it.

use super::store::{StoreRef, VariableStore};
use super::Context;
use crate::error::{EngineError, Result};
use crate::interp::{Value, ValueType};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

/// Object whose bindings are exposed to expressions
pub trait Host: Sized + 'static {
    fn register(registry: &mut Registry<Self>);
}

/// Declared parameter type of a bound method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Accepts any value
    Any,
    Number,
    Text,
    Bool,
    NumberArray,
    TextArray,
    BoolArray,
}

impl ParamType {
    pub fn accepts(&self, ty: ValueType) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::Number => ty == ValueType::Number,
            ParamType::Text => ty == ValueType::Text,
            ParamType::Bool => ty == ValueType::Bool,
            ParamType::NumberArray => ty == ValueType::NumberArray,
            ParamType::TextArray => ty == ValueType::TextArray,
            ParamType::BoolArray => ty == ValueType::BoolArray,
        }
    }
}

type Getter<H> = Box<dyn Fn(&H) -> Result<Value>>;
type Invoker<H> = Box<dyn Fn(&H, &[Value]) -> Result<Value>>;

/// Bound property
pub struct Property<H> {
    name: String,
    constant: bool,
    getter: Getter<H>,
}

impl<H> Property<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn get(&self, host: &H) -> Result<Value> {
        (self.getter)(host)
    }
}

impl<H> fmt::Debug for Property<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("constant", &self.constant)
            .finish()
    }
}

/// One overload of a bound method
pub struct Method<H> {
    name: String,
    constant: bool,
    params: Vec<ParamType>,
    invoke: Invoker<H>,
}

impl<H> Method<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Arity matches and every parameter accepts its argument type
    pub fn accepts(&self, arg_types: &[ValueType]) -> bool {
        self.params.len() == arg_types.len()
            && self
                .params
                .iter()
                .zip(arg_types)
                .all(|(param, ty)| param.accepts(*ty))
    }

    pub fn invoke(&self, host: &H, args: &[Value]) -> Result<Value> {
        (self.invoke)(host, args)
    }
}

impl<H> fmt::Debug for Method<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("constant", &self.constant)
            .field("params", &self.params)
            .finish()
    }
}

/// Property index and method overload sets of a host
pub struct Registry<H> {
    properties: HashMap<String, Property<H>>,
    methods: HashMap<String, Vec<Method<H>>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a property. The first registration of a name wins.
    pub fn property(
        &mut self,
        name: &str,
        constant: bool,
        getter: impl Fn(&H) -> Result<Value> + 'static,
    ) -> &mut Self {
        if self.properties.contains_key(name) {
            warn!("duplicate property '{name}' ignored");
            return self;
        }
        self.properties.insert(
            name.to_string(),
            Property {
                name: name.to_string(),
                constant,
                getter: Box::new(getter),
            },
        );
        self
    }

    /// Add an overload to the method set of `name`
    pub fn method(
        &mut self,
        name: &str,
        constant: bool,
        params: &[ParamType],
        invoke: impl Fn(&H, &[Value]) -> Result<Value> + 'static,
    ) -> &mut Self {
        self.methods.entry(name.to_string()).or_default().push(Method {
            name: name.to_string(),
            constant,
            params: params.to_vec(),
            invoke: Box::new(invoke),
        });
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&Property<H>> {
        self.properties.get(name)
    }

    /// First overload, in declaration order, that accepts `arg_types`
    pub fn find_method(&self, name: &str, arg_types: &[ValueType]) -> Option<&Method<H>> {
        self.methods
            .get(name)?
            .iter()
            .find(|method| method.accepts(arg_types))
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of overloads over all method names
    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    /// Bound property and method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .properties
            .keys()
            .chain(self.methods.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn type_names(types: &[ValueType]) -> Vec<String> {
    types.iter().map(|t| t.name().to_string()).collect()
}

/// Context backed by a host's registry and an optional variable store
///
/// Without a store the context is read-only. With one, stored variables
/// shadow host bindings and count as constant.
pub struct RegistryContext<H: Host> {
    host: H,
    registry: Registry<H>,
    store: Option<StoreRef>,
}

impl<H: Host> RegistryContext<H> {
    /// Read-only context without a variable store
    pub fn new(host: H) -> Self {
        Self::build(host, None)
    }

    /// Context with its own variable store
    pub fn with_variables(host: H) -> Self {
        Self::build(host, Some(VariableStore::new().into_ref()))
    }

    /// Context using a shared variable store
    pub fn with_store(host: H, store: StoreRef) -> Self {
        Self::build(host, Some(store))
    }

    fn build(host: H, store: Option<StoreRef>) -> Self {
        let mut registry = Registry::new();
        H::register(&mut registry);
        debug!(
            "bound {} properties and {} methods from {}",
            registry.property_count(),
            registry.method_count(),
            std::any::type_name::<H>()
        );
        Self {
            host,
            registry,
            store,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &Registry<H> {
        &self.registry
    }

    pub fn store(&self) -> Option<&StoreRef> {
        self.store.as_ref()
    }

    /// Remove all stored variables
    pub fn reset(&self) {
        if let Some(store) = &self.store {
            store.borrow_mut().clear();
        }
    }

    /// Names of the stored variables, sorted
    pub fn variable_names(&self) -> Vec<String> {
        match &self.store {
            Some(store) => store.borrow().names(),
            None => Vec::new(),
        }
    }

    fn stored(&self, name: &str) -> Option<Value> {
        self.store.as_ref()?.borrow().get(name)
    }
}

impl<H: Host> Context for RegistryContext<H> {
    fn resolve(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.stored(name) {
            return Ok(value);
        }
        if let Some(property) = self.registry.find_property(name) {
            return property.get(&self.host);
        }
        if let Some(method) = self.registry.find_method(name, &[]) {
            return method.invoke(&self.host, &[]);
        }
        Err(EngineError::unknown_name(name))
    }

    fn assign(&self, name: &str, value: Value) -> Result<()> {
        match &self.store {
            Some(store) => {
                store.borrow_mut().define(name, value);
                Ok(())
            }
            None => Err(EngineError::read_only()),
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let arg_types: Vec<ValueType> = args.iter().map(Value::value_type).collect();
        match self.registry.find_method(name, &arg_types) {
            Some(method) => method.invoke(&self.host, args),
            None => Err(EngineError::no_overload(name, &type_names(&arg_types))),
        }
    }

    fn is_constant_variable(&self, name: &str) -> Result<bool> {
        if self.stored(name).is_some() {
            return Ok(true);
        }
        if let Some(property) = self.registry.find_property(name) {
            return Ok(property.is_constant());
        }
        if let Some(method) = self.registry.find_method(name, &[]) {
            return Ok(method.is_constant());
        }
        Err(EngineError::unknown_variable(name))
    }

    fn is_constant_call(&self, name: &str, arg_types: &[ValueType]) -> Result<bool> {
        self.registry
            .find_method(name, arg_types)
            .map(Method::is_constant)
            .ok_or_else(|| EngineError::no_overload(name, &type_names(arg_types)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Geometry {
        scale: f64,
        calls: Cell<usize>,
    }

    impl Geometry {
        fn new() -> Self {
            Self {
                scale: 2.0,
                calls: Cell::new(0),
            }
        }
    }

    impl Host for Geometry {
        fn register(registry: &mut Registry<Self>) {
            registry
                .property("scale", true, |g| Ok(Value::Number(g.scale)))
                .property("scale", false, |_| Ok(Value::Number(-1.0)))
                .property("counter", false, |g| Ok(Value::Number(g.calls.get() as f64)))
                .method("rectArea", true, &[ParamType::Number, ParamType::Number], |g, args| {
                    g.calls.set(g.calls.get() + 1);
                    Ok(Value::Number(args[0].number()? * args[1].number()? * g.scale))
                })
                .method("describe", true, &[ParamType::Number], |_, _| Ok(Value::from("number")))
                .method("describe", true, &[ParamType::Any], |_, _| Ok(Value::from("any")))
                .method("tick", false, &[], |g, _| {
                    g.calls.set(g.calls.get() + 1);
                    Ok(Value::Number(g.calls.get() as f64))
                });
        }
    }

    #[test]
    fn test_registry_counts() {
        let ctx = RegistryContext::new(Geometry::new());
        assert_eq!(ctx.registry().property_count(), 2);
        assert_eq!(ctx.registry().method_count(), 4);
    }

    #[test]
    fn test_duplicate_property_first_wins() {
        let ctx = RegistryContext::new(Geometry::new());
        assert_eq!(ctx.resolve("scale").unwrap(), Value::Number(2.0));
        assert!(ctx.is_constant_variable("scale").unwrap());
    }

    #[test]
    fn test_call_with_matching_overload() {
        let ctx = RegistryContext::new(Geometry::new());
        let r = ctx
            .call("rectArea", &[Value::Number(2.0), Value::Number(3.0)])
            .unwrap();
        assert_eq!(r, Value::Number(12.0));
        assert_eq!(ctx.host().calls.get(), 1);
    }

    #[test]
    fn test_call_without_matching_overload() {
        let ctx = RegistryContext::new(Geometry::new());
        let err = ctx
            .call("rectArea", &[Value::from("a"), Value::from("b")])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "No function 'rectArea' found for arguments of type 'string, string'"
        );
        let err = ctx.call("rectArea", &[Value::Number(1.0)]).unwrap_err();
        assert_eq!(
            err.message(),
            "No function 'rectArea' found for arguments of type 'number'"
        );
    }

    #[test]
    fn test_overloads_in_declaration_order() {
        let ctx = RegistryContext::new(Geometry::new());
        assert_eq!(
            ctx.call("describe", &[Value::Number(1.0)]).unwrap(),
            Value::from("number")
        );
        assert_eq!(
            ctx.call("describe", &[Value::Bool(true)]).unwrap(),
            Value::from("any")
        );
    }

    #[test]
    fn test_resolve_falls_back_to_zero_argument_method() {
        let ctx = RegistryContext::new(Geometry::new());
        assert_eq!(ctx.resolve("tick").unwrap(), Value::Number(1.0));
        assert!(!ctx.is_constant_variable("tick").unwrap());
    }

    #[test]
    fn test_resolve_unknown() {
        let ctx = RegistryContext::new(Geometry::new());
        let err = ctx.resolve("nope").unwrap_err();
        assert_eq!(err.message(), "Unknown variable or function: 'nope'");
        let err = ctx.is_constant_variable("nope").unwrap_err();
        assert_eq!(err.message(), "Unknown variable: 'nope'");
    }

    #[test]
    fn test_read_only_registry() {
        let ctx = RegistryContext::new(Geometry::new());
        let err = ctx.assign("x", Value::Number(1.0)).unwrap_err();
        assert_eq!(err.message(), "cannot assign variable - context is read-only");
        assert!(ctx.variable_names().is_empty());
    }

    #[test]
    fn test_registry_with_variables() {
        let ctx = RegistryContext::with_variables(Geometry::new());
        ctx.assign("x", Value::Number(1.0)).unwrap();
        assert_eq!(ctx.resolve("x").unwrap(), Value::Number(1.0));
        assert!(ctx.is_constant_variable("x").unwrap());
        assert_eq!(ctx.variable_names(), vec!["x".to_string()]);
    }

    #[test]
    fn test_stored_variable_shadows_property() {
        let ctx = RegistryContext::with_variables(Geometry::new());
        ctx.assign("counter", Value::from("shadow")).unwrap();
        assert_eq!(ctx.resolve("counter").unwrap(), Value::from("shadow"));
        assert!(ctx.is_constant_variable("counter").unwrap());
    }

    #[test]
    fn test_reset_clears_store() {
        let ctx = RegistryContext::with_variables(Geometry::new());
        ctx.assign("x", Value::Number(1.0)).unwrap();
        ctx.reset();
        assert!(ctx.resolve("x").is_err());
    }

    #[test]
    fn test_shared_store() {
        let store = VariableStore::new().into_ref();
        let ctx = RegistryContext::with_store(Geometry::new(), store.clone());
        ctx.assign("y", Value::Bool(true)).unwrap();
        assert!(store.borrow().contains("y"));
    }

    #[test]
    fn test_is_constant_call() {
        let ctx = RegistryContext::new(Geometry::new());
        assert!(ctx
            .is_constant_call("rectArea", &[ValueType::Number, ValueType::Number])
            .unwrap());
        assert!(!ctx.is_constant_call("tick", &[]).unwrap());
        assert!(ctx.is_constant_call("rectArea", &[ValueType::Bool]).is_err());
    }

    #[test]
    fn test_param_type_accepts() {
        assert!(ParamType::Any.accepts(ValueType::BoolArray));
        assert!(ParamType::NumberArray.accepts(ValueType::NumberArray));
        assert!(!ParamType::Number.accepts(ValueType::NumberArray));
    }
}

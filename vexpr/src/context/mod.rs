//! Variable and function binding
//!
//! A [`Context`] answers name lookups for the evaluator and constant-ness
//! queries for the optimizer.

mod registry;
mod scoped;
mod store;

pub use registry::{Host, Method, ParamType, Property, Registry, RegistryContext};
pub use scoped::ScopedContext;
pub use store::{StoreRef, VariableStore};

use crate::error::{EngineError, Result};
use crate::interp::{Value, ValueType};

/// Binding context used during evaluation and optimization
///
/// All operations take `&self`; implementations that store variables use
/// interior mutability.
pub trait Context {
    /// Look up a variable, property or zero-argument function
    fn resolve(&self, name: &str) -> Result<Value>;

    /// Bind a variable
    fn assign(&self, name: &str, value: Value) -> Result<()>;

    /// Call the first overload whose signature accepts `args`
    fn call(&self, name: &str, args: &[Value]) -> Result<Value>;

    /// Whether `name` may be folded into a literal. Fails if `name` is unknown.
    fn is_constant_variable(&self, name: &str) -> Result<bool>;

    /// Whether a call with these argument types may be folded. Fails if no
    /// overload matches.
    fn is_constant_call(&self, name: &str, arg_types: &[ValueType]) -> Result<bool>;
}

/// Context without any bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl Context for EmptyContext {
    fn resolve(&self, name: &str) -> Result<Value> {
        Err(EngineError::unknown_name(name))
    }

    fn assign(&self, _name: &str, _value: Value) -> Result<()> {
        Err(EngineError::read_only())
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let types: Vec<String> = args.iter().map(|a| a.type_name().to_string()).collect();
        Err(EngineError::no_overload(name, &types))
    }

    fn is_constant_variable(&self, name: &str) -> Result<bool> {
        Err(EngineError::unknown_variable(name))
    }

    fn is_constant_call(&self, name: &str, arg_types: &[ValueType]) -> Result<bool> {
        let types: Vec<String> = arg_types.iter().map(|t| t.name().to_string()).collect();
        Err(EngineError::no_overload(name, &types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_resolves_nothing() {
        let err = EmptyContext.resolve("x").unwrap_err();
        assert_eq!(err.message(), "Unknown variable or function: 'x'");
    }

    #[test]
    fn test_empty_context_is_read_only() {
        let err = EmptyContext.assign("x", Value::Number(1.0)).unwrap_err();
        assert_eq!(err.message(), "cannot assign variable - context is read-only");
    }

    #[test]
    fn test_empty_context_has_no_functions() {
        let err = EmptyContext
            .call("f", &[Value::Number(1.0), Value::from("a")])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "No function 'f' found for arguments of type 'number, string'"
        );
        let err = EmptyContext
            .is_constant_call("f", &[ValueType::NumberArray])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "No function 'f' found for arguments of type 'number[]'"
        );
    }

    #[test]
    fn test_empty_context_constant_queries_fail() {
        let err = EmptyContext.is_constant_variable("x").unwrap_err();
        assert_eq!(err.message(), "Unknown variable: 'x'");
    }
}

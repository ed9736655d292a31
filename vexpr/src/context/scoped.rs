//! Scoped context with local variables over a shared parent

use super::store::VariableStore;
use super::Context;
use crate::error::Result;
use crate::interp::{Value, ValueType};
use std::cell::RefCell;
use std::rc::Rc;

/// Private variables layered over a shared parent context
///
/// Assignments always bind locally and shadow the parent. Functions are
/// never scoped: calls go straight to the parent.
pub struct ScopedContext {
    parent: Rc<dyn Context>,
    variables: RefCell<VariableStore>,
}

impl ScopedContext {
    pub fn new(parent: Rc<dyn Context>) -> Self {
        Self {
            parent,
            variables: RefCell::new(VariableStore::new()),
        }
    }

    pub fn parent(&self) -> &Rc<dyn Context> {
        &self.parent
    }

    /// Names of the local variables, sorted
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.borrow().names()
    }

    /// Drop all local variables
    pub fn clear(&self) {
        self.variables.borrow_mut().clear();
    }
}

impl Context for ScopedContext {
    fn resolve(&self, name: &str) -> Result<Value> {
        let local = self.variables.borrow().get(name);
        match local {
            Some(value) => Ok(value),
            None => self.parent.resolve(name),
        }
    }

    fn assign(&self, name: &str, value: Value) -> Result<()> {
        self.variables.borrow_mut().define(name, value);
        Ok(())
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.parent.call(name, args)
    }

    fn is_constant_variable(&self, name: &str) -> Result<bool> {
        if self.variables.borrow().contains(name) {
            return Ok(true);
        }
        self.parent.is_constant_variable(name)
    }

    fn is_constant_call(&self, name: &str, arg_types: &[ValueType]) -> Result<bool> {
        self.parent.is_constant_call(name, arg_types)
    }
}

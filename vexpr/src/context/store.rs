//! Variable storage for binding contexts

use crate::interp::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to a variable store
pub type StoreRef = Rc<RefCell<VariableStore>>;

/// Flat name to value map
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    bindings: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> StoreRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind or rebind a variable
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }
}

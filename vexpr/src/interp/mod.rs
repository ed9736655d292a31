//! Expression evaluation
//!
//! Runtime values, broadcasting operators and the tree-walking evaluator.

mod eval;
pub mod ops;
mod value;

pub use eval::{build_array, evaluate};
pub use value::{format_significant, Value, ValueType};

//! vexpr Library
//!
//! Embeddable expression language over numbers, strings, booleans and
//! arrays of each. Operators broadcast element-wise over arrays; names
//! resolve through a [`context::Context`] supplied by the host.

pub mod ast;
pub mod context;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod library;
pub mod optimize;
pub mod parser;
pub mod repl;

pub use ast::{Node, Span};
pub use context::{Context, EmptyContext, Host, RegistryContext, ScopedContext};
pub use error::{EngineError, Result};
pub use interp::{evaluate, Value, ValueType};
pub use library::Calculator;

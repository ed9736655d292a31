//! Tree-walking evaluator

use crate::ast::Node;
use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::parser;

use super::ops;
use super::value::Value;

/// Stack growth parameters for deeply nested expressions
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

impl Node {
    /// Evaluate the node against a binding context
    pub fn eval(&self, ctx: &dyn Context) -> Result<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(ctx))
    }

    fn eval_inner(&self, ctx: &dyn Context) -> Result<Value> {
        match self {
            Node::Literal(value) => Ok(value.clone()),
            Node::Empty => Ok(Value::Unit),
            Node::Variable(name) => ctx.resolve(name),

            Node::Assignment { name, value } => {
                let value = value.eval(ctx)?;
                ctx.assign(name, value.clone())?;
                Ok(value)
            }

            Node::Unary { op, operand } => {
                let operand = operand.eval(ctx)?;
                ops::unary(*op, &operand)
            }

            Node::Binary { op, left, right } => {
                let left = left.eval(ctx)?;
                let right = right.eval(ctx)?;
                ops::binary(*op, &left, &right)
            }

            Node::Ternary {
                op,
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = cond.eval(ctx)?;
                let then_value = then_branch.eval(ctx)?;
                let else_value = else_branch.eval(ctx)?;
                ops::ternary(*op, &cond, &then_value, &else_value)
            }

            Node::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|e| e.eval(ctx))
                    .collect::<Result<Vec<_>>>()?;
                build_array(values)
            }

            Node::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| a.eval(ctx))
                    .collect::<Result<Vec<_>>>()?;
                ctx.call(name, &args)
            }
        }
    }
}

/// Build a homogeneous array value from evaluated elements
pub fn build_array(values: Vec<Value>) -> Result<Value> {
    let incompatible = || EngineError::new("invalid array definition - element types not compatible");

    let Some(first) = values.first() else {
        return Err(EngineError::new(
            "invalid array definition - array cannot be empty",
        ));
    };

    match first {
        Value::Number(_) => values
            .into_iter()
            .map(|v| match v {
                Value::Number(n) => Ok(n),
                _ => Err(incompatible()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::NumberArray),
        Value::Text(_) => values
            .into_iter()
            .map(|v| match v {
                Value::Text(s) => Ok(s),
                _ => Err(incompatible()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::TextArray),
        Value::Bool(_) => values
            .into_iter()
            .map(|v| match v {
                Value::Bool(b) => Ok(b),
                _ => Err(incompatible()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::BoolArray),
        _ => Err(incompatible()),
    }
}

/// Parse `source` and evaluate every statement in order
///
/// Returns the value of the last statement, or `Unit` for empty input. An
/// error aborts the batch; side effects of earlier statements are kept.
pub fn evaluate(source: &str, ctx: &dyn Context) -> Result<Value> {
    let statements = parser::parse(source)?;
    let mut last = Value::Unit;
    for statement in &statements {
        last = statement.eval(ctx)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, UnaryOp};
    use crate::context::{EmptyContext, ScopedContext};
    use std::rc::Rc;

    fn eval_str(source: &str) -> Result<Value> {
        evaluate(source, &EmptyContext)
    }

    #[test]
    fn test_eval_literals() {
        assert_eq!(eval_str("42").unwrap(), Value::Number(42.0));
        assert_eq!(eval_str("'hi'").unwrap(), Value::from("hi"));
        assert_eq!(eval_str("true").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_eval_empty_input() {
        assert_eq!(eval_str("").unwrap(), Value::Unit);
        assert_eq!(eval_str("1;").unwrap(), Value::Unit);
    }

    #[test]
    fn test_eval_precedence() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval_str("-2 ^ 2").unwrap(), Value::Number(-4.0));
        assert_eq!(eval_str("2 ^ -1").unwrap(), Value::Number(0.5));
    }

    #[test]
    fn test_eval_built_nodes() {
        let node = Node::binary(
            BinaryOp::Add,
            Node::Literal(Value::Number(1.0)),
            Node::unary(UnaryOp::Neg, Node::Literal(Value::Number(3.0))),
        );
        assert_eq!(node.eval(&EmptyContext).unwrap(), Value::Number(-2.0));
    }

    #[test]
    fn test_eval_arrays() {
        assert_eq!(
            eval_str("[1, 2, 3] * 2").unwrap(),
            Value::NumberArray(vec![2.0, 4.0, 6.0])
        );
        assert_eq!(eval_str("[1,2,3][1]").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_eval_array_errors() {
        let err = eval_str("[1, true]").unwrap_err();
        assert_eq!(
            err.message(),
            "invalid array definition - element types not compatible"
        );
        let err = eval_str("[ ]").unwrap_err();
        assert_eq!(err.message(), "invalid array definition - array cannot be empty");
        let err = eval_str("[[1], [2]]").unwrap_err();
        assert_eq!(
            err.message(),
            "invalid array definition - element types not compatible"
        );
    }

    #[test]
    fn test_eval_unknown_variable() {
        let err = eval_str("x + 1").unwrap_err();
        assert_eq!(err.message(), "Unknown variable or function: 'x'");
    }

    #[test]
    fn test_eval_assignment_on_read_only_context() {
        let err = eval_str("x = 1").unwrap_err();
        assert_eq!(err.message(), "cannot assign variable - context is read-only");
    }

    #[test]
    fn test_eval_batch_keeps_earlier_side_effects() {
        let ctx = ScopedContext::new(Rc::new(EmptyContext));
        assert!(evaluate("a = 5; b = a + nope", &ctx).is_err());
        assert_eq!(evaluate("a", &ctx).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_eval_assignment_returns_value() {
        let ctx = ScopedContext::new(Rc::new(EmptyContext));
        assert_eq!(evaluate("a = b = 2", &ctx).unwrap(), Value::Number(2.0));
        assert_eq!(evaluate("a + b", &ctx).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_eval_deep_nesting() {
        let source = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(eval_str(&source).unwrap(), Value::Number(1.0));
    }
}

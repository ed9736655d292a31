//! Calculator session
//!
//! [`MathLibrary`] binds the math and filter functions plus a few array
//! helpers. [`Calculator`] evaluates input lines against it, keeping user
//! variables and the last result in `ans`.

use super::{filter, math};
use crate::ast::Node;
use crate::context::{Context, Host, ParamType, Registry, RegistryContext, StoreRef, VariableStore};
use crate::error::{EngineError, Result};
use crate::interp::Value;
use crate::optimize::optimize;
use crate::parser::parse;
use log::debug;
use std::rc::Rc;

/// Name of the variable holding the last result
pub const ANSWER: &str = "ans";

/// Host for the calculator session
///
/// Shares the session's variable store so `clear()` can reset it.
pub struct MathLibrary {
    store: StoreRef,
}

impl MathLibrary {
    pub fn new(store: StoreRef) -> Self {
        Self { store }
    }
}

impl Host for MathLibrary {
    fn register(registry: &mut Registry<Self>) {
        use ParamType::{Any, Number, NumberArray};

        math::register(registry);
        filter::register(registry);

        registry
            .method("linspace", true, &[Number, Number, Number], |_, args| {
                linspace(args[0].number()?, args[1].number()?, args[2].number()?)
            })
            .method("element", true, &[NumberArray, Number], |_, args| {
                element(args[0].numbers()?, args[1].number()?)
            })
            .method("len", true, &[Any], |_, args| match args[0].len() {
                Some(len) => Ok(Value::Number(len as f64)),
                None => Err(EngineError::new(format!(
                    "len requires an array, got {}",
                    args[0].type_name()
                ))),
            })
            .method("clear", false, &[], |lib, _| {
                lib.store.borrow_mut().clear();
                Ok(Value::Unit)
            });
    }
}

/// `count` evenly spaced values from `start` to exactly `end`
fn linspace(start: f64, end: f64, count: f64) -> Result<Value> {
    let count = count.floor();
    if !(1.0..=1e8).contains(&count) {
        return Err(EngineError::new(format!(
            "linspace count {count} has to be between 1 and 1e8"
        )));
    }
    let count = count as usize;
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };

    let mut values: Vec<f64> = (0..count - 1).map(|i| start + step * i as f64).collect();
    values.push(end);
    Ok(Value::NumberArray(values))
}

fn element(values: &[f64], index: f64) -> Result<Value> {
    let index = index.round_ties_even();
    if index < 0.0 || index >= values.len() as f64 {
        return Err(EngineError::new("element access out of range"));
    }
    Ok(Value::Number(values[index as usize]))
}

/// Interactive calculator state
pub struct Calculator {
    ctx: RegistryContext<MathLibrary>,
    optimize: bool,
}

impl Calculator {
    pub fn new() -> Self {
        let store = VariableStore::new().into_ref();
        let library = MathLibrary::new(Rc::clone(&store));
        Self {
            ctx: RegistryContext::with_store(library, store),
            optimize: true,
        }
    }

    /// Toggle constant folding before evaluation
    pub fn set_optimize(&mut self, optimize: bool) {
        self.optimize = optimize;
    }

    pub fn optimizes(&self) -> bool {
        self.optimize
    }

    pub fn context(&self) -> &RegistryContext<MathLibrary> {
        &self.ctx
    }

    /// Evaluate one input line and return the value of its last statement
    ///
    /// Statements are folded and evaluated one at a time, so later statements
    /// see the variables assigned by earlier ones. A non-unit result is
    /// stored as `ans`.
    pub fn evaluate(&self, input: &str) -> Result<Value> {
        let statements = parse(input.trim())?;

        let mut result = Value::Unit;
        for statement in &statements {
            result = match self.fold(statement) {
                Some(folded) => folded.eval(&self.ctx)?,
                None => statement.eval(&self.ctx)?,
            };
        }

        if result != Value::Unit {
            self.ctx.assign(ANSWER, result.clone())?;
        }
        debug!(
            "evaluated {} statement(s) to {}",
            statements.len(),
            result.type_name()
        );
        Ok(result)
    }

    /// Folded copy of `statement`, or `None` when folding is off or fails
    ///
    /// A failed constant-ness lookup leaves the statement to plain
    /// evaluation, which reports the error.
    fn fold(&self, statement: &Node) -> Option<Node> {
        if !self.optimize {
            return None;
        }
        match optimize(statement, Some(&self.ctx as &dyn Context)) {
            Ok(folded) => Some(folded),
            Err(err) => {
                debug!("folding skipped: {err}");
                None
            }
        }
    }

    /// Text shown for a result; unit renders as nothing
    pub fn render(value: &Value) -> String {
        match value {
            Value::Unit => String::new(),
            other => other.to_string(),
        }
    }

    /// User variables with their values, sorted by name
    pub fn variables(&self) -> Vec<(String, Value)> {
        self.ctx
            .variable_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.ctx.resolve(&name).ok()?;
                Some((name, value))
            })
            .collect()
    }

    /// Forget all user variables
    pub fn reset(&self) {
        self.ctx.reset();
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(calc: &Calculator, input: &str) -> Value {
        calc.evaluate(input).unwrap()
    }

    fn numbers(value: Value) -> Vec<f64> {
        match value {
            Value::NumberArray(values) => values,
            other => panic!("expected number[], got {other:?}"),
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    #[test]
    fn test_ans_holds_last_result() {
        let calc = Calculator::new();
        eval(&calc, "2 * 21");
        assert_eq!(eval(&calc, "ans + 1"), Value::Number(43.0));
    }

    #[test]
    fn test_variables_persist() {
        let calc = Calculator::new();
        eval(&calc, "x = [1, 2, 3]");
        assert_eq!(
            eval(&calc, "x * 2"),
            Value::NumberArray(vec![2.0, 4.0, 6.0])
        );
        let names: Vec<String> = calc.variables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["ans".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_statements_see_earlier_assignments() {
        for optimize in [true, false] {
            let mut calc = Calculator::new();
            calc.set_optimize(optimize);
            assert_eq!(eval(&calc, "a = 2; b = a * 3; b + 1"), Value::Number(7.0));
        }
    }

    #[test]
    fn test_input_is_trimmed() {
        let calc = Calculator::new();
        assert_eq!(eval(&calc, "  1 + 1  \n"), Value::Number(2.0));
    }

    #[test]
    fn test_clear_resets_variables() {
        let calc = Calculator::new();
        eval(&calc, "x = 5");
        assert_eq!(eval(&calc, "clear()"), Value::Unit);
        assert!(calc.variables().is_empty());
        assert_eq!(
            calc.evaluate("x").unwrap_err().message(),
            "Unknown variable or function: 'x'"
        );
    }

    #[test]
    fn test_unknown_name_error_with_and_without_folding() {
        for optimize in [true, false] {
            let mut calc = Calculator::new();
            calc.set_optimize(optimize);
            assert_eq!(
                calc.evaluate("x + 1").unwrap_err().message(),
                "Unknown variable or function: 'x'"
            );
            assert_eq!(
                calc.evaluate("nope(1)").unwrap_err().message(),
                "No function 'nope' found for arguments of type 'number'"
            );
        }
    }

    #[test]
    fn test_error_span_is_relative_to_trimmed_input() {
        let calc = Calculator::new();
        let err = calc.evaluate("   (1").unwrap_err();
        assert_eq!(err.message(), "Missing close parenthesis");
        assert_eq!(err.span(), Some(crate::ast::Span::point(2)));
    }

    #[test]
    fn test_reset() {
        let calc = Calculator::new();
        eval(&calc, "y = 1");
        calc.reset();
        assert!(calc.variables().is_empty());
    }

    #[test]
    fn test_variable_shadows_builtin() {
        let calc = Calculator::new();
        eval(&calc, "pi = 3");
        assert_eq!(eval(&calc, "pi"), Value::Number(3.0));
    }

    #[test]
    fn test_render() {
        assert_eq!(Calculator::render(&Value::Unit), "");
        assert_eq!(Calculator::render(&Value::Number(2.5)), "2.5");
        assert_eq!(Calculator::render(&Value::Text("hi".into())), "'hi'");
    }

    #[test]
    fn test_errors_propagate() {
        let calc = Calculator::new();
        assert!(calc.evaluate("1 +").is_err());
        assert!(calc.evaluate("nope(1)").is_err());
    }

    // ========================================================================
    // Library functions
    // ========================================================================

    #[test]
    fn test_linspace() {
        let calc = Calculator::new();
        assert_eq!(
            numbers(eval(&calc, "linspace(0, 1, 5)")),
            vec![0.0, 0.25, 0.5, 0.75, 1.0]
        );
        assert_eq!(numbers(eval(&calc, "linspace(2, 7, 1)")), vec![7.0]);
        assert!(calc.evaluate("linspace(0, 1, 0)").is_err());
    }

    #[test]
    fn test_linspace_ends_exactly() {
        let calc = Calculator::new();
        let values = numbers(eval(&calc, "linspace(0, 0.3, 7)"));
        assert_eq!(values.len(), 7);
        assert_eq!(values[6], 0.3);
    }

    #[test]
    fn test_element() {
        let calc = Calculator::new();
        assert_eq!(eval(&calc, "element([4, 5, 6], 1)"), Value::Number(5.0));
        assert_eq!(
            calc.evaluate("element([4, 5, 6], 3)").unwrap_err().message(),
            "element access out of range"
        );
    }

    #[test]
    fn test_len() {
        let calc = Calculator::new();
        assert_eq!(eval(&calc, "len([1, 2, 3])"), Value::Number(3.0));
        assert_eq!(eval(&calc, "len(['a'])"), Value::Number(1.0));
        assert_eq!(
            calc.evaluate("len(1)").unwrap_err().message(),
            "len requires an array, got number"
        );
    }

    #[test]
    fn test_filter_functions() {
        let calc = Calculator::new();
        let y = numbers(eval(&calc, "filter([1, 0.1], [1, 2, 3, 4])"));
        let expected = [1.0, 2.1, 3.2, 4.3];
        for (a, e) in y.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12);
        }

        let y = numbers(eval(&calc, "filtfilt([1, 0.1], linspace(1, 7, 7))"));
        for (i, v) in y.iter().enumerate() {
            assert!((v - 1.21 * (i + 1) as f64).abs() < 1e-8);
        }
    }

    #[test]
    fn test_fir_coefficients() {
        let calc = Calculator::new();
        assert_eq!(
            numbers(eval(&calc, "LowPassFIRCoefficients(10, 100, 4)")).len(),
            9
        );
        let sum: f64 = numbers(eval(&calc, "LowPassFIRCoefficients(10, 100, 4, 2)"))
            .iter()
            .sum();
        assert!((sum - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_low_pass_keeps_constant_signal() {
        let calc = Calculator::new();
        let y = numbers(eval(&calc, "LowPass(linspace(1, 1, 40), 5, 100)"));
        assert_eq!(y.len(), 40);
        for v in y {
            assert!((v - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_math_functions_available() {
        let calc = Calculator::new();
        assert_eq!(eval(&calc, "sqrt(16)"), Value::Number(4.0));
        assert_eq!(eval(&calc, "round(2.5)"), Value::Number(2.0));
    }

    #[test]
    fn test_clear_is_not_folded() {
        let calc = Calculator::new();
        assert!(!calc.context().is_constant_call("clear", &[]).unwrap());
    }
}

//! Broadcasting math functions and constants

use crate::context::{Host, ParamType, Registry};
use crate::interp::ops::{lift_binary, lift_unary};
use crate::interp::Value;
use std::f64::consts::{E, PI};

/// Host exposing the math constants and functions
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedMath;

impl Host for ExtendedMath {
    fn register(registry: &mut Registry<Self>) {
        register(registry);
    }
}

/// Bind the math constants and functions into any host's registry
///
/// All bindings are constant. Arguments are accepted untyped and lifted over
/// numbers and number arrays.
pub fn register<H: 'static>(registry: &mut Registry<H>) {
    registry
        .property("pi", true, |_| Ok(Value::Number(PI)))
        .property("e", true, |_| Ok(Value::Number(E)));

    unary(registry, "exp", f64::exp);
    unary(registry, "log", f64::ln);
    registry.method(
        "log",
        true,
        &[ParamType::Any, ParamType::Number],
        |_, args| {
            let base = args[1].number()?;
            lift_unary(&args[0], |x: &f64| x.log(base))
        },
    );
    unary(registry, "log10", f64::log10);
    unary(registry, "sqrt", f64::sqrt);
    unary(registry, "abs", f64::abs);

    // Trigonometry, radians and degrees
    unary(registry, "sin", f64::sin);
    unary(registry, "sind", |x| x.to_radians().sin());
    unary(registry, "cos", f64::cos);
    unary(registry, "cosd", |x| x.to_radians().cos());
    unary(registry, "tan", f64::tan);
    unary(registry, "tand", |x| x.to_radians().tan());
    unary(registry, "asin", f64::asin);
    unary(registry, "asind", |x| x.asin().to_degrees());
    unary(registry, "acos", f64::acos);
    unary(registry, "acosd", |x| x.acos().to_degrees());
    unary(registry, "atan", f64::atan);
    unary(registry, "atand", |x| x.atan().to_degrees());
    binary(registry, "atan2", f64::atan2);
    binary(registry, "atan2d", |y, x| y.atan2(x).to_degrees());
    unary(registry, "sinh", f64::sinh);
    unary(registry, "cosh", f64::cosh);
    unary(registry, "tanh", f64::tanh);

    // Rounding and comparison
    binary(registry, "mod", |x, y| x % y);
    unary(registry, "round", f64::round_ties_even);
    unary(registry, "floor", f64::floor);
    unary(registry, "ceil", f64::ceil);
    unary(registry, "sign", sign);
    binary(registry, "max", f64::max);
    binary(registry, "min", f64::min);
    binary(registry, "absmax", |x, y| if x.abs() > y.abs() { x } else { y });
}

fn sign(x: f64) -> f64 {
    if x == 0.0 { 0.0 } else { x.signum() }
}

fn unary<H: 'static>(registry: &mut Registry<H>, name: &str, f: fn(f64) -> f64) {
    registry.method(name, true, &[ParamType::Any], move |_, args| {
        lift_unary(&args[0], |x: &f64| f(*x))
    });
}

fn binary<H: 'static>(registry: &mut Registry<H>, name: &str, f: fn(f64, f64) -> f64) {
    registry.method(
        name,
        true,
        &[ParamType::Any, ParamType::Any],
        move |_, args| lift_binary(&args[0], &args[1], |x: &f64, y: &f64| f(*x, *y)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, RegistryContext};
    use crate::interp::evaluate;

    fn eval(source: &str) -> Value {
        evaluate(source, &RegistryContext::new(ExtendedMath)).unwrap()
    }

    fn eval_number(source: &str) -> f64 {
        match eval(source) {
            Value::Number(n) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_constants() {
        assert_close(eval_number("pi"), PI);
        assert_close(eval_number("e"), E);
    }

    #[test]
    fn test_constants_are_constant() {
        let ctx = RegistryContext::new(ExtendedMath);
        assert!(ctx.is_constant_variable("pi").unwrap());
        assert!(ctx
            .is_constant_call("sin", &[crate::interp::ValueType::NumberArray])
            .unwrap());
    }

    #[test]
    fn test_exp_and_log() {
        assert_close(eval_number("exp(0)"), 1.0);
        assert_close(eval_number("log(e)"), 1.0);
        assert_close(eval_number("log(8, 2)"), 3.0);
        assert_close(eval_number("log10(1000)"), 3.0);
    }

    #[test]
    fn test_log_base_must_be_number() {
        let err = evaluate("log(8, [2])", &RegistryContext::new(ExtendedMath)).unwrap_err();
        assert_eq!(
            err.message(),
            "No function 'log' found for arguments of type 'number, number[]'"
        );
    }

    #[test]
    fn test_degree_forms() {
        assert_close(eval_number("sind(90)"), 1.0);
        assert_close(eval_number("cosd(180)"), -1.0);
        assert_close(eval_number("atand(1)"), 45.0);
        assert_close(eval_number("atan2d(1, 0)"), 90.0);
    }

    #[test]
    fn test_functions_broadcast() {
        assert_eq!(
            eval("sqrt([1, 4, 9])"),
            Value::NumberArray(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(
            eval("max([1, 5], 3)"),
            Value::NumberArray(vec![3.0, 5.0])
        );
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(
            eval("round([0.5, 1.5, 2.5, -0.5])"),
            Value::NumberArray(vec![0.0, 2.0, 2.0, -0.0])
        );
    }

    #[test]
    fn test_sign_and_mod() {
        assert_eq!(
            eval("sign([-3, 0, 2])"),
            Value::NumberArray(vec![-1.0, 0.0, 1.0])
        );
        assert_close(eval_number("mod(7, 3)"), 1.0);
        assert_close(eval_number("mod(-7, 3)"), -1.0);
    }

    #[test]
    fn test_absmax() {
        assert_close(eval_number("absmax(-5, 3)"), -5.0);
        assert_eq!(
            eval("absmax([1, -4], [-2, 3])"),
            Value::NumberArray(vec![-2.0, -4.0])
        );
    }

    #[test]
    fn test_type_error_from_lifting() {
        let err = evaluate("sin('a')", &RegistryContext::new(ExtendedMath)).unwrap_err();
        assert_eq!(err.message(), "unary operation cannot handle type string");
    }
}

//! Runtime values for the interpreter

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime value
///
/// Arrays produced by the evaluator are never empty and always homogeneous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit floating point
    Number(f64),
    /// String
    Text(String),
    /// Boolean
    Bool(bool),
    /// Array of numbers
    NumberArray(Vec<f64>),
    /// Array of strings
    TextArray(Vec<String>),
    /// Array of booleans
    BoolArray(Vec<bool>),
    /// Result of an empty statement or a side-effect-only call
    Unit,
}

/// Runtime type of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Number,
    Text,
    Bool,
    NumberArray,
    TextArray,
    BoolArray,
    Unit,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Text => "string",
            ValueType::Bool => "bool",
            ValueType::NumberArray => "number[]",
            ValueType::TextArray => "string[]",
            ValueType::BoolArray => "bool[]",
            ValueType::Unit => "unit",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ValueType::NumberArray | ValueType::TextArray | ValueType::BoolArray
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Number,
            Value::Text(_) => ValueType::Text,
            Value::Bool(_) => ValueType::Bool,
            Value::NumberArray(_) => ValueType::NumberArray,
            Value::TextArray(_) => ValueType::TextArray,
            Value::BoolArray(_) => ValueType::BoolArray,
            Value::Unit => ValueType::Unit,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn is_array(&self) -> bool {
        self.value_type().is_array()
    }

    /// Number of elements of an array value
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::NumberArray(v) => Some(v.len()),
            Value::TextArray(v) => Some(v.len()),
            Value::BoolArray(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Value::NumberArray(v) => Some(v),
            _ => None,
        }
    }

    /// Number payload, or a type error naming the actual type
    pub fn number(&self) -> Result<f64> {
        self.as_number()
            .ok_or_else(|| expected(ValueType::Number, self))
    }

    /// Number array payload, or a type error naming the actual type
    pub fn numbers(&self) -> Result<&[f64]> {
        self.as_numbers()
            .ok_or_else(|| expected(ValueType::NumberArray, self))
    }

    pub fn text(&self) -> Result<&str> {
        self.as_text().ok_or_else(|| expected(ValueType::Text, self))
    }
}

fn expected(ty: ValueType, got: &Value) -> EngineError {
    EngineError::new(format!("expected {ty}, got {}", got.type_name()))
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::NumberArray(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::BoolArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextArray(v)
    }
}

/// Format a number with at most five significant digits
pub fn format_significant(x: f64) -> String {
    if x == 0.0 || !x.is_finite() {
        return format!("{x}");
    }
    let exponent = x.abs().log10().floor() as i32;
    if !(-5..5).contains(&exponent) {
        let text = format!("{x:.4e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{exp}", trim_fraction(mantissa)),
            None => text,
        };
    }
    let decimals = (4 - exponent).max(0) as usize;
    trim_fraction(&format!("{x:.decimals$}")).to_string()
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::NumberArray(v) => {
                let items: Vec<String> = v.iter().map(|n| format_significant(*n)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::TextArray(v) => {
                let items: Vec<String> = v.iter().map(|s| format!("'{s}'")).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::BoolArray(v) => {
                let items: Vec<String> = v.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Unit => write!(f, "()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Number(42.0)), "42");
        assert_eq!(format!("{}", Value::Number(3.25)), "3.25");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::from("abc")), "'abc'");
        assert_eq!(format!("{}", Value::Unit), "()");
    }

    #[test]
    fn test_array_display() {
        assert_eq!(Value::from(vec![1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_eq!(Value::from(vec![true, false]).to_string(), "[true, false]");
        assert_eq!(
            Value::from(vec!["a".to_string(), "b".to_string()]).to_string(),
            "['a', 'b']"
        );
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(1.0), "1");
        assert_eq!(format_significant(3.14159265), "3.1416");
        assert_eq!(format_significant(12345.678), "12346");
        assert_eq!(format_significant(0.000123456), "0.00012346");
        assert_eq!(format_significant(1234567.0), "1.2346e6");
        assert_eq!(format_significant(0.0), "0");
    }

    #[test]
    fn test_value_types() {
        assert_eq!(Value::Number(1.0).value_type(), ValueType::Number);
        assert_eq!(Value::from(vec![1.0]).type_name(), "number[]");
        assert_eq!(Value::Unit.type_name(), "unit");
        assert!(Value::from(vec![true]).is_array());
        assert!(!Value::Bool(true).is_array());
    }

    #[test]
    fn test_len() {
        assert_eq!(Value::from(vec![1.0, 2.0]).len(), Some(2));
        assert_eq!(Value::Number(1.0).len(), None);
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Value::Number(2.0).number().unwrap(), 2.0);
        assert_eq!(Value::from(vec![1.0]).numbers().unwrap(), &[1.0]);
        let err = Value::Bool(true).number().unwrap_err();
        assert_eq!(err.message(), "expected number, got bool");
        assert_eq!(Value::from("x").text().unwrap(), "x");
    }
}

//! Broadcasting operators
//!
//! Every operator lifts an element-wise function over scalars and arrays:
//! scalar with scalar gives a scalar, scalar with array maps, and two arrays
//! zip. When several operands are arrays, a length-1 array is first reduced to
//! its only element, trying operands from left to right.

use crate::ast::{BinaryOp, TernaryOp, UnaryOp};
use crate::error::{EngineError, Result};

use super::value::Value;

/// Absolute tolerance of numeric `==` and `!=`
pub const TOLERANCE: f64 = 1e-9;

/// Element type an operator can be lifted over
pub trait Element: Clone {
    fn scalar(value: &Value) -> Option<&Self>;
    fn array(value: &Value) -> Option<&[Self]>;
    fn into_scalar(self) -> Value;
    fn into_array(items: Vec<Self>) -> Value;
}

impl Element for f64 {
    fn scalar(value: &Value) -> Option<&Self> {
        match value {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    fn array(value: &Value) -> Option<&[Self]> {
        match value {
            Value::NumberArray(v) => Some(v),
            _ => None,
        }
    }

    fn into_scalar(self) -> Value {
        Value::Number(self)
    }

    fn into_array(items: Vec<Self>) -> Value {
        Value::NumberArray(items)
    }
}

impl Element for bool {
    fn scalar(value: &Value) -> Option<&Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn array(value: &Value) -> Option<&[Self]> {
        match value {
            Value::BoolArray(v) => Some(v),
            _ => None,
        }
    }

    fn into_scalar(self) -> Value {
        Value::Bool(self)
    }

    fn into_array(items: Vec<Self>) -> Value {
        Value::BoolArray(items)
    }
}

impl Element for String {
    fn scalar(value: &Value) -> Option<&Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn array(value: &Value) -> Option<&[Self]> {
        match value {
            Value::TextArray(v) => Some(v),
            _ => None,
        }
    }

    fn into_scalar(self) -> Value {
        Value::Text(self)
    }

    fn into_array(items: Vec<Self>) -> Value {
        Value::TextArray(items)
    }
}

/// A value viewed as either one element or a slice of elements
enum Operand<'a, T> {
    Scalar(&'a T),
    Array(&'a [T]),
}

impl<T> Clone for Operand<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Operand<'_, T> {}

impl<'a, T: Element> Operand<'a, T> {
    fn of(value: &'a Value) -> Option<Self> {
        T::scalar(value)
            .map(Operand::Scalar)
            .or_else(|| T::array(value).map(Operand::Array))
    }
}

impl<'a, T> Operand<'a, T> {
    fn len(&self) -> Option<usize> {
        match self {
            Operand::Scalar(_) => None,
            Operand::Array(items) => Some(items.len()),
        }
    }

    /// Length-1 array reduced to its element
    fn single(&self) -> Option<Self> {
        match *self {
            Operand::Array([item]) => Some(Operand::Scalar(item)),
            _ => None,
        }
    }

    fn at(&self, index: usize) -> &'a T {
        match *self {
            Operand::Scalar(item) => item,
            Operand::Array(items) => &items[index],
        }
    }
}

/// Common length of the array operands, `Ok(None)` when all are scalars
fn common_len(lens: &[Option<usize>]) -> std::result::Result<Option<usize>, ()> {
    let mut common = None;
    for len in lens.iter().flatten() {
        match common {
            None => common = Some(*len),
            Some(n) if n == *len => {}
            Some(_) => return Err(()),
        }
    }
    Ok(common)
}

fn collect<R: Element>(len: Option<usize>, item: impl Fn(usize) -> R) -> Value {
    match len {
        None => item(0).into_scalar(),
        Some(n) => R::into_array((0..n).map(item).collect()),
    }
}

// ============================================================================
// Lifting
// ============================================================================

/// Lift a unary element function over a scalar or array
pub fn lift_unary<A, R>(a: &Value, op: impl Fn(&A) -> R) -> Result<Value>
where
    A: Element,
    R: Element,
{
    match Operand::<A>::of(a) {
        Some(Operand::Scalar(x)) => Ok(op(x).into_scalar()),
        Some(Operand::Array(xs)) => Ok(R::into_array(xs.iter().map(op).collect())),
        None => Err(EngineError::new(format!(
            "unary operation cannot handle type {}",
            a.type_name()
        ))),
    }
}

/// Lift a binary element function over scalars and arrays
pub fn lift_binary<A, B, R>(a: &Value, b: &Value, op: impl Fn(&A, &B) -> R) -> Result<Value>
where
    A: Element,
    B: Element,
    R: Element,
{
    match (Operand::<A>::of(a), Operand::<B>::of(b)) {
        (Some(x), Some(y)) => broadcast2(x, y, &op),
        _ => Err(EngineError::new(format!(
            "binary operation cannot handle types {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn broadcast2<A, B, R>(x: Operand<A>, y: Operand<B>, op: &impl Fn(&A, &B) -> R) -> Result<Value>
where
    R: Element,
{
    if x.len().is_some() && y.len().is_some() {
        if let Some(x) = x.single() {
            return broadcast2(x, y, op);
        }
        if let Some(y) = y.single() {
            return broadcast2(x, y, op);
        }
    }
    let len = common_len(&[x.len(), y.len()]).map_err(|_| {
        EngineError::new("binary operation of different length arrays not defined")
    })?;
    Ok(collect(len, |i| op(x.at(i), y.at(i))))
}

/// Lift a ternary element function over scalars and arrays
pub fn lift_ternary<A, B, C, R>(
    a: &Value,
    b: &Value,
    c: &Value,
    op: impl Fn(&A, &B, &C) -> R,
) -> Result<Value>
where
    A: Element,
    B: Element,
    C: Element,
    R: Element,
{
    match (Operand::<A>::of(a), Operand::<B>::of(b), Operand::<C>::of(c)) {
        (Some(x), Some(y), Some(z)) => broadcast3(x, y, z, &op),
        _ => Err(ternary_type_error(a, b, c)),
    }
}

fn broadcast3<A, B, C, R>(
    x: Operand<A>,
    y: Operand<B>,
    z: Operand<C>,
    op: &impl Fn(&A, &B, &C) -> R,
) -> Result<Value>
where
    R: Element,
{
    let arrays = [x.len(), y.len(), z.len()];
    if arrays.iter().flatten().count() >= 2 {
        if let Some(x) = x.single() {
            return broadcast3(x, y, z, op);
        }
        if let Some(y) = y.single() {
            return broadcast3(x, y, z, op);
        }
        if let Some(z) = z.single() {
            return broadcast3(x, y, z, op);
        }
    }
    let len = common_len(&arrays).map_err(|_| {
        EngineError::new("ternary operation of different length arrays not defined")
    })?;
    Ok(collect(len, |i| op(x.at(i), y.at(i), z.at(i))))
}

fn ternary_type_error(a: &Value, b: &Value, c: &Value) -> EngineError {
    EngineError::new(format!(
        "ternary operation cannot handle types {}, {} and {}",
        a.type_name(),
        b.type_name(),
        c.type_name()
    ))
}

// ============================================================================
// Operators
// ============================================================================

/// Apply a unary operator
pub fn unary(op: UnaryOp, a: &Value) -> Result<Value> {
    match op {
        UnaryOp::Neg => lift_unary(a, |x: &f64| -x),
        UnaryOp::Not => lift_unary(a, |x: &bool| !x),
    }
}

/// Apply a binary operator (including element access)
pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => lift_binary(a, b, |x: &f64, y: &f64| x - y),
        BinaryOp::Mul => lift_binary(a, b, |x: &f64, y: &f64| x * y),
        BinaryOp::Div => lift_binary(a, b, |x: &f64, y: &f64| x / y),
        BinaryOp::Pow => lift_binary(a, b, |x: &f64, y: &f64| x.powf(*y)),
        BinaryOp::Lt => lift_binary(a, b, |x: &f64, y: &f64| x < y),
        BinaryOp::Le => lift_binary(a, b, |x: &f64, y: &f64| x <= y),
        BinaryOp::Gt => lift_binary(a, b, |x: &f64, y: &f64| x > y),
        BinaryOp::Ge => lift_binary(a, b, |x: &f64, y: &f64| x >= y),
        BinaryOp::Eq => equal(a, b, false),
        BinaryOp::Ne => equal(a, b, true),
        BinaryOp::And => lift_binary(a, b, |x: &bool, y: &bool| *x && *y),
        BinaryOp::Or => lift_binary(a, b, |x: &bool, y: &bool| *x || *y),
        BinaryOp::Index => element_access(a, b),
    }
}

/// Apply a ternary operator
pub fn ternary(op: TernaryOp, a: &Value, b: &Value, c: &Value) -> Result<Value> {
    match op {
        TernaryOp::Select => select(a, b, c),
    }
}

/// Addition, string concatenation, and number/string coercion
pub fn add(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Ok(Value::Text(format!("{x}{y}"))),
        (Value::Text(x), Value::Number(y)) => Ok(Value::Text(format!("{x}{y}"))),
        (Value::Number(x), Value::Text(y)) => Ok(Value::Text(format!("{x}{y}"))),
        (Value::TextArray(_), _) | (_, Value::TextArray(_)) => {
            lift_binary(a, b, |x: &String, y: &String| format!("{x}{y}"))
        }
        _ => lift_binary(a, b, |x: &f64, y: &f64| x + y),
    }
}

fn is_boolish(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::BoolArray(_))
}

/// `==` / `!=`: exact over booleans, tolerant over numbers
pub fn equal(a: &Value, b: &Value, negate: bool) -> Result<Value> {
    if is_boolish(a) && is_boolish(b) {
        lift_binary(a, b, |x: &bool, y: &bool| (x == y) != negate)
    } else {
        lift_binary(a, b, |x: &f64, y: &f64| ((x - y).abs() <= TOLERANCE) != negate)
    }
}

fn pick<T: Clone>(cond: &bool, then_value: &T, else_value: &T) -> T {
    if *cond {
        then_value.clone()
    } else {
        else_value.clone()
    }
}

/// `cond ? a : b` over a boolean condition and same-kind branches
pub fn select(cond: &Value, then_value: &Value, else_value: &Value) -> Result<Value> {
    let numbers = |v: &Value| matches!(v, Value::Number(_) | Value::NumberArray(_));
    let texts = |v: &Value| matches!(v, Value::Text(_) | Value::TextArray(_));

    if numbers(then_value) && numbers(else_value) {
        lift_ternary(cond, then_value, else_value, pick::<f64>)
    } else if texts(then_value) && texts(else_value) {
        lift_ternary(cond, then_value, else_value, pick::<String>)
    } else if is_boolish(then_value) && is_boolish(else_value) {
        lift_ternary(cond, then_value, else_value, pick::<bool>)
    } else {
        Err(ternary_type_error(cond, then_value, else_value))
    }
}

/// `array[index]` with a rounded numeric index; negative indices count from the end
pub fn element_access(array: &Value, index: &Value) -> Result<Value> {
    match (array, index) {
        (Value::NumberArray(v), Value::Number(raw)) => Ok(Value::Number(v[array_index(v.len(), *raw)?])),
        (Value::TextArray(v), Value::Number(raw)) => {
            Ok(Value::Text(v[array_index(v.len(), *raw)?].clone()))
        }
        (Value::BoolArray(v), Value::Number(raw)) => Ok(Value::Bool(v[array_index(v.len(), *raw)?])),
        _ => Err(EngineError::new(format!(
            "array element access not defined for types {}[{}]",
            array.type_name(),
            index.type_name()
        ))),
    }
}

fn array_index(len: usize, raw: f64) -> Result<usize> {
    let last = len as i64 - 1;
    let rounded = raw.round_ties_even();
    if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
        return Err(EngineError::new(format!(
            "array index {rounded} is out of range 0...{last}"
        )));
    }

    let mut idx = rounded as i64;
    if idx < 0 {
        idx += len as i64;
    }
    if !(0..=last).contains(&idx) {
        return Err(EngineError::new(format!(
            "array index {idx} is out of range 0...{last}"
        )));
    }
    Ok(idx as usize)
}

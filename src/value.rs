//! The EvilStack runtime value model and its coercion rules.

use std::cmp::Ordering;
use std::fmt;

use crate::vm::OperationError;

/// A runtime value. Values are immutable once pushed; every operation
/// consumes its operands and produces new values.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A binary arithmetic operator. The left operand is the value pushed
/// earlier (`second`), the right operand the value pushed later (`top`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

/// Computes `a OP b`.
///
/// Integer operands stay exact (`IntegerOverflow` instead of wrapping);
/// a float on either side promotes the other operand to float. Text does
/// not take part in arithmetic. A zero divisor fails with
/// `DivisionByZero` for both integers and floats, so no infinity or NaN
/// is ever produced by `div`/`mod`.
pub fn arith(op: ArithOp, a: Value, b: Value) -> Result<Value, OperationError> {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => arith_int(op, a, b),
        (Value::Float(a), Value::Float(b)) => arith_float(op, a, b),
        (Value::Integer(a), Value::Float(b)) => arith_float(op, a as f64, b),
        (Value::Float(a), Value::Integer(b)) => arith_float(op, a, b as f64),
        (a, b) => Err(OperationError::TypeError {
            operation: op.mnemonic(),
            found: format!("{} and {}", a.type_name(), b.type_name()),
        }),
    }
}

fn arith_int(op: ArithOp, a: i64, b: i64) -> Result<Value, OperationError> {
    if matches!(op, ArithOp::Div | ArithOp::Mod) && b == 0 {
        return Err(OperationError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        // Truncates toward zero; the remainder keeps the dividend's sign.
        ArithOp::Div => a.checked_div(b),
        ArithOp::Mod => a.checked_rem(b),
    };
    result.map(Value::Integer).ok_or(OperationError::IntegerOverflow)
}

fn arith_float(op: ArithOp, a: f64, b: f64) -> Result<Value, OperationError> {
    if matches!(op, ArithOp::Div | ArithOp::Mod) && b == 0.0 {
        return Err(OperationError::DivisionByZero);
    }
    Ok(Value::Float(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Mod => a % b,
    }))
}

/// Orders `a` against `b` for `cmp`.
///
/// Numbers compare numerically with the same cross-type promotion as
/// arithmetic, text compares lexicographically. Mixing text with a
/// number is a type error, and so is a NaN on either side: the flag
/// register only ever holds a total ordering.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, OperationError> {
    let type_error = || OperationError::TypeError {
        operation: "cmp",
        found: format!("{} and {}", a.type_name(), b.type_name()),
    };
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or_else(type_error),
        (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b).ok_or_else(type_error),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)).ok_or_else(type_error),
        _ => Err(type_error()),
    }
}

//! Runtime values and operator semantics.
//!
//! Integer arithmetic follows the usual scripting-language rules: `/` always
//! yields a float, `//` floors, `%` takes the sign of the divisor and mixing
//! an integer with a float yields a float.

use super::ExprError;
use super::parser::{BinaryOp, UnaryOp};
use crate::color::Color;
use crate::number::Number;
use std::fmt;

/// Result of evaluating an expression or sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    /// Multi-valued results of `frexp` and `modf`.
    Tuple(Vec<Number>),
    Color(Color),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(n) => n.type_name(),
            Value::Tuple(_) => "tuple",
            Value::Color(_) => "color",
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Value::Color(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Value::Color(c) => write!(f, "{}", c),
        }
    }
}

fn overflow() -> ExprError {
    ExprError::Domain("integer overflow".to_string())
}

fn unsupported(op: BinaryOp, a: Number, b: Number) -> ExprError {
    ExprError::Type(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op.symbol(),
        a.type_name(),
        b.type_name()
    ))
}

pub fn unary(op: UnaryOp, operand: Number) -> Result<Number, ExprError> {
    match (op, operand) {
        (UnaryOp::Pos, n) => Ok(n),
        (UnaryOp::Neg, Number::Int(i)) => i.checked_neg().map(Number::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Number::Float(f)) => Ok(Number::Float(-f)),
    }
}

pub fn binary(op: BinaryOp, a: Number, b: Number) -> Result<Number, ExprError> {
    use Number::{Float, Int};

    match op {
        BinaryOp::Add => match (a, b) {
            (Int(x), Int(y)) => x.checked_add(y).map(Int).ok_or_else(overflow),
            _ => Ok(Float(a.as_f64() + b.as_f64())),
        },
        BinaryOp::Sub => match (a, b) {
            (Int(x), Int(y)) => x.checked_sub(y).map(Int).ok_or_else(overflow),
            _ => Ok(Float(a.as_f64() - b.as_f64())),
        },
        BinaryOp::Mul => match (a, b) {
            (Int(x), Int(y)) => x.checked_mul(y).map(Int).ok_or_else(overflow),
            _ => Ok(Float(a.as_f64() * b.as_f64())),
        },
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(ExprError::Division("division by zero".to_string()));
            }
            Ok(Float(a.as_f64() / b.as_f64()))
        }
        BinaryOp::FloorDiv => {
            if b.is_zero() {
                return Err(ExprError::Division("integer division or modulo by zero".to_string()));
            }
            match (a, b) {
                (Int(x), Int(y)) => floor_div(x, y).map(Int),
                _ => Ok(Float((a.as_f64() / b.as_f64()).floor())),
            }
        }
        BinaryOp::Mod => {
            if b.is_zero() {
                return Err(ExprError::Division("integer division or modulo by zero".to_string()));
            }
            match (a, b) {
                (Int(x), Int(y)) => Ok(Int(x - floor_div(x, y)? * y)),
                _ => Ok(Float(float_mod(a.as_f64(), b.as_f64()))),
            }
        }
        BinaryOp::Pow => power(a, b),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let (Int(x), Int(y)) = (a, b) else {
                return Err(unsupported(op, a, b));
            };
            bitwise(op, x, y)
        }
    }
}

fn floor_div(x: i64, y: i64) -> Result<i64, ExprError> {
    let q = x.checked_div(y).ok_or_else(overflow)?;
    // Truncation rounds towards zero; step down when the signs differ.
    if x % y != 0 && (x < 0) != (y < 0) { Ok(q - 1) } else { Ok(q) }
}

fn float_mod(x: f64, y: f64) -> f64 {
    let r = x % y;
    if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r }
}

fn power(a: Number, b: Number) -> Result<Number, ExprError> {
    use Number::{Float, Int};

    match (a, b) {
        (Int(x), Int(y)) if y >= 0 => {
            let exp = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exp).map(Int).ok_or_else(overflow)
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if x == 0.0 && y < 0.0 {
                return Err(ExprError::Division("0.0 cannot be raised to a negative power".to_string()));
            }
            if x < 0.0 && y.is_finite() && y.fract() != 0.0 {
                return Err(ExprError::Domain(
                    "negative number cannot be raised to a fractional power".to_string(),
                ));
            }
            let r = x.powf(y);
            if r.is_infinite() && x.is_finite() && y.is_finite() {
                return Err(ExprError::Domain("math range error".to_string()));
            }
            Ok(Float(r))
        }
    }
}

fn bitwise(op: BinaryOp, x: i64, y: i64) -> Result<Number, ExprError> {
    let value = match op {
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::Shl | BinaryOp::Shr if y < 0 => {
            return Err(ExprError::Domain("negative shift count".to_string()));
        }
        BinaryOp::Shl => {
            if x == 0 {
                0
            } else {
                let shifted = if y >= 63 { None } else { x.checked_mul(1i64 << y) };
                shifted.ok_or_else(overflow)?
            }
        }
        BinaryOp::Shr => {
            if y >= 63 {
                if x < 0 { -1 } else { 0 }
            } else {
                x >> y
            }
        }
        _ => return Err(unsupported(op, Number::Int(x), Number::Int(y))),
    };
    Ok(Number::Int(value))
}

//! Scalar numbers shared by the evaluator and the formatter.

use std::fmt;

/// A scalar that keeps track of whether it is an integer.
///
/// Integer-ness matters for bitwise operators, floor division results and
/// for output templates (`{0:02x}` only accepts integers).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Value as a float, regardless of the variant.
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// Type name used in error messages.
    pub fn type_name(self) -> &'static str {
        match self {
            Number::Int(_) => "int",
            Number::Float(_) => "float",
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write_float(f, v),
        }
    }
}

/// Floats always show a fractional part so `1.0` is not mistaken for `1`.
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else if v == v.trunc() && v.abs() < 1e16 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Number::Int(42).to_string(), "42");
        assert_eq!(Number::Float(1.0).to_string(), "1.0");
        assert_eq!(Number::Float(0.25).to_string(), "0.25");
        assert_eq!(Number::Float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Number::Float(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn test_zero_and_conversion() {
        assert!(Number::Int(0).is_zero());
        assert!(Number::Float(-0.0).is_zero());
        assert!(!Number::Float(0.1).is_zero());
        assert_eq!(Number::Int(3).as_f64(), 3.0);
        assert!(Number::from(3i64).is_int());
        assert!(!Number::from(3.0).is_int());
    }
}

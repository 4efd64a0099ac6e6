//! The closed set of constants and functions an expression can call.
//!
//! Math functions raise a domain error when a finite input produces NaN or
//! an infinite result, e.g. `acos(2)`, `log(0)` or `exp(1000)`.

use super::ExprError;
use super::value::Value;
use crate::number::Number;

/// How a builtin consumes its arguments.
#[derive(Clone, Copy)]
enum Builtin {
    /// One real argument, float result.
    Unary(fn(f64) -> f64),
    /// Two real arguments, float result.
    Binary(fn(f64, f64) -> f64),
    /// Own arity and type handling.
    Special(fn(&[Value]) -> Result<Value, ExprError>),
}

const FUNCTIONS: &[(&str, Builtin)] = &[
    ("int", Builtin::Special(int_of)),
    ("float", Builtin::Special(float_of)),
    ("abs", Builtin::Special(abs)),
    ("min", Builtin::Special(min)),
    ("max", Builtin::Special(max)),
    ("acos", Builtin::Unary(f64::acos)),
    ("acosh", Builtin::Unary(f64::acosh)),
    ("asin", Builtin::Unary(f64::asin)),
    ("asinh", Builtin::Unary(f64::asinh)),
    ("atan", Builtin::Unary(f64::atan)),
    ("atan2", Builtin::Binary(f64::atan2)),
    ("atanh", Builtin::Unary(f64::atanh)),
    ("ceil", Builtin::Special(ceil)),
    ("copysign", Builtin::Binary(f64::copysign)),
    ("cos", Builtin::Unary(f64::cos)),
    ("cosh", Builtin::Unary(f64::cosh)),
    ("degrees", Builtin::Unary(f64::to_degrees)),
    ("erf", Builtin::Unary(libm::erf)),
    ("erfc", Builtin::Unary(libm::erfc)),
    ("exp", Builtin::Unary(f64::exp)),
    ("expm1", Builtin::Unary(f64::exp_m1)),
    ("fabs", Builtin::Unary(f64::abs)),
    ("floor", Builtin::Special(floor)),
    ("fmod", Builtin::Binary(libm::fmod)),
    ("frexp", Builtin::Special(frexp)),
    ("gamma", Builtin::Unary(libm::tgamma)),
    ("gcd", Builtin::Special(gcd)),
    ("hypot", Builtin::Special(hypot)),
    ("ldexp", Builtin::Special(ldexp)),
    ("lgamma", Builtin::Unary(libm::lgamma)),
    ("log", Builtin::Special(log)),
    ("log10", Builtin::Unary(f64::log10)),
    ("log1p", Builtin::Unary(f64::ln_1p)),
    ("log2", Builtin::Unary(f64::log2)),
    ("modf", Builtin::Special(modf)),
    ("pow", Builtin::Binary(f64::powf)),
    ("radians", Builtin::Unary(f64::to_radians)),
    ("sin", Builtin::Unary(f64::sin)),
    ("sinh", Builtin::Unary(f64::sinh)),
    ("sqrt", Builtin::Unary(f64::sqrt)),
    ("tan", Builtin::Unary(f64::tan)),
    ("tanh", Builtin::Unary(f64::tanh)),
    ("trunc", Builtin::Special(trunc)),
];

/// Value of a named constant.
pub fn constant(name: &str) -> Option<Number> {
    match name {
        "pi" => Some(Number::Float(std::f64::consts::PI)),
        "e" => Some(Number::Float(std::f64::consts::E)),
        _ => None,
    }
}

pub fn is_function(name: &str) -> bool {
    lookup(name).is_some()
}

/// Call a whitelisted function; `None` if `name` is not one.
pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, ExprError>> {
    let result = match lookup(name)? {
        Builtin::Unary(f) => arity(name, args, 1).and_then(|_| {
            let x = real(name, &args[0])?.as_f64();
            checked(f(x), &[x]).map(float)
        }),
        Builtin::Binary(f) => arity(name, args, 2).and_then(|_| {
            let x = real(name, &args[0])?.as_f64();
            let y = real(name, &args[1])?.as_f64();
            checked(f(x, y), &[x, y]).map(float)
        }),
        Builtin::Special(f) => f(args),
    };
    Some(result)
}

fn lookup(name: &str) -> Option<Builtin> {
    FUNCTIONS.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
}

fn float(x: f64) -> Value {
    Value::Number(Number::Float(x))
}

fn int(i: i64) -> Value {
    Value::Number(Number::Int(i))
}

fn domain() -> ExprError {
    ExprError::Domain("math domain error".to_string())
}

/// Reject NaN from non-NaN inputs and infinities from finite inputs.
fn checked(result: f64, inputs: &[f64]) -> Result<f64, ExprError> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        return Err(domain());
    }
    if result.is_infinite() && inputs.iter().all(|x| x.is_finite()) {
        return Err(ExprError::Domain("math range error".to_string()));
    }
    Ok(result)
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), ExprError> {
    if args.len() != expected {
        return Err(ExprError::Type(format!(
            "{}() takes exactly {} argument{} ({} given)",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn real(name: &str, value: &Value) -> Result<Number, ExprError> {
    value.as_number().ok_or_else(|| {
        ExprError::Type(format!("{}() argument must be a real number, not {}", name, value.type_name()))
    })
}

fn integer(name: &str, value: &Value) -> Result<i64, ExprError> {
    match real(name, value)? {
        Number::Int(i) => Ok(i),
        Number::Float(_) => Err(ExprError::Type(format!("{}() argument must be an integer, not float", name))),
    }
}

/// Float to integer conversion for `int`, `ceil`, `floor` and `trunc`.
fn to_int(f: f64) -> Result<i64, ExprError> {
    if f.is_nan() {
        return Err(ExprError::Domain("cannot convert float NaN to integer".to_string()));
    }
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if f.is_infinite() || f >= i64::MAX as f64 || f < i64::MIN as f64 {
        return Err(ExprError::Domain("cannot convert float to integer: out of range".to_string()));
    }
    Ok(f as i64)
}

fn rounding(name: &str, args: &[Value], round: fn(f64) -> f64) -> Result<Value, ExprError> {
    arity(name, args, 1)?;
    match real(name, &args[0])? {
        Number::Int(i) => Ok(int(i)),
        Number::Float(f) => to_int(round(f)).map(int),
    }
}

fn int_of(args: &[Value]) -> Result<Value, ExprError> {
    rounding("int", args, f64::trunc)
}

fn trunc(args: &[Value]) -> Result<Value, ExprError> {
    rounding("trunc", args, f64::trunc)
}

fn ceil(args: &[Value]) -> Result<Value, ExprError> {
    rounding("ceil", args, f64::ceil)
}

fn floor(args: &[Value]) -> Result<Value, ExprError> {
    rounding("floor", args, f64::floor)
}

fn float_of(args: &[Value]) -> Result<Value, ExprError> {
    arity("float", args, 1)?;
    Ok(float(real("float", &args[0])?.as_f64()))
}

fn abs(args: &[Value]) -> Result<Value, ExprError> {
    arity("abs", args, 1)?;
    match real("abs", &args[0])? {
        Number::Int(i) => i
            .checked_abs()
            .map(int)
            .ok_or_else(|| ExprError::Domain("integer overflow".to_string())),
        Number::Float(f) => Ok(float(f.abs())),
    }
}

/// Candidates for `min`/`max`: two or more scalars, or a single tuple.
fn candidates(name: &str, args: &[Value]) -> Result<Vec<Number>, ExprError> {
    match args {
        [] => Err(ExprError::Type(format!("{}() expected at least 1 argument, got 0", name))),
        [Value::Tuple(items)] if !items.is_empty() => Ok(items.clone()),
        [Value::Tuple(_)] => Err(ExprError::Domain(format!("{}() arg is an empty sequence", name))),
        [single] => Err(ExprError::Type(format!("'{}' object is not iterable", single.type_name()))),
        many => many.iter().map(|v| real(name, v)).collect(),
    }
}

/// Pick the extreme element; ties keep the first one.
fn extreme(name: &str, args: &[Value], better: fn(f64, f64) -> bool) -> Result<Value, ExprError> {
    let items = candidates(name, args)?;
    let mut best = items[0];
    for item in &items[1..] {
        if better(item.as_f64(), best.as_f64()) {
            best = *item;
        }
    }
    Ok(Value::Number(best))
}

fn min(args: &[Value]) -> Result<Value, ExprError> {
    extreme("min", args, |a, b| a < b)
}

fn max(args: &[Value]) -> Result<Value, ExprError> {
    extreme("max", args, |a, b| a > b)
}

fn frexp(args: &[Value]) -> Result<Value, ExprError> {
    arity("frexp", args, 1)?;
    let x = real("frexp", &args[0])?.as_f64();
    let (mantissa, exponent) = libm::frexp(x);
    Ok(Value::Tuple(vec![Number::Float(mantissa), Number::Int(exponent as i64)]))
}

fn modf(args: &[Value]) -> Result<Value, ExprError> {
    arity("modf", args, 1)?;
    let x = real("modf", &args[0])?.as_f64();
    let (fractional, integral) = libm::modf(x);
    Ok(Value::Tuple(vec![Number::Float(fractional), Number::Float(integral)]))
}

fn ldexp(args: &[Value]) -> Result<Value, ExprError> {
    arity("ldexp", args, 2)?;
    let x = real("ldexp", &args[0])?.as_f64();
    let exp = integer("ldexp", &args[1])?;
    let exp = exp.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    checked(libm::ldexp(x, exp), &[x]).map(float)
}

fn gcd(args: &[Value]) -> Result<Value, ExprError> {
    let mut acc: u64 = 0;
    for arg in args {
        let mut b = integer("gcd", arg)?.unsigned_abs();
        let mut a = acc;
        while b != 0 {
            (a, b) = (b, a % b);
        }
        acc = a;
    }
    i64::try_from(acc)
        .map(int)
        .map_err(|_| ExprError::Domain("integer overflow".to_string()))
}

fn hypot(args: &[Value]) -> Result<Value, ExprError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(real("hypot", arg)?.as_f64());
    }
    let result = values.iter().fold(0.0_f64, |acc, x| acc.hypot(*x));
    checked(result, &values).map(float)
}

fn log(args: &[Value]) -> Result<Value, ExprError> {
    match args {
        [x] => {
            let x = real("log", x)?.as_f64();
            checked(x.ln(), &[x]).map(float)
        }
        [x, base] => {
            let x = real("log", x)?.as_f64();
            let base = real("log", base)?.as_f64();
            let num = checked(x.ln(), &[x])?;
            let den = checked(base.ln(), &[base])?;
            if den == 0.0 {
                return Err(ExprError::Division("float division by zero".to_string()));
            }
            Ok(float(num / den))
        }
        _ => Err(ExprError::Type(format!(
            "log() takes 1 or 2 arguments ({} given)",
            args.len()
        ))),
    }
}

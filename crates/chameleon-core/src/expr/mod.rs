//! Conversion expressions.
//!
//! A small arithmetic language over color channels, e.g. `hls(h, l1, s)`.
//! Expressions are parsed into a tree and evaluated against an
//! [`Environment`]; the only callables are the whitelisted builtins and the
//! color constructors `rgb`, `hls`, `hsv` and `yiq`.

mod builtins;
mod env;
mod lexer;
mod parser;
mod value;

pub use env::Environment;
pub use value::Value;

use crate::color::{Color, ColorSpace};
use crate::number::Number;
use parser::{Expr, Parser};
use thiserror::Error;

/// Expression errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Syntax error at column {}: {message}", .offset + 1)]
    Syntax { offset: usize, message: String },
    #[error("Unbound name '{0}'")]
    UnboundName(String),
    #[error("Domain error: {0}")]
    Domain(String),
    #[error("Division error: {0}")]
    Division(String),
    #[error("Type error: {0}")]
    Type(String),
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// A parsed expression, ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
    spaces: Vec<ColorSpace>,
    references: usize,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Color spaces referenced by name, in order of first appearance.
    pub fn spaces(&self) -> &[ColorSpace] {
        &self.spaces
    }

    /// Highest reference index used, e.g. 2 for `hls(h, l2, s1)`. Zero when
    /// the expression only reads the current sample.
    pub fn references(&self) -> usize {
        self.references
    }

    /// Evaluate and require a color result.
    pub fn apply(&self, env: &Environment) -> Result<Color, ExprError> {
        match evaluate(self, env)? {
            Value::Color(color) => Ok(color),
            other => Err(ExprError::Type(format!(
                "conversion must produce a color, e.g. rgb(r, g, b), not {}",
                other.type_name()
            ))),
        }
    }
}

/// Parse an expression.
pub fn parse(source: &str) -> Result<CompiledExpression, ExprError> {
    let tokens = lexer::tokenize(source)?;
    let root = Parser::new(&tokens, source.len()).parse()?;
    let mut spaces = Vec::new();
    let mut references = 0;
    collect_names(&root, &mut spaces, &mut references);
    Ok(CompiledExpression {
        source: source.to_string(),
        root,
        spaces,
        references,
    })
}

/// Record named color spaces in order of first appearance and the highest
/// indexed channel variable.
fn collect_names(expr: &Expr, spaces: &mut Vec<ColorSpace>, references: &mut usize) {
    let mut note = |name: &str| {
        if let Some(space) = ColorSpace::from_name(name)
            && !spaces.contains(&space)
        {
            spaces.push(space);
        }
    };
    match expr {
        Expr::Int(_) | Expr::Float(_) => {}
        Expr::Name(name) => {
            note(name);
            if let Some(index) = reference_index(name) {
                *references = (*references).max(index);
            }
        }
        Expr::Unary(_, operand) => collect_names(operand, spaces, references),
        Expr::Binary(_, left, right) => {
            collect_names(left, spaces, references);
            collect_names(right, spaces, references);
        }
        Expr::Call(name, args) => {
            note(name);
            for arg in args {
                collect_names(arg, spaces, references);
            }
        }
    }
}

/// Index of a channel variable such as `l2`, if `name` is one.
fn reference_index(name: &str) -> Option<usize> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let digits = chars.as_str();
    let is_channel = ColorSpace::ALL.iter().any(|space| space.channel_names().contains(&letter));
    if !is_channel || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Evaluate a compiled expression.
pub fn evaluate(expr: &CompiledExpression, env: &Environment) -> Result<Value, ExprError> {
    eval(&expr.root, env)
}

fn eval(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Int(i) => Ok(Value::Number(Number::Int(*i))),
        Expr::Float(f) => Ok(Value::Number(Number::Float(*f))),
        Expr::Name(name) => lookup(name, env).map(Value::from),
        Expr::Unary(op, operand) => {
            let value = eval(operand, env)?;
            let n = scalar(&value, || format!("bad operand type for unary operator: '{}'", value.type_name()))?;
            value::unary(*op, n).map(Value::from)
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            let operands = || {
                format!(
                    "unsupported operand types for {}: '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                )
            };
            let a = scalar(&left, operands)?;
            let b = scalar(&right, operands)?;
            value::binary(*op, a, b).map(Value::from)
        }
        Expr::Call(name, args) => call(name, args, env),
    }
}

fn scalar(value: &Value, message: impl FnOnce() -> String) -> Result<Number, ExprError> {
    value.as_number().ok_or_else(|| ExprError::Type(message()))
}

fn lookup(name: &str, env: &Environment) -> Result<Number, ExprError> {
    if let Some(n) = env.get(name).or_else(|| builtins::constant(name)) {
        return Ok(n);
    }
    if builtins::is_function(name) || ColorSpace::from_name(name).is_some() {
        return Err(ExprError::Type(format!("'{}' is a function and must be called", name)));
    }
    Err(ExprError::UnboundName(name.to_string()))
}

fn call(name: &str, args: &[Expr], env: &Environment) -> Result<Value, ExprError> {
    let space = ColorSpace::from_name(name);
    if space.is_none() && !builtins::is_function(name) {
        // Resolve the name first so `h(1)` reports the right problem.
        let n = lookup(name, env)?;
        return Err(ExprError::Type(format!("'{}' object is not callable", n.type_name())));
    }

    let values = args.iter().map(|arg| eval(arg, env)).collect::<Result<Vec<_>, _>>()?;

    match space {
        Some(space) => construct(space, &values).map(Value::from),
        None => builtins::call(name, &values).unwrap_or_else(|| Err(ExprError::UnboundName(name.to_string()))),
    }
}

/// `rgb(r, g, b)` and friends: three scalars in the conventions of `space`.
fn construct(space: ColorSpace, values: &[Value]) -> Result<Color, ExprError> {
    let [a, b, c] = values else {
        return Err(ExprError::Type(format!(
            "{}() takes exactly 3 arguments ({} given)",
            space,
            values.len()
        )));
    };
    let mut channels = [0.0; 3];
    for (slot, value) in channels.iter_mut().zip([a, b, c]) {
        *slot = scalar(value, || format!("{}() channels must be numbers, not {}", space, value.type_name()))?.as_f64();
    }
    Ok(Color::new(space, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn eval_str(source: &str) -> Result<Value, ExprError> {
        evaluate(&parse(source)?, &Environment::empty())
    }

    fn num(source: &str) -> Number {
        eval_str(source).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_rgb_constructor() {
        let value = eval_str("rgb(255,0,0)").unwrap();
        let color = value.as_color().unwrap();
        assert_eq!(color.space(), ColorSpace::Rgb);
        assert_eq!(color.to_rgb(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(eval_str("1/0"), Err(ExprError::Division(_))));
        assert!(matches!(eval_str("acos(2)"), Err(ExprError::Domain(_))));
        assert!(matches!(eval_str("foo(1)"), Err(ExprError::UnboundName(name)) if name == "foo"));
        assert!(matches!(parse("(1+2"), Err(ExprError::Syntax { .. })));
        assert!(matches!(eval_str("x + 1"), Err(ExprError::UnboundName(_))));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(num("1 + 2 * 3"), Number::Int(7));
        assert_eq!(num("(1 + 2) * 3"), Number::Int(9));
        assert_eq!(num("7 // 2 + 7 % 2"), Number::Int(4));
        assert_eq!(num("-2 ** 2"), Number::Int(-4));
        assert_eq!(num("2 ** 3 ** 2"), Number::Int(512));
        assert_eq!(num("0xff & 0x0f | 0x30 ^ 1"), Number::Int(0x3f));
        assert_eq!(num("1 << 4 >> 2"), Number::Int(4));
        assert_eq!(num("10 / 4"), Number::Float(2.5));
        assert_eq!(num("--3"), Number::Int(3));
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(num("int(pi)"), Number::Int(3));
        assert_eq!(num("max(1, 5, 3)"), Number::Int(5));
        assert_eq!(num("floor(e)"), Number::Int(2));
        assert_eq!(num("abs(-1)"), Number::Int(1));
        assert_eq!(eval_str("frexp(8)").unwrap().to_string(), "(0.5, 4)");
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(eval_str("1.5 & 1"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("sin + 1"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("pi(1)"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("rgb(1, 2)"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("rgb(1, 2, 3) + 1"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("rgb(frexp(1), 2, 3)"), Err(ExprError::Type(_))));
        assert!(matches!(eval_str("-rgb(1, 2, 3)"), Err(ExprError::Type(_))));
    }

    #[test]
    fn test_unknown_name_checked_before_arguments() {
        assert!(matches!(eval_str("foo(1/0)"), Err(ExprError::UnboundName(_))));
    }

    #[test]
    fn test_spaces_in_source_order() {
        assert_eq!(parse("hsv(h, s, v)").unwrap().spaces(), &[ColorSpace::Hsv]);
        let expr = parse("yiq(y, i, q1 + rgb(1, 2, 3) * 0 + hls(0, 0, 0) * 0)").unwrap();
        assert_eq!(expr.spaces(), &[ColorSpace::Yiq, ColorSpace::Rgb, ColorSpace::Hls]);
        assert!(parse("sin(1)").unwrap().spaces().is_empty());
    }

    #[test]
    fn test_same_lightness() {
        let expr = parse("hls(h, l1, s)").unwrap();
        let reference = Rgb::new(200, 200, 200);
        let env = Environment::for_sample(Rgb::new(255, 0, 0), &[reference], expr.spaces());
        let color = expr.apply(&env).unwrap();
        assert_eq!(color.space(), ColorSpace::Hls);
        let lightness = |rgb: Rgb| Color::from_rgb(rgb).convert(ColorSpace::Hls).channels()[1];
        assert!((lightness(color.to_rgb()) - lightness(reference)).abs() < 0.01);
        assert_eq!(color.to_rgb(), Rgb::new(255, 145, 145));
    }

    #[test]
    fn test_constructor_space_wins() {
        // Channels named after HLS but interpreted as RGB.
        let expr = parse("rgb(h, l * 255, s * 255)").unwrap();
        let env = Environment::for_sample(Rgb::new(0, 0, 255), &[], expr.spaces());
        let color = expr.apply(&env).unwrap();
        assert_eq!(color.space(), ColorSpace::Rgb);
        assert_eq!(color.to_rgb(), Rgb::new(240, 128, 255));
    }

    #[test]
    fn test_reference_count() {
        assert_eq!(parse("hls(h, l1, s)").unwrap().references(), 1);
        assert_eq!(parse("rgb(r0, g2 + b1, 0)").unwrap().references(), 2);
        assert_eq!(parse("rgb(255 - r, 255 - g, 255 - b)").unwrap().references(), 0);
        assert_eq!(parse("x12 + sin(1)").unwrap().references(), 0);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse(&deep), Err(ExprError::Syntax { .. })));
        let signs = format!("{}1", "-".repeat(100_000));
        assert!(matches!(parse(&signs), Err(ExprError::Syntax { .. })));
        let chain = vec!["1"; 100_000].join(" + ");
        assert!(matches!(parse(&chain), Err(ExprError::Syntax { .. })));
        assert_eq!(num(&format!("{}1{}", "(".repeat(50), ")".repeat(50))), Number::Int(1));
        assert_eq!(num(&vec!["1"; 50].join(" + ")), Number::Int(50));
    }

    #[test]
    fn test_apply_requires_color() {
        let expr = parse("1 + 1").unwrap();
        assert!(matches!(expr.apply(&Environment::empty()), Err(ExprError::Type(_))));
    }
}

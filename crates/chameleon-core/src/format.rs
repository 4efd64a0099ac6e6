//! Output templates.
//!
//! Templates use the familiar brace syntax: `{}` takes the next channel,
//! `{1}` a channel by position and `{g}` a channel by its letter. Each field
//! may carry a format spec after a colon:
//!
//! ```text
//! [[fill]align][sign][#][0][width][.precision][type]
//! ```
//!
//! For example the default template `#{0:02x}{1:02x}{2:02x}` prints the
//! channels of an RGB color as a hex string.

use crate::color::{Color, ColorSpace};
use crate::number::Number;
use thiserror::Error;

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "#{0:02x}{1:02x}{2:02x}";

/// Template parsing and rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Single '}}' encountered in format string at column {}", .0 + 1)]
    LoneClosingBrace(usize),
    #[error("Unclosed '{{' in format string at column {}", .0 + 1)]
    UnclosedField(usize),
    #[error("Cannot switch between automatic and manual field numbering")]
    MixedNumbering,
    #[error("Field index {0} out of range, colors have 3 channels")]
    IndexOutOfRange(usize),
    #[error("Unknown field '{0}'")]
    UnknownField(String),
    #[error("Invalid format specifier '{0}'")]
    InvalidSpec(String),
    #[error("Unknown format code '{code}' for value of type '{type_name}'")]
    UnsupportedType { code: char, type_name: &'static str },
}

const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Index(usize),
    Letter(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Sign {
    #[default]
    Negative,
    Always,
    Space,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Spec {
    fill: Option<char>,
    align: Option<Align>,
    sign: Sign,
    alternate: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    code: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(Field, Spec),
}

/// A validated output template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Default for Template {
    fn default() -> Self {
        let field = |index| {
            let spec = Spec {
                zero: true,
                width: 2,
                code: Some('x'),
                ..Spec::default()
            };
            Piece::Field(Field::Index(index), spec)
        };
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            pieces: vec![Piece::Literal("#".to_string()), field(0), field(1), field(2)],
        }
    }
}

impl Template {
    /// Parse and validate a template.
    pub fn parse(source: &str) -> Result<Self, FormatError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut auto_index = 0;
        let mut numbering: Option<bool> = None;
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(FormatError::LoneClosingBrace(offset)),
                '{' => {
                    let mut body = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => return Err(FormatError::UnclosedField(offset)),
                            Some((_, c)) => body.push(c),
                        }
                    }
                    let (name, spec) = body.split_once(':').unwrap_or((body.as_str(), ""));
                    let field = if name.is_empty() {
                        if numbering == Some(false) {
                            return Err(FormatError::MixedNumbering);
                        }
                        numbering = Some(true);
                        auto_index += 1;
                        Field::Index(auto_index - 1)
                    } else {
                        let field = parse_field(name)?;
                        if let Field::Index(_) = field {
                            if numbering == Some(true) {
                                return Err(FormatError::MixedNumbering);
                            }
                            numbering = Some(false);
                        }
                        field
                    };
                    if let Field::Index(index) = field
                        && index >= CHANNELS
                    {
                        return Err(FormatError::IndexOutOfRange(index));
                    }
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Field(field, parse_spec(spec)?));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render one line for `color`.
    pub fn render(&self, color: &Color) -> Result<String, FormatError> {
        let values = color.channel_values();
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field(field, spec) => {
                    let index = match *field {
                        Field::Index(index) => index,
                        Field::Letter(letter) => color
                            .space()
                            .channel_names()
                            .iter()
                            .position(|&c| c == letter)
                            .ok_or_else(|| FormatError::UnknownField(letter.to_string()))?,
                    };
                    out.push_str(&format_number(values[index], spec)?);
                }
            }
        }
        Ok(out)
    }
}

impl std::str::FromStr for Template {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::parse(s)
    }
}

fn parse_field(name: &str) -> Result<Field, FormatError> {
    if name.chars().all(|c| c.is_ascii_digit()) {
        let index = name.parse().map_err(|_| FormatError::IndexOutOfRange(usize::MAX))?;
        return Ok(Field::Index(index));
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if ColorSpace::ALL.iter().any(|s| s.channel_names().contains(&letter)) => {
            Ok(Field::Letter(letter))
        }
        _ => Err(FormatError::UnknownField(name.to_string())),
    }
}

fn parse_align(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

fn parse_spec(text: &str) -> Result<Spec, FormatError> {
    let chars: Vec<char> = text.chars().collect();
    let invalid = || FormatError::InvalidSpec(text.to_string());
    let mut spec = Spec::default();
    let mut pos = 0;

    if let Some(align) = chars.get(1).copied().and_then(parse_align) {
        spec.fill = Some(chars[0]);
        spec.align = Some(align);
        pos = 2;
    } else if let Some(align) = chars.first().copied().and_then(parse_align) {
        spec.align = Some(align);
        pos = 1;
    }

    let sign = match chars.get(pos) {
        Some('+') => Some(Sign::Always),
        Some(' ') => Some(Sign::Space),
        Some('-') => Some(Sign::Negative),
        _ => None,
    };
    if let Some(sign) = sign {
        spec.sign = sign;
        pos += 1;
    }

    if chars.get(pos) == Some(&'#') {
        spec.alternate = true;
        pos += 1;
    }
    if chars.get(pos) == Some(&'0') {
        spec.zero = true;
        pos += 1;
    }

    let digits = |pos: &mut usize| -> Option<usize> {
        let start = *pos;
        while chars.get(*pos).is_some_and(|c| c.is_ascii_digit()) {
            *pos += 1;
        }
        if *pos == start {
            return None;
        }
        chars[start..*pos].iter().collect::<String>().parse().ok()
    };

    if let Some(width) = digits(&mut pos) {
        spec.width = width;
    }

    if chars.get(pos) == Some(&'.') {
        pos += 1;
        spec.precision = Some(digits(&mut pos).ok_or_else(invalid)?);
    }

    if let Some(&code) = chars.get(pos) {
        if !"dxXobfFeEgG%s".contains(code) {
            return Err(invalid());
        }
        spec.code = Some(code);
        pos += 1;
    }
    if pos != chars.len() {
        return Err(invalid());
    }

    Ok(spec)
}

fn format_number(value: Number, spec: &Spec) -> Result<String, FormatError> {
    if spec.precision.is_some() && matches!((spec.code, value), (None | Some('d' | 'x' | 'X' | 'o' | 'b'), Number::Int(_))) {
        return Err(FormatError::InvalidSpec("precision not allowed in integer format".to_string()));
    }
    let negative = match value {
        Number::Int(i) => i < 0,
        Number::Float(f) => f.is_sign_negative() && !f.is_nan(),
    };
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Sign::Always) => "+",
        (false, Sign::Space) => " ",
        (false, Sign::Negative) => "",
    };

    let (prefix, body) = match (spec.code, value) {
        (None | Some('d'), Number::Int(i)) => ("", i.unsigned_abs().to_string()),
        (Some('s'), _) if spec.precision.is_none() => ("", strip_sign(value.to_string())),
        (None, Number::Float(f)) if spec.precision.is_none() => ("", strip_sign(Number::Float(f).to_string())),
        (Some(code @ ('x' | 'X' | 'o' | 'b')), Number::Int(i)) => {
            let n = i.unsigned_abs();
            let (prefix, body) = match code {
                'x' => ("0x", format!("{:x}", n)),
                'X' => ("0X", format!("{:X}", n)),
                'o' => ("0o", format!("{:o}", n)),
                _ => ("0b", format!("{:b}", n)),
            };
            (if spec.alternate { prefix } else { "" }, body)
        }
        (Some(code @ ('d' | 'x' | 'X' | 'o' | 'b')), _) => {
            return Err(FormatError::UnsupportedType {
                code,
                type_name: value.type_name(),
            });
        }
        (Some(code @ ('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%')), _) => {
            ("", format_float(value.as_f64().abs(), code, spec.precision, spec.alternate))
        }
        (Some('s'), _) => {
            return Err(FormatError::InvalidSpec("precision not allowed with 's'".to_string()));
        }
        // A bare precision formats like 'g'.
        (_, _) => ("", format_float(value.as_f64().abs(), 'g', spec.precision, spec.alternate)),
    };

    Ok(pad(sign, prefix, &body, spec))
}

fn strip_sign(text: String) -> String {
    match text.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Format a non-negative float for one of the floating point codes.
fn format_float(x: f64, code: char, precision: Option<usize>, alternate: bool) -> String {
    let upper = code.is_ascii_uppercase();
    if !x.is_finite() {
        let text = if x.is_nan() { "nan" } else { "inf" };
        let text = if upper { text.to_uppercase() } else { text.to_string() };
        return if code == '%' { text + "%" } else { text };
    }

    let precision = precision.unwrap_or(6);
    let text = match code {
        'f' | 'F' => format!("{:.*}", precision, x),
        'e' | 'E' => exponent(x, precision),
        '%' => return format!("{:.*}%", precision, x * 100.0),
        _ => general(x, precision.max(1), alternate),
    };
    if upper { text.to_uppercase() } else { text }
}

/// Scientific notation with a signed, at least two digit exponent: `1.5e+05`.
fn exponent(x: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, x);
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
}

/// `g` formatting: fixed or scientific depending on the exponent, with
/// trailing zeros removed unless `alternate` is set.
fn general(x: f64, precision: usize, alternate: bool) -> String {
    let rounded = format!("{:.*e}", precision - 1, x);
    let exp: i32 = rounded.split_once('e').and_then(|(_, e)| e.parse().ok()).unwrap_or(0);
    let text = if (-4..precision as i32).contains(&exp) {
        format!("{:.*}", (precision as i32 - 1 - exp) as usize, x)
    } else {
        exponent(x, precision - 1)
    };
    if alternate {
        return text;
    }
    match text.split_once('e') {
        Some((mantissa, exp)) => format!("{}e{}", trim_zeros(mantissa), exp),
        None => trim_zeros(&text).to_string(),
    }
}

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') { text.trim_end_matches('0').trim_end_matches('.') } else { text }
}

fn pad(sign: &str, prefix: &str, body: &str, spec: &Spec) -> String {
    let len = sign.chars().count() + prefix.chars().count() + body.chars().count();
    let (fill, align) = match (spec.fill, spec.align, spec.zero) {
        (fill, Some(align), _) => (fill.unwrap_or(if spec.zero { '0' } else { ' ' }), align),
        (_, None, true) => ('0', Align::AfterSign),
        (_, None, false) => (' ', Align::Right),
    };
    let missing = spec.width.saturating_sub(len);
    let padding = |n: usize| fill.to_string().repeat(n);

    match align {
        Align::Left => format!("{}{}{}{}", sign, prefix, body, padding(missing)),
        Align::Right => format!("{}{}{}{}", padding(missing), sign, prefix, body),
        Align::Center => {
            let left = missing / 2;
            format!("{}{}{}{}{}", padding(left), sign, prefix, body, padding(missing - left))
        }
        Align::AfterSign => format!("{}{}{}{}", sign, prefix, padding(missing), body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn red() -> Color {
        Color::from_rgb(Rgb::new(255, 0, 0))
    }

    fn render(template: &str, color: &Color) -> Result<String, FormatError> {
        Template::parse(template)?.render(color)
    }

    fn one(spec: &str, value: Number) -> String {
        format_number(value, &parse_spec(spec).unwrap()).unwrap()
    }

    #[test]
    fn test_default_template() {
        assert_eq!(render(DEFAULT_TEMPLATE, &red()).unwrap(), "#ff0000");
        assert_eq!(Template::default(), Template::parse(DEFAULT_TEMPLATE).unwrap());
        let color = Color::from_rgb(Rgb::new(1, 171, 205));
        assert_eq!(Template::default().render(&color).unwrap(), "#01abcd");
    }

    #[test]
    fn test_positional_fields() {
        assert_eq!(render("rgb({0:d},{1:d},{2:d})", &red()).unwrap(), "rgb(255,0,0)");
        assert_eq!(render("{2} {1} {0}", &red()).unwrap(), "0 0 255");
        assert_eq!(render("{} {} {}", &red()).unwrap(), "255 0 0");
    }

    #[test]
    fn test_letter_fields() {
        assert_eq!(render("{g}-{r}", &red()).unwrap(), "0-255");
        let hls = red().convert(ColorSpace::Hls);
        assert_eq!(render("{h:.0f} {l:.2f} {s:.0%}", &hls).unwrap(), "0 0.50 100%");
        assert!(matches!(render("{r}", &hls), Err(FormatError::UnknownField(_))));
        assert!(matches!(Template::parse("{w}"), Err(FormatError::UnknownField(_))));
        assert!(matches!(Template::parse("{red}"), Err(FormatError::UnknownField(_))));
    }

    #[test]
    fn test_template_errors() {
        assert!(matches!(Template::parse("{3}"), Err(FormatError::IndexOutOfRange(3))));
        assert!(matches!(Template::parse("{} {}{} {}"), Err(FormatError::IndexOutOfRange(3))));
        assert!(matches!(Template::parse("{} {1}"), Err(FormatError::MixedNumbering)));
        assert!(matches!(Template::parse("{1} {}"), Err(FormatError::MixedNumbering)));
        assert!(matches!(Template::parse("a } b"), Err(FormatError::LoneClosingBrace(2))));
        assert!(matches!(Template::parse("{0"), Err(FormatError::UnclosedField(0))));
        assert!(matches!(Template::parse("{0:q}"), Err(FormatError::InvalidSpec(_))));
        assert!(matches!(Template::parse("{0:.}"), Err(FormatError::InvalidSpec(_))));
        assert!(matches!(Template::parse("{0!r}"), Err(FormatError::UnknownField(_))));
    }

    #[test]
    fn test_integer_code_on_float() {
        let hls = red().convert(ColorSpace::Hls);
        assert_eq!(
            render("{0:x}", &hls),
            Err(FormatError::UnsupportedType {
                code: 'x',
                type_name: "float"
            })
        );
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render("{{{0}}}", &red()).unwrap(), "{255}");
        assert_eq!(render("no fields", &red()).unwrap(), "no fields");
    }

    #[test]
    fn test_integer_specs() {
        assert_eq!(one("#x", Number::Int(255)), "0xff");
        assert_eq!(one("#06X", Number::Int(255)), "0X00FF");
        assert_eq!(one("08b", Number::Int(5)), "00000101");
        assert_eq!(one("o", Number::Int(8)), "10");
        assert_eq!(one("+d", Number::Int(7)), "+7");
        assert_eq!(one(" d", Number::Int(7)), " 7");
        assert_eq!(one("05d", Number::Int(-42)), "-0042");
        assert_eq!(one("<5", Number::Int(1)), "1    ");
        assert_eq!(one("*^7", Number::Int(255)), "**255**");
        assert_eq!(one("x", Number::Int(-255)), "-ff");
    }

    #[test]
    fn test_float_specs() {
        assert_eq!(one("", Number::Float(0.5)), "0.5");
        assert_eq!(one("", Number::Float(1.0)), "1.0");
        assert_eq!(one(".3f", Number::Float(1.0 / 3.0)), "0.333");
        assert_eq!(one("f", Number::Int(2)), "2.000000");
        assert_eq!(one("e", Number::Float(150000.0)), "1.500000e+05");
        assert_eq!(one(".2E", Number::Float(0.00012)), "1.20E-04");
        assert_eq!(one("g", Number::Float(0.0001)), "0.0001");
        assert_eq!(one("g", Number::Float(1234567.0)), "1.23457e+06");
        assert_eq!(one(".3g", Number::Float(2.5)), "2.5");
        assert_eq!(one("#.3g", Number::Float(2.5)), "2.50");
        assert_eq!(one(".1%", Number::Float(0.25)), "25.0%");
        assert_eq!(one("+.1f", Number::Float(-0.04)), "-0.0");
        assert_eq!(one("F", Number::Float(f64::INFINITY)), "INF");
        assert_eq!(one("08.2f", Number::Float(-3.14159)), "-0003.14");
    }
}

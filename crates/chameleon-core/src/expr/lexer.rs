//! Tokenizer for conversion expressions.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Shl,
    Shr,
    Amp,
    Pipe,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl Token {
    /// Short description for syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Int(i) => format!("number {}", i),
            Token::Float(f) => format!("number {}", f),
            Token::Name(name) => format!("name '{}'", name),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::DoubleStar => "**",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Int(_) | Token::Float(_) | Token::Name(_) => "",
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let token = if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let (token, end) = lex_number(source, pos)?;
            pos = end;
            token
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            Token::Name(source[start..pos].to_string())
        } else {
            let next = bytes.get(pos + 1).copied();
            let (token, len) = match (c, next) {
                (b'*', Some(b'*')) => (Token::DoubleStar, 2),
                (b'/', Some(b'/')) => (Token::DoubleSlash, 2),
                (b'<', Some(b'<')) => (Token::Shl, 2),
                (b'>', Some(b'>')) => (Token::Shr, 2),
                (b'+', _) => (Token::Plus, 1),
                (b'-', _) => (Token::Minus, 1),
                (b'*', _) => (Token::Star, 1),
                (b'/', _) => (Token::Slash, 1),
                (b'%', _) => (Token::Percent, 1),
                (b'&', _) => (Token::Amp, 1),
                (b'|', _) => (Token::Pipe, 1),
                (b'^', _) => (Token::Caret, 1),
                (b'(', _) => (Token::LParen, 1),
                (b')', _) => (Token::RParen, 1),
                (b',', _) => (Token::Comma, 1),
                _ => {
                    let ch = source[pos..].chars().next().unwrap_or('?');
                    return Err(ExprError::syntax(pos, format!("unexpected character '{}'", ch)));
                }
            };
            pos += len;
            token
        };

        tokens.push(Spanned { token, offset: start });
    }

    Ok(tokens)
}

fn lex_number(source: &str, start: usize) -> Result<(Token, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut pos = start;

    // Prefixed integers: 0x.., 0o.., 0b..
    if bytes[pos] == b'0' {
        let radix = match bytes.get(pos + 1) {
            Some(b'x' | b'X') => Some(16),
            Some(b'o' | b'O') => Some(8),
            Some(b'b' | b'B') => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            pos += 2;
            let digits_start = pos;
            while pos < bytes.len() && (bytes[pos] as char).is_digit(radix) {
                pos += 1;
            }
            if digits_start == pos {
                return Err(ExprError::syntax(start, "missing digits after integer prefix"));
            }
            let value = i64::from_str_radix(&source[digits_start..pos], radix)
                .map_err(|_| ExprError::syntax(start, "integer literal too large"))?;
            return Ok((Token::Int(value), check_boundary(source, pos)?));
        }
    }

    let mut is_float = false;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        is_float = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            is_float = true;
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text = &source[start..pos];
    let token = if is_float {
        Token::Float(text.parse().map_err(|_| ExprError::syntax(start, "invalid number"))?)
    } else {
        Token::Int(text.parse().map_err(|_| ExprError::syntax(start, "integer literal too large"))?)
    };
    Ok((token, check_boundary(source, pos)?))
}

/// Numbers may not run straight into a name, e.g. `12abc`.
fn check_boundary(source: &str, pos: usize) -> Result<usize, ExprError> {
    match source.as_bytes().get(pos) {
        Some(c) if c.is_ascii_alphanumeric() || *c == b'_' => Err(ExprError::syntax(pos, "invalid number literal")),
        _ => Ok(pos),
    }
}

//! Recursive-descent parser producing the expression tree.
//!
//! Precedence, loosest first: `|`, `^`, `&`, shifts, `+ -`, `* / // %`,
//! unary `- +`, `**`, calls and atoms.

use super::ExprError;
use super::lexer::{Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Binary levels from loosest to tightest, below the unary level.
const LEVELS: &[&[(Token, BinaryOp)]] = &[
    &[(Token::Pipe, BinaryOp::BitOr)],
    &[(Token::Caret, BinaryOp::BitXor)],
    &[(Token::Amp, BinaryOp::BitAnd)],
    &[(Token::Shl, BinaryOp::Shl), (Token::Shr, BinaryOp::Shr)],
    &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
    &[
        (Token::Star, BinaryOp::Mul),
        (Token::Slash, BinaryOp::Div),
        (Token::DoubleSlash, BinaryOp::FloorDiv),
        (Token::Percent, BinaryOp::Mod),
    ],
];

/// Deepest expression tree, and deepest parser recursion, that is accepted.
pub const MAX_DEPTH: usize = 200;

pub struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    /// Byte length of the source, reported for errors at end of input.
    end: usize,
    /// Current recursion depth through `unary`.
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end: source_len,
            nesting: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::syntax(0, "empty expression"));
        }
        let (expr, _) = self.binary(0)?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(ExprError::syntax(
                extra.offset,
                format!("unexpected {}", extra.token.describe()),
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.pos);
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        match self.peek() {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(ExprError::syntax(
                self.offset(),
                format!("expected {}, found {}", what, token.describe()),
            )),
            None => Err(ExprError::syntax(self.end, format!("expected {}, found end of input", what))),
        }
    }

    /// Depth of a node one above `depth`, failing past [`MAX_DEPTH`].
    fn deeper(&self, depth: usize, offset: usize) -> Result<usize, ExprError> {
        if depth >= MAX_DEPTH {
            return Err(ExprError::syntax(offset, "expression nested too deeply"));
        }
        Ok(depth + 1)
    }

    // Each parser returns the node together with its tree depth.

    fn binary(&mut self, level: usize) -> Result<(Expr, usize), ExprError> {
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let (mut left, mut depth) = self.binary(level + 1)?;
        while let Some(op) = self.peek().and_then(|t| ops.iter().find(|(tok, _)| tok == t).map(|(_, op)| *op)) {
            let offset = self.offset();
            self.pos += 1;
            let (right, right_depth) = self.binary(level + 1)?;
            depth = self.deeper(depth.max(right_depth), offset)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok((left, depth))
    }

    /// Every nested parse passes through here, so this bounds recursion.
    fn unary(&mut self) -> Result<(Expr, usize), ExprError> {
        let offset = self.offset();
        if self.nesting >= MAX_DEPTH {
            return Err(ExprError::syntax(offset, "expression nested too deeply"));
        }
        self.nesting += 1;
        let result = self.signed(offset);
        self.nesting -= 1;
        result
    }

    fn signed(&mut self, offset: usize) -> Result<(Expr, usize), ExprError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.pos += 1;
        let (operand, depth) = self.unary()?;
        let depth = self.deeper(depth, offset)?;
        Ok((Expr::Unary(op, Box::new(operand)), depth))
    }

    /// `a ** b` is right associative and its exponent may carry a sign.
    fn power(&mut self) -> Result<(Expr, usize), ExprError> {
        let (base, base_depth) = self.atom()?;
        if self.peek() == Some(&Token::DoubleStar) {
            let offset = self.offset();
            self.pos += 1;
            let (exponent, exponent_depth) = self.unary()?;
            let depth = self.deeper(base_depth.max(exponent_depth), offset)?;
            return Ok((Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)), depth));
        }
        Ok((base, base_depth))
    }

    fn atom(&mut self) -> Result<(Expr, usize), ExprError> {
        let offset = self.offset();
        let Some(spanned) = self.advance() else {
            return Err(ExprError::syntax(self.end, "unexpected end of input"));
        };
        match &spanned.token {
            Token::Int(i) => Ok((Expr::Int(*i), 1)),
            Token::Float(f) => Ok((Expr::Float(*f), 1)),
            Token::LParen => {
                let inner = self.binary(0)?;
                self.expect(Token::RParen, "')'")?;
                self.reject_call(offset)?;
                Ok(inner)
            }
            Token::Name(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let (args, depth) = self.arguments()?;
                    self.reject_call(offset)?;
                    let depth = self.deeper(depth, offset)?;
                    Ok((Expr::Call(name.clone(), args), depth))
                } else {
                    Ok((Expr::Name(name.clone()), 1))
                }
            }
            other => Err(ExprError::syntax(offset, format!("unexpected {}", other.describe()))),
        }
    }

    /// Only plain names can be called, so `f(1)(2)` and `(f)(1)` are rejected.
    fn reject_call(&self, offset: usize) -> Result<(), ExprError> {
        if self.peek() == Some(&Token::LParen) {
            return Err(ExprError::syntax(offset, "only named functions can be called"));
        }
        Ok(())
    }

    /// Arguments up to the closing parenthesis and the deepest of them.
    fn arguments(&mut self) -> Result<(Vec<Expr>, usize), ExprError> {
        let mut args = Vec::new();
        let mut depth = 0;
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok((args, depth));
        }
        loop {
            let (arg, arg_depth) = self.binary(0)?;
            args.push(arg);
            depth = depth.max(arg_depth);
            match self.peek() {
                Some(Token::Comma) => {
                    self.pos += 1;
                    // Trailing comma before ')' is allowed.
                    if self.peek() == Some(&Token::RParen) {
                        self.pos += 1;
                        return Ok((args, depth));
                    }
                }
                _ => {
                    self.expect(Token::RParen, "',' or ')'")?;
                    return Ok((args, depth));
                }
            }
        }
    }
}

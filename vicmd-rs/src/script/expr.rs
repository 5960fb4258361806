//! Expression lexer, AST, parser, and evaluator.
//!
//! Used by `:echo`, `:execute`, `:let` and conditions.  Operands are
//! integers, `'single'` and `"double"` quoted strings, `$ENV` variables,
//! `&option` values, `v:`/`g:` variables and function calls.
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  comparison  →  additive/concat  →  multiplicative  →
//!   unary  →  primary
//!
//! [`evaluate`] parses the longest expression prefix and reports where it
//! stopped, which lets a caller treat `1 'a' $HOME` as three expressions.

use thiserror::Error;

use super::value::Value;

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Dependency-injection interface used by the evaluator.
pub trait EvalContext {
    fn get_env(&self, name: &str) -> Option<String>;

    fn get_option(&self, name: &str) -> Option<Value>;

    /// Look up a scoped variable such as `v:count` or `g:name`.
    fn get_var(&self, name: &str) -> Option<Value>;

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Result<Value, String>;
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid expression")]
    InvalidExpression,
    #[error("Missing quote")]
    MissingQuote,
    #[error("Missing closing parenthesis")]
    MissingParen,
    #[error("{0}")]
    Eval(String),
}

/// What [`evaluate`] found at the start of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutcome {
    pub value: Option<Value>,
    pub error: Option<ParseError>,
    /// Parsing stopped right after whitespace.
    pub ends_with_whitespace: bool,
    /// Bytes of input accounted for: everything on success, else the offset
    /// where parsing stopped.
    pub consumed: usize,
}

impl EvalOutcome {
    pub fn failed(error: ParseError, at: usize) -> Self {
        EvalOutcome {
            value: None,
            error: Some(error),
            ends_with_whitespace: false,
            consumed: at,
        }
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Str(String),
    Env(String),
    Opt(String),
    Ident(String),

    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Dot,
    Star,
    Slash,
    Percent,
    Bang,

    Comma,
    LParen,
    RParen,
    /// String literal without its closing quote.
    Unterminated,
    Unknown(char),
    Eof,
}

#[derive(Debug, Clone)]
struct Spanned {
    tok: Token,
    start: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

fn is_word(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_word) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let hex = String::from_utf8_lossy(&self.src[digits..self.pos]);
            return Token::Int(i64::from_str_radix(&hex, 16).unwrap_or(0));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]);
        Token::Int(text.parse().unwrap_or(i64::MAX))
    }

    /// `'…'` with `''` for a literal quote.
    fn read_single(&mut self) -> Token {
        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => return Token::Unterminated,
                Some(b'\'') if self.peek2() == Some(b'\'') => {
                    buf.push(b'\'');
                    self.pos += 2;
                }
                Some(b'\'') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    buf.push(c);
                    self.pos += 1;
                }
            }
        }
        Token::Str(String::from_utf8_lossy(&buf).into_owned())
    }

    /// `"…"` with backslash escapes.
    fn read_double(&mut self) -> Token {
        let mut buf = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return Token::Unterminated;
            };
            self.pos += 1;
            match c {
                b'"' => break,
                b'\\' => {
                    let Some(e) = self.peek() else {
                        return Token::Unterminated;
                    };
                    self.pos += 1;
                    match e {
                        b'n' => buf.push(b'\n'),
                        b't' => buf.push(b'\t'),
                        b'r' => buf.push(b'\r'),
                        b'e' => buf.push(0x1b),
                        other => buf.push(other),
                    }
                }
                other => buf.push(other),
            }
        }
        Token::Str(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_ident(&mut self) -> Token {
        let mut name = self.read_word();
        let scoped = matches!(name.as_str(), "v" | "g");
        if scoped && self.peek() == Some(b':') && self.peek2().is_some_and(is_word) {
            self.pos += 1;
            name.push(':');
            name.push_str(&self.read_word());
        }
        Token::Ident(name)
    }

    fn next_token(&mut self) -> Token {
        let Some(ch) = self.peek() else {
            return Token::Eof;
        };
        if ch.is_ascii_digit() {
            return self.read_number();
        }
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.read_ident();
        }
        self.pos += 1;
        match ch {
            b'\'' => self.read_single(),
            b'"' => self.read_double(),
            b'$' if self.peek().is_some_and(is_word) => Token::Env(self.read_word()),
            b'&' if self.eat(b'&') => Token::And,
            b'&' if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) => {
                Token::Opt(self.read_word())
            }
            b'|' if self.eat(b'|') => Token::Or,
            b'=' if self.eat(b'=') => Token::Eq,
            b'!' if self.eat(b'=') => Token::Ne,
            b'!' => Token::Bang,
            b'<' if self.eat(b'=') => Token::Le,
            b'<' => Token::Lt,
            b'>' if self.eat(b'=') => Token::Ge,
            b'>' => Token::Gt,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'.' => Token::Dot,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            c => {
                let start = self.pos - 1;
                while self.peek().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.pos += 1;
                }
                let ch = std::str::from_utf8(&self.src[start..self.pos])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(char::from(c));
                Token::Unknown(ch)
            }
        }
    }

    fn tokenize(mut self) -> Vec<Spanned> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            let start = self.pos;
            let tok = self.next_token();
            let done = matches!(tok, Token::Eof | Token::Unterminated);
            tokens.push(Spanned { tok, start });
            if done {
                break;
            }
        }
        tokens
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Env(String),
    Opt(String),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |s| &s.tok)
    }

    /// Byte offset of the next unconsumed token.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.start)
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Token::Eq => BinOp::Eq,
            Token::Ne => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Le => BinOp::Le,
            Token::Gt => BinOp::Gt,
            Token::Ge => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                Token::Dot => BinOp::Concat,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Env(name) => Ok(Expr::Env(name)),
            Token::Opt(name) => Ok(Expr::Opt(name)),
            Token::Ident(name) if self.eat(&Token::LParen) => {
                let mut args = Vec::new();
                if self.peek() != &Token::RParen {
                    args.push(self.parse_expr()?);
                    while self.eat(&Token::Comma) {
                        args.push(self.parse_expr()?);
                    }
                }
                if !self.eat(&Token::RParen) {
                    return Err(ParseError::MissingParen);
                }
                Ok(Expr::Call(name, args))
            }
            Token::Ident(name) if name.contains(':') => Ok(Expr::Var(name)),
            Token::LParen => {
                let inner = self.parse_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(ParseError::MissingParen);
                }
                Ok(inner)
            }
            Token::Unterminated => Err(ParseError::MissingQuote),
            _ => {
                self.pos -= 1;
                Err(ParseError::InvalidExpression)
            }
        }
    }
}

/// Parse a complete expression.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(Lexer::new(src).tokenize());
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        _ => Err(ParseError::InvalidExpression),
    }
}

/// Evaluate the longest expression at the start of `src`.
///
/// When input remains after it, the outcome carries the value only if
/// `interactive` is set and the rest is separated by whitespace.
pub fn evaluate(src: &str, interactive: bool, ctx: &mut dyn EvalContext) -> EvalOutcome {
    let mut parser = Parser::new(Lexer::new(src).tokenize());
    let expr = match parser.parse_expr() {
        Ok(expr) => expr,
        Err(e) => return EvalOutcome::failed(e, parser.offset()),
    };

    let trailing = parser.peek() != &Token::Eof;
    let stop = if trailing { parser.offset() } else { src.len() };
    let ends_with_whitespace =
        trailing && src.get(..stop).is_some_and(|s| s.ends_with([' ', '\t']));
    if trailing && !(interactive && ends_with_whitespace) {
        return EvalOutcome {
            value: None,
            error: Some(ParseError::InvalidExpression),
            ends_with_whitespace,
            consumed: stop,
        };
    }

    match eval_expr(&expr, ctx) {
        Ok(value) => EvalOutcome {
            value: Some(value),
            error: trailing.then_some(ParseError::InvalidExpression),
            ends_with_whitespace,
            consumed: stop,
        },
        Err(msg) => EvalOutcome::failed(ParseError::Eval(msg), 0),
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Evaluate an [`Expr`].  The right operand of `||`/`&&` is only evaluated
/// when it decides the result.
pub fn eval_expr(expr: &Expr, ctx: &mut dyn EvalContext) -> Result<Value, String> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Env(name) => Ok(Value::Str(ctx.get_env(name).unwrap_or_default())),

        Expr::Opt(name) => ctx
            .get_option(name)
            .ok_or_else(|| format!("Unknown option: {name}")),

        Expr::Var(name) => ctx
            .get_var(name)
            .ok_or_else(|| format!("Undefined variable: {name}")),

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx)?;
            Ok(match op {
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Plus => Value::Int(v.as_int()),
                UnaryOp::Not => Value::from(!v.as_bool()),
            })
        }

        Expr::Binary(BinOp::Or, lhs, rhs) => {
            if eval_expr(lhs, ctx)?.as_bool() {
                return Ok(Value::Int(1));
            }
            Ok(Value::from(eval_expr(rhs, ctx)?.as_bool()))
        }

        Expr::Binary(BinOp::And, lhs, rhs) => {
            if !eval_expr(lhs, ctx)?.as_bool() {
                return Ok(Value::Int(0));
            }
            Ok(Value::from(eval_expr(rhs, ctx)?.as_bool()))
        }

        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            eval_binop(*op, &l, &r)
        }

        Expr::Call(name, arg_exprs) => {
            let mut args = Vec::with_capacity(arg_exprs.len());
            for ae in arg_exprs {
                args.push(eval_expr(ae, ctx)?);
            }
            ctx.call_fn(name, args)
        }
    }
}

fn eval_binop(op: BinOp, l: &Value, r: &Value) -> Result<Value, String> {
    use std::cmp::Ordering::{Equal, Greater, Less};
    Ok(match op {
        BinOp::Add => l.arith_add(r),
        BinOp::Sub => l.arith_sub(r),
        BinOp::Mul => l.arith_mul(r),
        BinOp::Div => l.arith_div(r)?,
        BinOp::Rem => l.arith_rem(r)?,
        BinOp::Concat => l.concat(r),
        BinOp::Eq => Value::from(l.cmp_value(r) == Equal),
        BinOp::Ne => Value::from(l.cmp_value(r) != Equal),
        BinOp::Lt => Value::from(l.cmp_value(r) == Less),
        BinOp::Le => Value::from(l.cmp_value(r) != Greater),
        BinOp::Gt => Value::from(l.cmp_value(r) == Greater),
        BinOp::Ge => Value::from(l.cmp_value(r) != Less),
        BinOp::Or | BinOp::And => unreachable!("short-circuit operators are handled by eval_expr"),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

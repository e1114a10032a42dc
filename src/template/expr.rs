//! The small expression language evaluated inside template tags.
//!
//! Statements are separated by `;` or newlines.  A statement is either an
//! assignment (`name = expr`) or a bare expression; the value of the last
//! statement is the value of the tag.  Truthiness follows the usual
//! scripting convention: only `false` and `nil` are false.
use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use serde_json::{Number, Value};

use super::{Bindings, TemplateError};
use crate::config::type_name;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Dot,
    Assign,
    Separator,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Ident(name) => f.write_str(name),
            Self::Op(op) => f.write_str(op),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Dot => f.write_str("."),
            Self::Assign => f.write_str("="),
            Self::Separator => f.write_str("end of statement"),
        }
    }
}

fn tokenize(code: &str, line: usize) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = code.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '\n' | ';' => {
                chars.next();
                tokens.push(Token::Separator);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => tokens.push(number(&mut chars, line)?),
            '"' | '\'' => tokens.push(Token::Str(string(&mut chars, line)?)),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    ident.push(c);
                }
                tokens.push(Token::Ident(ident));
            }
            _ => {
                chars.next();
                let followed_by = |chars: &mut Peekable<Chars<'_>>, next: char| {
                    chars.next_if_eq(&next).is_some()
                };
                let token = match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '.' => Token::Dot,
                    '+' => Token::Op("+"),
                    '-' => Token::Op("-"),
                    '*' => Token::Op("*"),
                    '/' => Token::Op("/"),
                    '%' => Token::Op("%"),
                    '!' if followed_by(&mut chars, '=') => Token::Op("!="),
                    '!' => Token::Op("!"),
                    '=' if followed_by(&mut chars, '=') => Token::Op("=="),
                    '=' => Token::Assign,
                    '<' if followed_by(&mut chars, '=') => Token::Op("<="),
                    '<' => Token::Op("<"),
                    '>' if followed_by(&mut chars, '=') => Token::Op(">="),
                    '>' => Token::Op(">"),
                    '&' if followed_by(&mut chars, '&') => Token::Op("&&"),
                    '|' if followed_by(&mut chars, '|') => Token::Op("||"),
                    other => {
                        return Err(TemplateError::syntax(
                            line,
                            format!("unexpected character '{other}'"),
                        ));
                    }
                };
                tokens.push(token);
            }
        }
    }
    Ok(tokens)
}

fn number(chars: &mut Peekable<Chars<'_>>, line: usize) -> Result<Token, TemplateError> {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || *c == '_') {
        if c != '_' {
            digits.push(c);
        }
    }
    let mut ahead = chars.clone();
    let fractional = ahead.next() == Some('.') && ahead.peek().is_some_and(char::is_ascii_digit);
    if !fractional {
        return digits
            .parse()
            .map(Token::Int)
            .map_err(|_| TemplateError::syntax(line, format!("integer {digits} out of range")));
    }
    chars.next();
    digits.push('.');
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
        .parse()
        .map(Token::Float)
        .map_err(|_| TemplateError::syntax(line, format!("invalid number {digits}")))
}

fn string(chars: &mut Peekable<Chars<'_>>, line: usize) -> Result<String, TemplateError> {
    let quote = chars.next().unwrap_or('"');
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(TemplateError::syntax(line, "unterminated string")),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match chars.next() {
                Some('n') if quote == '"' => out.push('\n'),
                Some('t') if quote == '"' => out.push('\t'),
                Some(c) if c == quote || c == '\\' => out.push(c),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
                None => return Err(TemplateError::syntax(line, "unterminated string")),
            },
            Some(c) => out.push(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
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
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            _ => return None,
        })
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Field(Box<Self>, String),
    Neg(Box<Self>),
    Not(Box<Self>),
    Binary(BinaryOp, Box<Self>, Box<Self>),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

const KEYWORDS: [&str; 3] = ["true", "false", "nil"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.line, message)
    }

    fn statements(&mut self) -> Result<Vec<Stmt>, TemplateError> {
        let mut out = Vec::new();
        loop {
            while self.peek() == Some(&Token::Separator) {
                self.pos += 1;
            }
            if self.peek().is_none() {
                return Ok(out);
            }
            out.push(self.statement()?);
            match self.advance() {
                None | Some(Token::Separator) => {}
                Some(token) => return Err(self.error(format!("unexpected '{token}'"))),
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, TemplateError> {
        if let Some(Token::Ident(name)) = self.peek()
            && !KEYWORDS.contains(&name.as_str())
            && self.tokens.get(self.pos + 1) == Some(&Token::Assign)
        {
            let name = name.clone();
            self.pos += 2;
            return Ok(Stmt::Assign(name, self.expression(0)?));
        }
        Ok(Stmt::Expr(self.expression(0)?))
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Expr, TemplateError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(symbol)) = self.peek()
            && let Some(op) = BinaryOp::from_symbol(symbol)
            && op.precedence() >= min_precedence
        {
            self.pos += 1;
            let rhs = self.expression(op.precedence() + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, TemplateError> {
        match self.peek() {
            Some(Token::Op("-")) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op("!")) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.primary()?;
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            match self.advance() {
                Some(Token::Ident(field)) => expr = Expr::Field(Box::new(expr), field),
                _ => return Err(self.error("expected a field name after '.'")),
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::from(i))),
            Some(Token::Float(x)) => Number::from_f64(x)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| self.error(format!("invalid number {x}"))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "nil" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(token) => Err(self.error(format!("unexpected '{token}'"))),
            None => Err(self.error("expected an expression")),
        }
    }
}

/// Parse and run the code of one tag against `scope`.
///
/// Assignments write into `scope`.  Returns the value of the last
/// statement, or `nil` for an empty tag.
pub(super) fn run(code: &str, line: usize, scope: &mut Bindings) -> Result<Value, TemplateError> {
    let mut parser = Parser {
        tokens: tokenize(code, line)?,
        pos: 0,
        line,
    };
    let mut last = Value::Null;
    for stmt in parser.statements()? {
        last = match stmt {
            Stmt::Assign(name, expr) => {
                let value = eval(&expr, scope)?;
                scope.insert(name, value.clone());
                value
            }
            Stmt::Expr(expr) => eval(&expr, scope)?,
        };
    }
    Ok(last)
}

const fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn eval(expr: &Expr, scope: &Bindings) -> Result<Value, TemplateError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::UndefinedVariable { name: name.clone() }),
        Expr::Field(target, field) => match eval(target, scope)? {
            Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
            other => Err(TemplateError::type_error(format!(
                "cannot read field '{field}' of {}",
                type_name(&other)
            ))),
        },
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, scope)?))),
        Expr::Neg(inner) => match Num::of(&eval(inner, scope)?) {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| TemplateError::type_error("integer overflow")),
            Some(Num::Float(x)) => float(-x),
            None => Err(TemplateError::type_error("unary '-' expects a number")),
        },
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            if truthy(&left) { eval(rhs, scope) } else { Ok(left) }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            if truthy(&left) { Ok(left) } else { eval(rhs, scope) }
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, &eval(lhs, scope)?, &eval(rhs, scope)?),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Self> {
        let n = value.as_number()?;
        n.as_i64()
            .map(Self::Int)
            .or_else(|| n.as_f64().map(Self::Float))
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(x) => x,
        }
    }
}

fn float(x: f64) -> Result<Value, TemplateError> {
    Number::from_f64(x)
        .map(Value::Number)
        .ok_or_else(|| TemplateError::type_error(format!("non-finite result {x}")))
}

/// Upper bound in bytes for the result of `string * n`.
const MAX_REPEAT_LEN: usize = 1 << 24;

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, TemplateError> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(equal(left, right))),
        BinaryOp::Ne => return Ok(Value::Bool(!equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(|| mismatch(op, left, right))?;
            return Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }));
        }
        _ => {}
    }

    if let (Value::String(a), Value::String(b)) = (left, right)
        && op == BinaryOp::Add
    {
        return Ok(Value::String(format!("{a}{b}")));
    }
    if let (Value::String(s), Some(Num::Int(n))) = (left, Num::of(right))
        && op == BinaryOp::Mul
    {
        let count = usize::try_from(n)
            .map_err(|_| TemplateError::type_error("negative string repetition"))?;
        if s.len()
            .checked_mul(count)
            .is_none_or(|len| len > MAX_REPEAT_LEN)
        {
            return Err(TemplateError::type_error("string repetition too large"));
        }
        return Ok(Value::String(s.repeat(count)));
    }

    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => integer(op, a, b),
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })
        }
        _ => Err(mismatch(op, left, right)),
    }
}

fn integer(op: BinaryOp, a: i64, b: i64) -> Result<Value, TemplateError> {
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
        return Err(TemplateError::type_error("divided by 0"));
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        // Division rounds toward negative infinity and the remainder takes
        // the sign of the divisor.
        BinaryOp::Div => a.checked_div(b).map(|q| {
            if a % b != 0 && (a < 0) != (b < 0) {
                q - 1
            } else {
                q
            }
        }),
        _ => a.checked_rem(b).map(|r| {
            if r != 0 && (r < 0) != (b < 0) {
                r + b
            } else {
                r
            }
        }),
    };
    result
        .map(Value::from)
        .ok_or_else(|| TemplateError::type_error("integer overflow"))
}

fn equal(left: &Value, right: &Value) -> bool {
    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
        (Some(a), Some(b)) => (a.as_f64() - b.as_f64()).abs() < f64::EPSILON,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (Num::of(left)?, Num::of(right)?) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> TemplateError {
    TemplateError::type_error(format!(
        "unsupported operands for {op:?}: {} and {}",
        type_name(left),
        type_name(right)
    ))
}

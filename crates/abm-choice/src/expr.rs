//! Utility-formula expression trees.
//!
//! Formulas are linear-in-parameters arithmetic over named coefficients and
//! variables, e.g. `beta_cost * cost + beta_tt * tt + cons_walk`.  Each
//! formula is parsed once at model load; evaluation walks the tree against an
//! explicit per-call [`Bindings`] record.  Nothing here touches process-wide
//! state and no code is generated or executed at runtime.
//!
//! Grammar: `+ - * /`, unary minus, parentheses, decimal literals, and
//! identifiers (`[A-Za-z_][A-Za-z0-9_]*`).  Names are resolved variables
//! first, then parameters, so a variable shadows a same-named parameter.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;

// ── Expression tree ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(Decimal),
    Variable(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

/// Name bindings for one evaluation: the model's coefficients plus the
/// variables extracted from the current input record.
pub struct Bindings<'a> {
    pub parameters: &'a IndexMap<String, Decimal>,
    pub variables:  &'a HashMap<String, Decimal>,
}

/// Why an evaluation failed.  Converted by the caller into a
/// `FormulaEvaluation` error carrying the alternative and formula text.
#[derive(Debug, PartialEq, Eq)]
pub enum EvalError {
    Unbound(String),
    DivisionByZero,
    Overflow,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Unbound(name) => write!(f, "unbound name {name:?}"),
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl Expr {
    pub fn evaluate(&self, bindings: &Bindings<'_>) -> Result<Decimal, EvalError> {
        match self {
            Expr::Number(d) => Ok(*d),
            Expr::Variable(name) => bindings
                .variables
                .get(name)
                .or_else(|| bindings.parameters.get(name))
                .copied()
                .ok_or_else(|| EvalError::Unbound(name.clone())),
            Expr::Neg(e) => Ok(-e.evaluate(bindings)?),
            Expr::Add(a, b) => a
                .evaluate(bindings)?
                .checked_add(b.evaluate(bindings)?)
                .ok_or(EvalError::Overflow),
            Expr::Sub(a, b) => a
                .evaluate(bindings)?
                .checked_sub(b.evaluate(bindings)?)
                .ok_or(EvalError::Overflow),
            Expr::Mul(a, b) => a
                .evaluate(bindings)?
                .checked_mul(b.evaluate(bindings)?)
                .ok_or(EvalError::Overflow),
            Expr::Div(a, b) => {
                let divisor = b.evaluate(bindings)?;
                if divisor.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                a.evaluate(bindings)?
                    .checked_div(divisor)
                    .ok_or(EvalError::Overflow)
            }
        }
    }
}

// ── Tokenizer ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => { chars.next(); tokens.push(Token::Plus); }
            '-' => { chars.next(); tokens.push(Token::Minus); }
            '*' => { chars.next(); tokens.push(Token::Star); }
            '/' => { chars.next(); tokens.push(Token::Slash); }
            '(' => { chars.next(); tokens.push(Token::LParen); }
            ')' => { chars.next(); tokens.push(Token::RParen); }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &src[start..end];
                let value: Decimal = literal
                    .parse()
                    .map_err(|_| format!("bad numeric literal {literal:?}"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(src[start..end].to_string()));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Parse a formula into an [`Expr`].  Errors are load-time model-definition
/// problems; the message names the offending token.
pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(t) => Err(format!("trailing input at token {t:?}")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos:    usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Pratt loop: `+ -` bind at 1, `* /` at 3, unary minus at 5.
    fn expression(&mut self, min_power: u8) -> Result<Expr, String> {
        let mut lhs = self.prefix()?;

        while let Some(token) = self.peek() {
            let (power, op): (u8, fn(Box<Expr>, Box<Expr>) -> Expr) = match token {
                Token::Plus => (1, |a, b| Expr::Add(a, b)),
                Token::Minus => (1, |a, b| Expr::Sub(a, b)),
                Token::Star => (3, |a, b| Expr::Mul(a, b)),
                Token::Slash => (3, |a, b| Expr::Div(a, b)),
                _ => break,
            };
            if power < min_power {
                break;
            }
            self.next();
            let rhs = self.expression(power + 1)?;
            lhs = op(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(d)) => Ok(Expr::Number(d)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::Minus) => Ok(Expr::Neg(Box::new(self.expression(5)?))),
            Some(Token::Plus) => self.expression(5),
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of formula".to_string()),
        }
    }
}

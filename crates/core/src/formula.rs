//! Band-algebra formulas
//!
//! Parses arithmetic formulas over named band variables into an AST that
//! can be evaluated locally on scalar band values or lowered into image
//! arithmetic on a remote compute service.
//!
//! Grammar:
//! ```text
//! sum     = product (('+' | '-') product)*
//! product = operand (('*' | '/') operand)*
//! operand = number | band | '(' sum ')' | '-' operand | '+' operand
//! ```
//!
//! Example formulas:
//! - `"NIR / GREEN - 1"` → GCI
//! - `"2.5 * ((NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1))"` → EVI

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{Error, Result};

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A node in the expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Band(String),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    Open,
    Close,
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::Open,
            ')' => Token::Close,
            '+' => Token::Op(BinOp::Add),
            '-' => Token::Op(BinOp::Sub),
            '*' => Token::Op(BinOp::Mul),
            '/' => Token::Op(BinOp::Div),
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan(&mut chars, start + 1, |c| c.is_ascii_digit() || c == '.');
                let text = &source[start..end];
                let n = text
                    .parse()
                    .map_err(|_| Error::Formula(format!("invalid number: {text}")))?;
                Token::Num(n)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let end = scan(&mut chars, start + 1, |c| c.is_ascii_alphanumeric() || c == '_');
                Token::Ident(source[start..end].to_string())
            }
            other => {
                return Err(Error::Formula(format!(
                    "unexpected character '{other}' in formula"
                )))
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Consume the run of characters accepted by `accept`; returns the byte
/// offset just past it.
fn scan(chars: &mut Peekable<CharIndices<'_>>, mut end: usize, accept: impl Fn(char) -> bool) -> usize {
    while let Some((i, c)) = chars.next_if(|&(_, c)| accept(c)) {
        end = i + c.len_utf8();
    }
    end
}

/// Precedence climbing over two binary levels plus unary signs.
struct Parser {
    tokens: Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    /// Left-associative chain of `operand (op operand)*` for `ops`.
    fn chain(&mut self, ops: &[BinOp], operand: fn(&mut Self) -> Result<Expr>) -> Result<Expr> {
        let mut left = operand(self)?;
        while let Some(Token::Op(op)) = self
            .tokens
            .next_if(|t| matches!(t, Token::Op(op) if ops.contains(op)))
        {
            let right = operand(self)?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Expr> {
        self.chain(&[BinOp::Add, BinOp::Sub], Self::product)
    }

    fn product(&mut self) -> Result<Expr> {
        self.chain(&[BinOp::Mul, BinOp::Div], Self::operand)
    }

    fn operand(&mut self) -> Result<Expr> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| Error::Formula("formula ends unexpectedly".into()))?;
        match token {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Ident(name) => Ok(Expr::Band(name)),
            Token::Op(BinOp::Sub) => Ok(Expr::Neg(Box::new(self.operand()?))),
            Token::Op(BinOp::Add) => self.operand(),
            Token::Open => {
                let inner = self.sum()?;
                match self.tokens.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(Error::Formula("expected closing parenthesis".into())),
                }
            }
            other => Err(Error::Formula(format!("unexpected {other:?} in formula"))),
        }
    }
}

/// A parsed band-algebra formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Parse a formula string.
    ///
    /// Trailing tokens after a complete expression are rejected, so
    /// `"NIR RED"` or `"(NIR))"` fail instead of silently truncating.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(Error::Formula("empty formula".into()));
        }
        let mut parser = Parser {
            tokens: tokens.into_iter().peekable(),
        };
        let expr = parser.sum()?;
        if let Some(extra) = parser.tokens.next() {
            return Err(Error::Formula(format!(
                "unexpected trailing {extra:?} in '{source}'"
            )));
        }
        Ok(Self { expr })
    }

    /// Root of the parsed AST.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Band variables referenced by the formula, in first-use order.
    pub fn bands(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_bands(&self.expr, &mut names);
        names
    }

    /// Evaluate on scalar band values.
    ///
    /// Unknown bands evaluate to NaN, and so does division by a
    /// denominator closer to zero than `1e-10`.
    pub fn eval(&self, bands: &HashMap<String, f64>) -> f64 {
        eval(&self.expr, bands)
    }
}

fn eval(expr: &Expr, bands: &HashMap<String, f64>) -> f64 {
    match expr {
        Expr::Num(n) => *n,
        Expr::Band(name) => *bands.get(name).unwrap_or(&f64::NAN),
        Expr::BinOp { op, left, right } => {
            let l = eval(left, bands);
            let r = eval(right, bands);
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r.abs() < 1e-10 {
                        f64::NAN
                    } else {
                        l / r
                    }
                }
            }
        }
        Expr::Neg(inner) => -eval(inner, bands),
    }
}

fn collect_bands(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::Band(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Expr::BinOp { left, right, .. } => {
            collect_bands(left, names);
            collect_bands(right, names);
        }
        Expr::Neg(inner) => collect_bands(inner, names),
        Expr::Num(_) => {}
    }
}

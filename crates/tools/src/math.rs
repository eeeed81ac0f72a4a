//! Math tool: finds an arithmetic expression in the query and evaluates it.
//!
//! Supports `+`, `-`, `*`, `/`, `^` (right-associative power), parentheses,
//! decimals and unary signs. Evaluation is a recursive-descent parser; no
//! code is ever executed.

use std::sync::LazyLock;

use async_trait::async_trait;
use ragline_core::tool::{Tool, ToolResult};
use regex_lite::Regex;
use thiserror::Error;
use tracing::debug;

/// Runs of expression characters that start and end on an operand.
static CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\d(][\d\s.+\-*/^()]*[\d)]").expect("candidate regex is valid")
});

const NO_EXPRESSION: &str =
    "No mathematical expression found. Please provide an expression like \"2 + 2 * 5\"";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unexpected character: '{0}'")]
    UnexpectedChar(char),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Expected closing parenthesis")]
    UnclosedParen,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Result is not a finite number")]
    NotFinite,
}

pub struct MathTool;

#[async_trait]
impl Tool for MathTool {
    fn name(&self) -> &str {
        "math"
    }

    fn description(&self) -> &str {
        "Evaluate mathematical expressions"
    }

    async fn execute(&self, query: &str) -> ToolResult {
        let Some(expression) = extract_expression(query) else {
            return ToolResult::failure(NO_EXPRESSION);
        };

        match evaluate(&expression) {
            Ok(value) => {
                let formatted = format_number(value);
                debug!(%expression, result = %formatted, "Expression evaluated");
                let result = if value.fract() == 0.0 && value.abs() < 1e15 {
                    serde_json::json!(value as i64)
                } else {
                    serde_json::json!(value)
                };
                ToolResult::ok(serde_json::json!({
                    "expression": expression,
                    "result": result,
                    "description": format!("{expression} = {formatted}"),
                }))
            }
            Err(e) => ToolResult::failure(format!("Failed to evaluate mathematical expression: {e}")),
        }
    }
}

/// Pull the first arithmetic expression (operand, operator, operand...) out
/// of free text.
pub fn extract_expression(query: &str) -> Option<String> {
    CANDIDATE_RE
        .find_iter(query)
        .map(|m| m.as_str().trim())
        .find(|candidate| {
            let body = candidate.trim_start_matches(['-', '(', ' ']);
            body.contains(['+', '-', '*', '/', '^'])
        })
        .map(str::to_string)
}

/// Format without a trailing `.0` for integral values.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate a mathematical expression string.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::UnexpectedToken(format!("{tok:?}")));
    }
    if !result.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = literal
                    .parse()
                    .map_err(|_| EvalError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(n));
                continue;
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        };
        chars.next();
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => return Ok(left),
            }
        }
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<f64, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left /= right;
                }
                _ => return Ok(left),
            }
        }
    }

    // unary = ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary ('^' unary)?
    // Recursing into `unary` makes `^` right-associative and lets `2^-1` parse;
    // `-2^2` is `-(2^2)`.
    fn parse_power(&mut self) -> Result<f64, EvalError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, EvalError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err(EvalError::UnclosedParen),
                }
            }
            Some(tok) => Err(EvalError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

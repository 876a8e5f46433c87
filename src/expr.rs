//! Arithmetic expression evaluation for the math intent
//!
//! Supports `+ - * /`, `^` as exponentiation (right-associative, binding
//! tighter than unary minus), parentheses, and decimal literals.

use crate::{Error, Result};

/// Deepest nesting of parentheses, signs, and exponents accepted
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
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

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(idx, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = idx + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[start..end];
                let value = literal
                    .parse()
                    .map_err(|_| Error::Expression(format!("invalid number: {literal}")))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(Error::Expression(format!("unexpected character: {other}")));
            }
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.next();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.next();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.next();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(Error::Expression("division by zero".to_string()));
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::Expression("expression nested too deeply".to_string()));
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.next();
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.next();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.next();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(Error::Expression("unbalanced parentheses".to_string())),
                }
            }
            Some(token) => Err(Error::Expression(format!("unexpected token: {token:?}"))),
            None => Err(Error::Expression("unexpected end of expression".to_string())),
        }
    }
}

/// Evaluate an arithmetic expression
///
/// # Errors
///
/// Returns `Error::Expression` on malformed input, division by zero, or a
/// non-finite result
pub fn evaluate(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Error::Expression("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(Error::Expression(format!("unexpected token: {token:?}")));
    }
    if !value.is_finite() {
        return Err(Error::Expression("result out of range".to_string()));
    }
    Ok(value)
}

/// Format with `digits` significant digits in general notation
///
/// Fixed notation keeps at least one fractional digit (`4.0`); scientific
/// notation is used for exponents below -4 or at least `digits - 1`
/// (`1.2345e+04`).
#[must_use]
pub fn format_significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i64 = exponent.parse().unwrap_or(0);
    let max_exponent = i64::try_from(digits).unwrap_or(i64::MAX);

    if exponent < -4 || exponent >= max_exponent - 1 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs());
    }

    let decimals = usize::try_from(max_exponent - 1 - exponent).unwrap_or(0);
    let fixed = format!("{value:.decimals$}");
    let trimmed = trim_fraction(&fixed);
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.0")
    }
}

/// Drop trailing fractional zeros and a dangling decimal point
fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

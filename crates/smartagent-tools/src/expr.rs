//! Restricted Arithmetic Evaluator
//!
//! Recursive-descent evaluator for a small, allow-listed arithmetic syntax:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/' | '//' | '%') factor)*
//! factor := ('+' | '-') factor | power
//! power  := atom ('**' factor)?
//! atom   := NUMBER | '(' expr ')'
//! ```
//!
//! Integers stay integers until an operation needs a float (`/`, a negative
//! exponent, or overflow). Names, attribute access, calls, subscripts and
//! every other construct are rejected before evaluation.

use std::fmt;

use crate::error::{Result, ToolsError};

/// Numeric value that keeps integers and floats apart
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(i) => write!(f, "{i}"),
            // Whole floats keep their ".0" so `4/2` reads as `2.0`
            Self::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Evaluate an expression string
pub fn evaluate(expression: &str) -> Result<Number> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(ToolsError::InvalidSyntax(format!("unexpected {token}"))),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "number {n}"),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Star => write!(f, "'*'"),
            Self::Slash => write!(f, "'/'"),
            Self::DoubleSlash => write!(f, "'//'"),
            Self::Percent => write!(f, "'%'"),
            Self::DoubleStar => write!(f, "'**'"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let (number, len) = lex_number(&chars[i..])?;
                i += len;
                tokens.push(Token::Num(number));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if next == Some('*') => Token::DoubleStar,
            '*' => Token::Star,
            '/' if next == Some('/') => Token::DoubleSlash,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            // Names, attributes, literals and operators outside the allow-list
            c if c.is_alphabetic()
                || matches!(
                    c,
                    '_' | '.' | '[' | ']' | '{' | '}' | ',' | '\'' | '"' | '<' | '>' | '='
                        | '!' | '&' | '|' | '^' | '~' | '@' | ':'
                ) =>
            {
                return Err(ToolsError::UnsupportedExpression);
            }
            other => return Err(ToolsError::InvalidSyntax(format!("unexpected '{other}'"))),
        };
        i += if matches!(token, Token::DoubleStar | Token::DoubleSlash) {
            2
        } else {
            1
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Lex a numeric literal; returns the value and characters consumed
fn lex_number(chars: &[char]) -> Result<(Number, usize)> {
    let digits = |from: usize| {
        chars[from..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count()
    };

    let mut len = digits(0);
    let mut is_float = false;

    if chars.get(len) == Some(&'.') {
        is_float = true;
        len += 1;
        len += digits(len);
    }

    if matches!(chars.get(len), Some('e' | 'E')) {
        let mut exp_len = len + 1;
        if matches!(chars.get(exp_len), Some('+' | '-')) {
            exp_len += 1;
        }
        let exp_digits = digits(exp_len);
        if exp_digits == 0 {
            return Err(ToolsError::InvalidSyntax("malformed number".into()));
        }
        is_float = true;
        len = exp_len + exp_digits;
    }

    let text: String = chars[..len].iter().collect();
    let number = if is_float {
        text.parse::<f64>().map(Number::Float)
    } else {
        // Beyond i64 the literal degrades to a float instead of failing
        Ok(text.parse::<i64>().map_or_else(
            |_| Number::Float(text.parse::<f64>().unwrap_or(f64::INFINITY)),
            Number::Int,
        ))
    }
    .map_err(|_| ToolsError::InvalidSyntax(format!("malformed number '{text}'")))?;

    Ok((number, len))
}

/// Deepest nesting of parentheses, unary signs and `**` chains accepted
const MAX_DEPTH: usize = 100;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Run `parse` one nesting level deeper, refusing to recurse past `MAX_DEPTH`
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Number>) -> Result<Number> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolsError::InvalidSyntax(
                "expression nested too deeply".into(),
            ));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> Result<Number> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = binary(op, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.factor()?;
            value = binary(op, value, rhs)?;
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<Number> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(negate(self.nested(Self::factor)?))
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number> {
        let base = self.atom()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.nested(Self::factor)?;
            return binary(Token::DoubleStar, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ToolsError::InvalidSyntax("'(' was never closed".into())),
                }
            }
            Some(token) => Err(ToolsError::InvalidSyntax(format!("unexpected {token}"))),
            None => Err(ToolsError::InvalidSyntax("unexpected end of expression".into())),
        }
    }
}

fn negate(value: Number) -> Number {
    match value {
        Number::Int(i) => i
            .checked_neg()
            .map_or_else(|| Number::Float(-value.as_f64()), Number::Int),
        Number::Float(f) => Number::Float(-f),
    }
}

fn binary(op: Token, lhs: Number, rhs: Number) -> Result<Number> {
    let result = match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => int_op(op, a, b)?,
        _ => float_op(op, lhs.as_f64(), rhs.as_f64())?,
    };

    match result {
        Number::Float(f) if f.is_nan() => Err(ToolsError::UnsupportedExpression),
        Number::Float(f) if f.is_infinite() => Err(ToolsError::OutOfRange),
        n => Ok(n),
    }
}

fn int_op(op: Token, a: i64, b: i64) -> Result<Number> {
    let checked = match op {
        Token::Plus => a.checked_add(b),
        Token::Minus => a.checked_sub(b),
        Token::Star => a.checked_mul(b),
        Token::Slash => return float_op(op, Number::Int(a).as_f64(), Number::Int(b).as_f64()),
        Token::DoubleSlash | Token::Percent if b == 0 => return Err(ToolsError::DivisionByZero),
        Token::DoubleSlash => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        Token::Percent => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
        Token::DoubleStar if b < 0 => {
            return float_op(op, Number::Int(a).as_f64(), Number::Int(b).as_f64());
        }
        Token::DoubleStar => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        Token::Num(_) | Token::LParen | Token::RParen => {
            return Err(ToolsError::UnsupportedExpression);
        }
    };

    match checked {
        Some(value) => Ok(Number::Int(value)),
        None => float_op(op, Number::Int(a).as_f64(), Number::Int(b).as_f64()),
    }
}

fn float_op(op: Token, a: f64, b: f64) -> Result<Number> {
    let value = match op {
        Token::Plus => a + b,
        Token::Minus => a - b,
        Token::Star => a * b,
        Token::Slash | Token::DoubleSlash | Token::Percent if Number::Float(b).is_zero() => {
            return Err(ToolsError::DivisionByZero);
        }
        Token::Slash => a / b,
        Token::DoubleSlash => (a / b).floor(),
        Token::Percent => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        Token::DoubleStar if a == 0.0 && b < 0.0 => return Err(ToolsError::DivisionByZero),
        Token::DoubleStar => a.powf(b),
        Token::Num(_) | Token::LParen | Token::RParen => {
            return Err(ToolsError::UnsupportedExpression);
        }
    };
    Ok(Number::Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> String {
        match evaluate(expr) {
            Ok(n) => n.to_string(),
            Err(e) => format!("error: {e}"),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval("2+2"), "4");
        assert_eq!(eval("10 * 5"), "50");
        assert_eq!(eval("(2 + 3) * 4"), "20");
        assert_eq!(eval("2 ** 10"), "1024");
        assert_eq!(eval("2 ** 3 ** 2"), "512");
        assert_eq!(eval("-2 ** 2"), "-4");
        assert_eq!(eval("--3"), "3");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(eval(&parens), "error: invalid syntax: expression nested too deeply");

        let signs = format!("{}1", "-".repeat(500_000));
        assert_eq!(eval(&signs), "error: invalid syntax: expression nested too deeply");

        let tower = format!("2{}", " ** 1".repeat(200_000));
        assert_eq!(eval(&tower), "error: invalid syntax: expression nested too deeply");

        let ok = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&ok), "1");
        assert_eq!(eval(&format!("{}1", "-".repeat(50))), "1");
    }

    #[test]
    fn test_floor_division_and_modulo_round_down() {
        assert_eq!(eval("7 // 2"), "3");
        assert_eq!(eval("-7 // 2"), "-4");
        assert_eq!(eval("-7 % 3"), "2");
        assert_eq!(eval("7 % -3"), "-2");
        assert_eq!(eval("7.5 // 2"), "3.0");
    }

    #[test]
    fn test_float_results() {
        assert_eq!(eval("7/2"), "3.5");
        assert_eq!(eval("4/2"), "2.0");
        assert_eq!(eval("2 ** -1"), "0.5");
        assert_eq!(eval("1.5 * 2"), "3.0");
        assert_eq!(eval(".5 + 1e1"), "10.5");
        assert_eq!(eval("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn test_overflow_degrades_to_float() {
        assert_eq!(
            evaluate("9223372036854775807 + 1").unwrap(),
            Number::Float(9.223_372_036_854_776e18)
        );
        assert_eq!(eval("10.0 ** 400"), "error: numerical result out of range");
    }

    #[test]
    fn test_disallowed_constructs() {
        for expr in ["x + 1", "().__class__", "a.b", "abs(-1)", "[1][0]", "1 if 1 else 2", "2 < 3"] {
            assert_eq!(eval(expr), "error: Unsupported expression", "{expr}");
        }
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("1/0"), "error: division by zero");
        assert_eq!(eval("5 // 0"), "error: division by zero");
        assert_eq!(eval("5 % 0.0"), "error: division by zero");
        assert_eq!(eval("0 ** -1"), "error: division by zero");
        assert!(eval("2 +").starts_with("error: invalid syntax"));
        assert!(eval("(1 + 2").starts_with("error: invalid syntax"));
        assert!(eval("2 3").starts_with("error: invalid syntax"));
        assert!(eval("").starts_with("error: invalid syntax"));
        assert!(eval("1e").starts_with("error: invalid syntax"));
        assert!(eval("4 $ 4").starts_with("error: invalid syntax"));
    }
}

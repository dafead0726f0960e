//! Arithmetic expression evaluator behind the calculator tool.
//!
//! A small recursive-descent parser over `f64`. Nothing is ever handed to an
//! interpreter; anything outside the grammar is a parse error.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := number | constant | func '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::f64::consts;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

const FUNCTIONS: &[&str] = &["sqrt", "pow", "log", "ln", "sin", "cos", "tan"];
const CONSTANTS: &[&str] = &["pi", "e"];

/// Deepest nesting of parentheses, calls, signs and exponents accepted.
pub const MAX_DEPTH: usize = 128;

/// Reduce free text to the expression it contains.
///
/// Words that are neither functions nor constants are dropped, with a few
/// spelled-out operators translated (`plus`, `minus`, `times`,
/// `multiplied by`, `divided by`, `over`).
pub fn strip_prose(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        match word.as_str() {
            w if FUNCTIONS.contains(&w) || CONSTANTS.contains(&w) => out.push_str(w),
            "plus" => out.push('+'),
            "minus" => out.push('-'),
            "times" | "multiplied" => out.push('*'),
            "divided" | "over" => out.push('/'),
            _ => {}
        }
        word.clear();
    };

    for c in lower.chars() {
        if c.is_ascii_alphabetic() {
            word.push(c);
            continue;
        }
        flush(&mut word, &mut out);
        if c.is_ascii_digit() || "+-*/^%().,".contains(c) {
            out.push(c);
        } else if c.is_whitespace() {
            out.push(' ');
        }
    }
    flush(&mut word, &mut out);

    // Trailing sentence punctuation ("what is 2+2.") is not a decimal point.
    out.trim().trim_end_matches(['.', ',']).trim().to_string()
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(format!("unexpected token {tok:?}"));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(value)
}

/// Format a number the way people write it: integers without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Num(n));
            }
            'a'..='z' | 'A'..='Z' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect::<String>().to_lowercase();
                if !FUNCTIONS.contains(&ident.as_str()) && !CONSTANTS.contains(&ident.as_str()) {
                    return Err(format!("unknown identifier '{ident}'"));
                }
                tokens.push(Token::Ident(ident));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(format!("invalid character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn expect(&mut self, want: Token) -> Result<(), String> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(format!("expected {want:?}, found {tok:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => {
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value / rhs
                }
                _ => {
                    if rhs == 0.0 {
                        return Err("modulo by zero".into());
                    }
                    value % rhs
                }
            };
        }
        Ok(value)
    }

    // Every recursive path passes through `unary`.
    fn unary(&mut self) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let value = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|v| -v),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        value
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            // right-associative: 2^3^2 = 2^9
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(consts::PI),
                "e" => Ok(consts::E),
                _ => self.call(&name),
            },
            Some(tok) => Err(format!("unexpected token {tok:?}")),
            None => Err("unexpected end of input".into()),
        }
    }

    fn call(&mut self, name: &str) -> Result<f64, String> {
        self.expect(Token::LParen)?;
        let mut args = vec![self.expr()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        let arity = if name == "pow" { 2 } else { 1 };
        if args.len() != arity {
            return Err(format!("{name} takes {arity} argument(s), got {}", args.len()));
        }
        let x = args[0];
        Ok(match name {
            "sqrt" => {
                if x < 0.0 {
                    return Err("square root of a negative number".into());
                }
                x.sqrt()
            }
            "pow" => x.powf(args[1]),
            "log" => x.log10(),
            "ln" => x.ln(),
            "sin" => x.sin(),
            "cos" => x.cos(),
            "tan" => x.tan(),
            other => return Err(format!("unknown function '{other}'")),
        })
    }
}

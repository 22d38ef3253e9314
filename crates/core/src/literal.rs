//! Literal expression parser for node parameter blocks
//!
//! Accepts an object literal of the form
//!
//! ```text
//! { key: "str", key: 'str', key: 12.5, key: true, key: [1, "a"], key: /pat/i }
//! ```
//!
//! Keys are unquoted identifiers. Values are literals only: no identifiers,
//! no nested objects, no nested arrays, no computation. Whitespace, `//` line
//! comments and `/* */` block comments may appear between tokens, and a
//! trailing comma is allowed in objects and arrays.

use crate::error::{Error, Result};
use crate::value::{ParamValue, Params, Pattern};

/// Parse an object-literal fragment into a parameter mapping.
///
/// A key that appears twice keeps its last value.
pub fn parse_object_literal(text: &str) -> Result<Params> {
    let mut parser = LiteralParser::new(text);
    let params = parser.parse_object()?;
    parser.skip_trivia()?;
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected '{}' after object literal", c)));
    }
    Ok(params)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::DeclarationSyntax {
            fragment: self.src.to_string(),
            reason: format!("{} at offset {}", reason.into(), self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => return Err(self.error("unterminated block comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Params> {
        self.skip_trivia()?;
        self.expect('{')?;

        let mut params = Params::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(params);
            }

            let key = self.parse_identifier()?;
            self.skip_trivia()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let value = self.parse_value(false)?;
            params.insert(key, value);

            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(params),
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unbalanced braces: missing '}'")),
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                self.bump();
            }
            Some(c) => return Err(self.error(format!("expected identifier key, found '{}'", c))),
            None => return Err(self.error("unbalanced braces: missing '}'")),
        }
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_value(&mut self, in_array: bool) -> Result<ParamValue> {
        match self.peek() {
            Some('"') | Some('\'') => self.parse_string().map(ParamValue::String),
            Some('[') if in_array => Err(self.error("nested arrays are not allowed")),
            Some('[') => self.parse_array(),
            Some('/') => self.parse_pattern().map(ParamValue::Pattern),
            Some('{') => Err(self.error("nested objects are not allowed")),
            Some(c) if c == '-' || c == '.' || c.is_ascii_digit() => {
                self.parse_number().map(ParamValue::Number)
            }
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let word = self.parse_identifier()?;
                match word.as_str() {
                    "true" => Ok(ParamValue::Boolean(true)),
                    "false" => Ok(ParamValue::Boolean(false)),
                    _ => {
                        self.pos = start;
                        Err(self.error(format!("'{}' is not a literal value", word)))
                    }
                }
            }
            Some(c) => Err(self.error(format!("unexpected '{}' where a value was expected", c))),
            None => Err(self.error("expected a value, found end of input")),
        }
    }

    fn parse_array(&mut self) -> Result<ParamValue> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.bump();
                return Ok(ParamValue::Array(items));
            }
            items.push(self.parse_value(true)?);
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(ParamValue::Array(items)),
                Some(c) => return Err(self.error(format!("expected ',' or ']', found '{}'", c))),
                None => return Err(self.error("unbalanced brackets: missing ']'")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some('\n') | None => return Err(self.error("unterminated string literal")),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        let c = self.bump().ok_or_else(|| self.error("unterminated string literal"))?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' => {}
            'x' => {
                let code = self.parse_hex_digits(2)?;
                out.push(self.char_from_code(code)?);
            }
            'u' if self.peek() == Some('{') => {
                self.bump();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                    self.bump();
                }
                let digits = &self.src[start..self.pos];
                self.expect('}')?;
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| self.error("invalid unicode escape"))?;
                out.push(self.char_from_code(code)?);
            }
            'u' => {
                let code = self.parse_hex_digits(4)?;
                out.push(self.char_from_code(code)?);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn parse_hex_digits(&mut self, count: usize) -> Result<u32> {
        let start = self.pos;
        for _ in 0..count {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump();
                }
                _ => return Err(self.error("invalid hexadecimal escape")),
            }
        }
        u32::from_str_radix(&self.src[start..self.pos], 16)
            .map_err(|_| self.error("invalid hexadecimal escape"))
    }

    fn char_from_code(&self, code: u32) -> Result<char> {
        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {:#x}", code)))
    }

    fn parse_number(&mut self) -> Result<f64> {
        let start = self.pos;
        let negative = self.peek() == Some('-');
        if negative {
            self.bump();
        }

        if self.peek() == Some('0') && matches!(self.peek_second(), Some('x') | Some('X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.src[digits_start..self.pos];
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.error("invalid hexadecimal literal"))? as f64;
            self.reject_trailing_identifier()?;
            return Ok(if negative { -value } else { value });
        }

        let mut mantissa_digits = 0;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
            mantissa_digits += 1;
        }
        if self.peek() == Some('.') {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
                mantissa_digits += 1;
            }
        }
        if mantissa_digits == 0 {
            return Err(self.error("invalid numeric literal"));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            let exp_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
            if self.pos == exp_start {
                return Err(self.error("missing exponent digits"));
            }
        }
        self.reject_trailing_identifier()?;

        self.src[start..self.pos]
            .parse::<f64>()
            .map_err(|e| self.error(format!("invalid numeric literal: {}", e)))
    }

    fn reject_trailing_identifier(&self) -> Result<()> {
        match self.peek() {
            Some(c) if is_ident_part(c) => {
                Err(self.error("identifier directly after numeric literal"))
            }
            _ => Ok(()),
        }
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        self.expect('/')?;
        let start = self.pos;
        let mut in_class = false;
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('\n') | None => {
                        return Err(self.error("unterminated regular expression"))
                    }
                    Some(_) => {}
                },
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some('\n') | None => return Err(self.error("unterminated regular expression")),
                Some(_) => {}
            }
        }
        let source = &self.src[start..self.pos - 1];
        if source.is_empty() {
            return Err(self.error("empty regular expression"));
        }

        let flags_start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.bump();
        }
        let flags = &self.src[flags_start..self.pos];

        Pattern::new(source, flags).map_err(|reason| self.error(reason))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

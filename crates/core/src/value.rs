//! Parameter values produced by the literal expression parser
//!
//! Manifest parameters are restricted to literals: strings, numbers,
//! booleans, `/pattern/flags` regular expressions, and flat arrays of those.

use fancy_regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Parameter mapping bound to a node at construction time
pub type Params = HashMap<String, ParamValue>;

/// A single literal parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Quoted string
    String(String),
    /// Numeric literal
    Number(f64),
    /// `true` / `false`
    Boolean(bool),
    /// Regular-expression literal
    Pattern(Pattern),
    /// Bracketed array of scalars
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "string",
            ParamValue::Number(_) => "number",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Pattern(_) => "pattern",
            ParamValue::Array(_) => "array",
        }
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Read as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a compiled pattern
    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            ParamValue::Pattern(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow the elements of an array
    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to JSON so the value can be compared against record fields.
    /// Patterns render as their `/source/flags` literal.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Number(n) => number_to_json(*n),
            ParamValue::Boolean(b) => Value::Bool(*b),
            ParamValue::Pattern(p) => Value::String(p.to_string()),
            ParamValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

/// Integral values become JSON integers so `2` round-trips as `2`, not `2.0`
fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{:?}", s),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Pattern(p) => write!(f, "{}", p),
            ParamValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Number(n as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Boolean(b)
    }
}

impl From<Pattern> for ParamValue {
    fn from(p: Pattern) -> Self {
        ParamValue::Pattern(p)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Flags accepted after a regular-expression literal
const KNOWN_FLAGS: &str = "dgimsuy";

/// A compiled regular-expression literal, keeping its source and flags
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    flags: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` with JS-style `flags`.
    ///
    /// The engine backtracks, so look-around and backreferences such as
    /// `/stand(?=up)/` and `/(a)\1/` are accepted. `i`, `m` and `s` become
    /// inline flags; `g`, `y`, `d` and `u` change match iteration only and
    /// are kept for display.
    pub fn new(source: &str, flags: &str) -> std::result::Result<Self, String> {
        let mut seen = String::new();
        for flag in flags.chars() {
            if !KNOWN_FLAGS.contains(flag) {
                return Err(format!("unknown regular expression flag '{}'", flag));
            }
            if seen.contains(flag) {
                return Err(format!("duplicate regular expression flag '{}'", flag));
            }
            seen.push(flag);
        }

        let inline: String = flags.chars().filter(|flag| "ims".contains(*flag)).collect();
        let compiled = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", inline, source)
        };
        let regex = Regex::new(&compiled)
            .map_err(|e| format!("invalid regular expression /{}/: {}", source, e))?;

        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    /// Pattern text between the slashes
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Flags after the closing slash
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Compiled regex
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// True if the pattern matches anywhere in `text`.
    ///
    /// A match that exceeds the backtracking limit counts as no match.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or_else(|e| {
            tracing::warn!("Pattern {} gave up on {:?}: {}", self, text, e);
            false
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

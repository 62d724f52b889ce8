//! Function call expressions as written in select lists
//!
//! `"COUNT(*) AS total"`, `"ROUND(price, 2)"`, `"CAST(age, 'string')"`.
//! Arguments are `*`, quoted string literals, numeric literals or column
//! paths. Nested calls are not supported.

use std::fmt;

use crate::value::{get_path, Row, Value};

use super::errors::{FunctionError, FunctionResult};

/// A function argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `*`
    Star,
    /// Column path, resolved against the row
    Column(String),
    Literal(Value),
}

impl Arg {
    fn parse(raw: &str) -> Arg {
        let raw = raw.trim();
        if raw == "*" {
            return Arg::Star;
        }
        if raw.len() >= 2
            && ((raw.starts_with('\'') && raw.ends_with('\''))
                || (raw.starts_with('"') && raw.ends_with('"')))
        {
            return Arg::Literal(Value::String(raw[1..raw.len() - 1].to_string()));
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Arg::Literal(Value::Int(i));
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Arg::Literal(Value::Float(f));
        }
        Arg::Column(raw.to_string())
    }

    /// Resolves the argument against a row. `*` resolves to a non-null
    /// marker so row counting treats every row as present.
    pub fn resolve(&self, row: &Row) -> Value {
        match self {
            Arg::Star => Value::Bool(true),
            Arg::Column(path) => get_path(row, path).cloned().unwrap_or(Value::Null),
            Arg::Literal(v) => v.clone(),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Star => write!(f, "*"),
            Arg::Column(c) => write!(f, "{}", c),
            Arg::Literal(Value::String(s)) => write!(f, "'{}'", s),
            Arg::Literal(v) => write!(f, "{}", v),
        }
    }
}

/// A parsed `NAME(args)` call
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Upper-cased function name
    pub name: String,
    pub args: Vec<Arg>,
}

impl FunctionCall {
    /// Parses `NAME(arg, ...)`. Returns `Ok(None)` when the text is not
    /// a call at all (a plain column).
    pub fn parse(text: &str) -> FunctionResult<Option<FunctionCall>> {
        let text = text.trim();
        let open = match text.find('(') {
            Some(i) => i,
            None => return Ok(None),
        };
        if !text.ends_with(')') {
            return Err(FunctionError::Malformed(text.to_string()));
        }

        let name = text[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FunctionError::Malformed(text.to_string()));
        }

        let inner = text[open + 1..text.len() - 1].trim();
        if inner.contains('(') {
            return Err(FunctionError::Malformed(text.to_string()));
        }
        let args = if inner.is_empty() {
            Vec::new()
        } else {
            split_args(inner).iter().map(|a| Arg::parse(a)).collect()
        };

        Ok(Some(FunctionCall {
            name: name.to_ascii_uppercase(),
            args,
        }))
    }

    pub fn resolve_args(&self, row: &Row) -> Vec<Value> {
        self.args.iter().map(|a| a.resolve(row)).collect()
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

/// Splits on commas outside quotes
fn split_args(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in inner.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ',' => {
                args.push(current.trim().to_string());
                current.clear();
            }
            None => current.push(c),
        }
    }
    args.push(current.trim().to_string());
    args
}

/// Splits `"expr AS alias"` (case-insensitive `AS`)
pub fn split_alias(text: &str) -> (&str, Option<&str>) {
    let lower = text.to_ascii_lowercase();
    match lower.rfind(" as ") {
        Some(pos) => {
            let alias = text[pos + 4..].trim();
            if alias.is_empty() || alias.contains(')') {
                (text.trim(), None)
            } else {
                (text[..pos].trim(), Some(alias))
            }
        }
        None => (text.trim(), None),
    }
}

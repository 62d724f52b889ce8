//! Structured JSON logger
//!
//! Every call writes one JSON object on one line: `event` first, then
//! `severity`, then the caller's fields sorted by key. Warnings and errors
//! go to stderr, everything else to stdout.
//!
//! The minimum severity starts at `INFO` and can be set through the
//! `TABULA_LOG` environment variable (`trace`, `info`, `warn`, `error`)
//! or [`Logger::set_min_severity`].

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Once;

/// Environment variable read on first use
pub const LOG_LEVEL_ENV: &str = "TABULA_LOG";

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);
static FROM_ENV: Once = Once::new();

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-query detail
    Trace = 0,
    Info = 1,
    /// Rejected requests
    Warn = 2,
    /// Aborted work
    Error = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Case-insensitive
    pub fn parse(s: &str) -> Option<Severity> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Severity::Trace,
            "info" => Severity::Info,
            "warn" | "warning" => Severity::Warn,
            "error" => Severity::Error,
            _ => return None,
        })
    }

    fn from_u8(v: u8) -> Severity {
        match v {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide JSON line logger
pub struct Logger;

impl Logger {
    /// Overrides the minimum severity, including one taken from the
    /// environment
    pub fn set_min_severity(severity: Severity) {
        FROM_ENV.call_once(|| {});
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        FROM_ENV.call_once(|| {
            if let Some(level) = std::env::var(LOG_LEVEL_ENV).ok().as_deref().and_then(Severity::parse) {
                MIN_SEVERITY.store(level as u8, Ordering::Relaxed);
            }
        });
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = format_line(severity, event, fields);
        // a failed log write must never fail the operation being logged
        let _ = if severity >= Severity::Warn {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Renders one log line, newline included
pub(crate) fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let mut line = String::with_capacity(64 + fields.len() * 24);
    line.push_str("{\"event\":");
    push_json_str(&mut line, event);
    line.push_str(",\"severity\":\"");
    line.push_str(severity.as_str());
    line.push('"');
    for (key, value) in sorted {
        line.push(',');
        push_json_str(&mut line, key);
        line.push(':');
        push_json_str(&mut line, value);
    }
    line.push_str("}\n");
    line
}

fn push_json_str(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> serde_json::Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_severity_order_and_names() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
        assert_eq!(Severity::Warn.to_string(), "WARN");
        assert_eq!(Severity::parse(" Warning "), Some(Severity::Warn));
        assert_eq!(Severity::parse("TRACE"), Some(Severity::Trace));
        assert_eq!(Severity::parse("fatal"), None);
        for s in [Severity::Trace, Severity::Info, Severity::Warn, Severity::Error] {
            assert_eq!(Severity::from_u8(s as u8), s);
        }
    }

    #[test]
    fn test_line_shape() {
        let line = format_line(Severity::Info, "QUERY_COMPLETE", &[("table", "users"), ("rows", "3")]);
        assert!(line.ends_with("}\n"));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.starts_with("{\"event\":\"QUERY_COMPLETE\",\"severity\":\"INFO\""));

        let parsed = parse(&line);
        assert_eq!(parsed["table"], "users");
        assert_eq!(parsed["rows"], "3");
    }

    #[test]
    fn test_fields_sorted_regardless_of_input_order() {
        let a = format_line(Severity::Trace, "E", &[("table", "t"), ("action", "select")]);
        let b = format_line(Severity::Trace, "E", &[("action", "select"), ("table", "t")]);
        assert_eq!(a, b);
        assert!(a.find("action").unwrap() < a.find("table").unwrap());
    }

    #[test]
    fn test_values_escaped() {
        let line = format_line(Severity::Error, "QUERY_ABORTED", &[("error", "bad \"row\"\n\u{1}")]);
        assert_eq!(parse(&line)["error"], "bad \"row\"\n\u{1}");
    }
}

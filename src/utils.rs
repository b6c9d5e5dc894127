// Small shared helpers: literal parsing, tuple args, directories, timing

use anyhow::{bail, Context, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};

static PY_TRUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bTrue\b").expect("valid True regex"));
static PY_FALSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bFalse\b").expect("valid False regex"));
static PY_NONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNone\b").expect("valid None regex"));

// ============================================================================
// LITERAL PARSING
// ============================================================================

/// Interpret a user-typed string as a literal value.
///
/// Accepts JSON, Python-style `True`/`False`/`None`, single-quoted strings
/// and single-quoted lists/tuples/dicts. Anything else stays a string.
pub fn try_parse(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::String(raw.to_string());
    }
    if let Ok(v) = serde_json::from_str::<Value>(s) {
        return v;
    }
    match s {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return Value::String(s[1..s.len() - 1].to_string());
    }
    let first = s.chars().next().unwrap_or(' ');
    if matches!(first, '[' | '{' | '(') {
        let mut candidate = s.replace('\'', "\"");
        if first == '(' && candidate.ends_with(')') {
            candidate = format!("[{}]", &candidate[1..candidate.len() - 1]);
        }
        let candidate = PY_TRUE.replace_all(&candidate, "true");
        let candidate = PY_FALSE.replace_all(&candidate, "false");
        let candidate = PY_NONE.replace_all(&candidate, "null");
        if let Ok(v) = serde_json::from_str::<Value>(&candidate) {
            return v;
        }
    }
    Value::String(raw.to_string())
}

/// Apply `try_parse` to every string nested in `value`
pub fn recursive_parse(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let parsed = try_parse(&s);
            match parsed {
                Value::String(_) => parsed,
                other => recursive_parse(other),
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(recursive_parse).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, recursive_parse(v)))
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// TUPLE ARGUMENTS
// ============================================================================

/// Parse `"10,6"` into `[10, 6]`
pub fn parse_tuple_int(raw: &str) -> Result<Vec<i64>> {
    split_tuple(raw)
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("invalid integer '{}' in '{}'", part, raw))
        })
        .collect()
}

/// Parse `"1.5,2"` into `[1.5, 2.0]`
pub fn parse_tuple_float(raw: &str) -> Result<Vec<f64>> {
    split_tuple(raw)
        .map(|part| {
            part.parse::<f64>()
                .with_context(|| format!("invalid number '{}' in '{}'", part, raw))
        })
        .collect()
}

fn split_tuple(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
}

/// Exactly two integers, e.g. a figure size
pub fn parse_pair_int(raw: &str) -> Result<(i64, i64)> {
    let values = parse_tuple_int(raw)?;
    if values.len() != 2 {
        bail!("expected two comma-separated integers, got '{}'", raw);
    }
    Ok((values[0], values[1]))
}

// ============================================================================
// FILESYSTEM + TIMING
// ============================================================================

pub fn mkdir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: &str) -> Self {
        Timer {
            label: label.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        info!("{} finished in {:.3}s", self.label, elapsed.as_secs_f64());
        elapsed
    }
}

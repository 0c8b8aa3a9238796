//! Canonical YAML encoding
//!
//! Deterministic textual encoding of structured values, used both to compute
//! content fingerprints and to re-serialize rendered documents before apply.
//! The same input value always produces the same text; mapping entries keep
//! their insertion order.
//!
//! Strings are quoted whenever a plain scalar could be misread by a YAML
//! parser as something other than a string. In particular strings with a
//! leading zero (`"007"`) are always quoted so they round-trip as strings
//! rather than being collapsed to the number `7`.

use serde_yaml::Value;

use crate::{Error, Result};

const INDENT: &str = "  ";

/// Encode a value as a canonical YAML document
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the value contains a mapping key that
/// is not a scalar.
pub fn to_canonical_string(value: &Value) -> Result<String> {
    let value = untag(value);
    let mut out = String::new();
    match value {
        Value::Mapping(m) if !m.is_empty() => emit_mapping(m, 0, &mut out)?,
        Value::Sequence(s) if !s.is_empty() => emit_sequence(s, 0, &mut out)?,
        other => {
            out.push_str(&scalar(other)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Strip YAML tags; the canonical form carries plain values only
fn untag(mut value: &Value) -> &Value {
    while let Value::Tagged(tagged) = value {
        value = &tagged.value;
    }
    value
}

fn emit_mapping(map: &serde_yaml::Mapping, depth: usize, out: &mut String) -> Result<()> {
    for (key, value) in map {
        let key = untag(key);
        if matches!(key, Value::Mapping(_) | Value::Sequence(_)) {
            return Err(Error::serialization("mapping key is not a scalar"));
        }
        out.push_str(&INDENT.repeat(depth));
        out.push_str(&scalar(key)?);
        out.push(':');
        emit_nested(value, depth, out)?;
    }
    Ok(())
}

fn emit_sequence(seq: &[Value], depth: usize, out: &mut String) -> Result<()> {
    for item in seq {
        out.push_str(&INDENT.repeat(depth));
        out.push('-');
        emit_nested(item, depth, out)?;
    }
    Ok(())
}

/// Emit the value following a `key:` or `-` introducer
fn emit_nested(value: &Value, depth: usize, out: &mut String) -> Result<()> {
    match untag(value) {
        Value::Mapping(m) if !m.is_empty() => {
            out.push('\n');
            emit_mapping(m, depth + 1, out)
        }
        Value::Sequence(s) if !s.is_empty() => {
            out.push('\n');
            emit_sequence(s, depth + 1, out)
        }
        other => {
            out.push(' ');
            out.push_str(&scalar(other)?);
            out.push('\n');
            Ok(())
        }
    }
}

fn scalar(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(encode_str(s)),
        Value::Mapping(m) if m.is_empty() => Ok("{}".to_string()),
        Value::Sequence(s) if s.is_empty() => Ok("[]".to_string()),
        _ => Err(Error::serialization("expected a scalar value")),
    }
}

fn encode_str(s: &str) -> String {
    if s.chars().any(|c| c.is_control()) {
        return double_quoted(s);
    }
    if needs_quoting(s) {
        // Single quotes, with embedded quotes doubled
        return format!("'{}'", s.replace('\'', "''"));
    }
    s.to_string()
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// True if a plain (unquoted) scalar could be resolved as something other
/// than this exact string. Deliberately conservative: quoting a string that
/// did not strictly need it is still valid YAML.
fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    // Leading zeros would be collapsed by numeric resolution ("007" -> 7)
    if s.starts_with('0') {
        return true;
    }
    // Number look-alikes
    if s.parse::<i64>().is_ok() || s.parse::<u64>().is_ok() || s.parse::<f64>().is_ok() {
        return true;
    }
    // Boolean / null look-alikes (YAML 1.1 resolution set)
    let lower = s.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n" | "null" | "~"
    ) {
        return true;
    }
    if matches!(lower.as_str(), ".inf" | "-.inf" | "+.inf" | ".nan") {
        return true;
    }
    // Leading or trailing whitespace is not representable in a plain scalar
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return true;
    }
    // Characters that are (or can become) YAML syntax
    if s.chars().any(|c| {
        matches!(
            c,
            ':' | '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                | '%' | '@' | '`'
        )
    }) {
        return true;
    }
    // Leading indicator characters
    matches!(s.as_bytes()[0], b'-' | b'?')
}

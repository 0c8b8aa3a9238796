//! Custom filters and tests for controller templates
//!
//! Provides the domain library injected into every render:
//! - `b64decode`: decode base64 text
//! - `ipaddr`: reverse-DNS name for an IP literal
//! - `json_query`: JMESPath query against structured data
//! - `unique_dict`: deduplicate structured objects by content
//! - `is_subset` / `is_superset`: deep partial-match predicates

use std::collections::HashSet;
use std::net::IpAddr;

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::value::ValueKind;
use minijinja::{Error, ErrorKind, Value};

use crate::canonical::to_canonical_string;

/// Base64 decode filter
///
/// Usage: `{{ value | b64decode }}`
pub fn b64decode(value: &str) -> Result<String, Error> {
    STANDARD
        .decode(value)
        .map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("base64 decode error: {}", e),
            )
        })
        .and_then(|bytes| {
            String::from_utf8(bytes).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("base64 decode produced invalid UTF-8: {}", e),
                )
            })
        })
}

/// IP address filter
///
/// Usage: `{{ "8.8.8.8" | ipaddr("revdns") }}` yields the reverse-DNS name
/// with no trailing separator. Any other action is an unsupported operation.
pub fn ipaddr(value: &str, action: &str) -> Result<String, Error> {
    if action != "revdns" {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("unsupported ipaddr action '{}'", action),
        ));
    }
    let addr: IpAddr = value.parse().map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("'{}' is not an IP address", value),
        )
    })?;
    Ok(reverse_dns(&addr))
}

fn reverse_dns(addr: &IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            // Nibbles in reverse order, least significant first
            let mut nibbles = Vec::with_capacity(32);
            for byte in v6.octets().iter().rev() {
                nibbles.push(format!("{:x}", byte & 0xf));
                nibbles.push(format!("{:x}", byte >> 4));
            }
            format!("{}.ip6.arpa", nibbles.join("."))
        }
    }
}

/// JMESPath query filter
///
/// Usage: `{{ objects | json_query("[].metadata.name") }}`
pub fn json_query(value: Value, expr: &str) -> Result<Value, Error> {
    let expr = jmespath::compile(expr).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid JMESPath expression: {}", e),
        )
    })?;

    let json = serde_json::to_string(&value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("value is not JSON-serializable: {}", e),
        )
    })?;
    let data = jmespath::Variable::from_json(&json)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("invalid JSON: {}", e)))?;

    let result = expr.search(data).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("JMESPath search failed: {}", e),
        )
    })?;

    let json = serde_json::to_value(result.as_ref()).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("JMESPath result is not representable: {}", e),
        )
    })?;
    Ok(Value::from_serialize(&json))
}

/// Deduplicate a sequence of structured objects by content
///
/// Two objects are duplicates when their canonical encodings are equal. One
/// representative per equivalence class is kept, in first-seen order.
///
/// Usage: `{{ objects | unique_dict }}`
pub fn unique_dict(value: Value) -> Result<Value, Error> {
    if value.kind() != ValueKind::Seq {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "unique_dict expects a sequence",
        ));
    }
    let iter = value
        .try_iter()
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for item in iter {
        let yaml: serde_yaml::Value = serde_yaml::to_value(&item).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("unique_dict item is not serializable: {}", e),
            )
        })?;
        let key = to_canonical_string(&yaml).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("unique_dict item is not encodable: {}", e),
            )
        })?;
        if seen.insert(key) {
            unique.push(item);
        }
    }
    Ok(Value::from(unique))
}

/// Deep partial-match test: every key of `candidate` must exist in
/// `superset` with an equal value, recursing into nested mappings
///
/// Usage: `{% if partial is is_subset(full) %}`
pub fn is_subset(candidate: Value, superset: Value) -> bool {
    subset_of(&to_json(&candidate), &to_json(&superset))
}

/// Argument-swapped alias of [`is_subset`]
///
/// Usage: `{% if full is is_superset(partial) %}`
pub fn is_superset(superset: Value, candidate: Value) -> bool {
    is_subset(candidate, superset)
}

fn to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn subset_of(candidate: &serde_json::Value, superset: &serde_json::Value) -> bool {
    let (candidate, superset) = match (candidate, superset) {
        (serde_json::Value::Object(c), serde_json::Value::Object(s)) => (c, s),
        // A partial-match predicate over mappings; anything else is a
        // type mismatch
        _ => return false,
    };
    candidate.iter().all(|(key, value)| match superset.get(key) {
        Some(other) if value.is_object() => subset_of(value, other),
        Some(other) => value == other,
        None => false,
    })
}

//! Structural comparison of desired payloads against observed attributes.
//!
//! A desired document is satisfied when it is contained in the observed one:
//! objects may carry extra keys, arrays must match element-for-element in any
//! order, and an observed attribute that is missing reads as `null`. Providers
//! routinely omit empty strings and `false` flags, so those also match a
//! missing attribute.

use serde_json::Value;

/// Whether `observed` already satisfies `desired`.
#[must_use]
pub fn contains(observed: &Value, desired: &Value) -> bool {
    match (desired, observed) {
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            have.get(key)
                .map_or_else(|| is_blank(value), |present| contains(present, value))
        }),
        (Value::Array(want), Value::Array(have)) => arrays_match(have, want),
        (Value::Number(want), Value::Number(have)) => want.as_f64() == have.as_f64(),
        (want, Value::Null) => is_blank(want),
        (want, have) => want == have,
    }
}

/// Top-level keys of `desired` that `observed` does not satisfy, in key order.
///
/// A non-object `desired` is compared whole and reported as `<root>`.
#[must_use]
pub fn changed_fields(observed: &Value, desired: &Value) -> Vec<String> {
    match desired {
        Value::Object(want) => want
            .iter()
            .filter(|(key, value)| {
                !observed
                    .get(key.as_str())
                    .map_or_else(|| is_blank(value), |present| contains(present, value))
            })
            .map(|(key, _)| key.clone())
            .collect(),
        other if contains(observed, other) => Vec::new(),
        _ => vec!["<root>".to_string()],
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn arrays_match(have: &[Value], want: &[Value]) -> bool {
    if have.len() != want.len() {
        return false;
    }
    let mut used = vec![false; have.len()];
    want.iter().all(|desired| {
        let slot = have
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && contains(candidate, desired));
        match slot {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

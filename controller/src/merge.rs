//! Structural deep-merge of an override document onto a workload spec.

use serde_json::Value;

use crate::error::{Error, Result};

/// Merges `patch` onto `base` without touching either input.
///
/// Objects merge key by key. Anything else in `patch`, `null` and arrays included,
/// replaces what `base` has at that position.
pub fn merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut merged = base.clone();
            for (key, value) in patch {
                let next = match base.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, patch) => patch.clone(),
    }
}

/// Applies a user supplied override. A `null` override leaves the source untouched,
/// any other non-object root is rejected.
pub fn merge_override(source: &Value, overrides: &Value) -> Result<Value> {
    match overrides {
        Value::Null => Ok(source.clone()),
        Value::Object(_) => Ok(merge(source, overrides)),
        other => Err(Error::InvalidOverride(expdep::json_type_name(other))),
    }
}

//! Small helpers for reading loosely-typed JSON.

use serde_json::{Map, Value};

use crate::NormalizeError;

/// Borrow `value` as an object, or report what was found instead.
pub(crate) fn as_object<'a>(
    value: &'a Value,
    path: &'static str,
) -> Result<&'a Map<String, Value>, NormalizeError> {
    value.as_object().ok_or(NormalizeError::NotAnObject {
        path,
        found: type_name(value),
    })
}

/// First of `keys` present in `obj` (presence, not truthiness).
pub(crate) fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}

/// Render a scalar the way a person would write it; containers become compact JSON.
pub(crate) fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Whether a value counts as "present": non-null, non-zero, non-empty.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// JSON type name used in anomaly text.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// A number, or a string holding one (`"150.00"`, `" 12 "`). Anything else is `None`.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Σ(quantity × unit price) over items carrying both as numbers.
///
/// Price is read from the first present of `price_keys`; a missing quantity
/// counts as `default_quantity` when given, otherwise the item is skipped.
/// Returns the total and how many items contributed to it.
pub(crate) fn priced_total(
    items: &[Value],
    price_keys: &[&str],
    default_quantity: Option<f64>,
) -> (f64, usize) {
    let mut total = 0.0;
    let mut priced = 0;
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let Some(price) = first_present(obj, price_keys).and_then(Value::as_f64) else {
            continue;
        };
        let quantity = match obj.get("quantity") {
            Some(q) => q.as_f64(),
            None => default_quantity,
        };
        if let Some(quantity) = quantity {
            total += price * quantity;
            priced += 1;
        }
    }
    (total, priced)
}

//! Best-effort extraction from shapes nothing else recognizes.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::Value;

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::{display_string, is_truthy};
use crate::{NormalizeError, ShapeTag};

const ID_KEYS: &[&str] = &["id", "order_id", "orderid", "number"];
const CUSTOMER_KEYS: &[&str] = &["customer", "client", "name", "customer_name"];
const ITEM_KEYS: &[&str] = &["items", "products", "orders", "line_items"];
const TOTAL_KEYS: &[&str] = &["total", "amount", "total_amount", "price"];

pub struct CustomNormalizer;

impl ShapeNormalizer for CustomNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::CustomStructure
    }

    fn matches(&self, _value: &Value) -> bool {
        true
    }

    fn normalize(
        &self,
        value: &Value,
        _registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let order_id = find_key(value, ID_KEYS)
            .filter(|v| is_truthy(v))
            .map(display_string)
            .unwrap_or_default();

        let customer_name = find_key(value, CUSTOMER_KEYS)
            .filter(|v| is_truthy(v))
            .map(|v| match v.get("name") {
                Some(name) if v.is_object() => display_string(name),
                _ => display_string(v),
            })
            .unwrap_or_default();

        let items = find_key(value, ITEM_KEYS)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let total_amount = find_key(value, TOTAL_KEYS)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        Ok(CanonicalOrderRecord {
            order_id,
            customer_name,
            items,
            total_amount,
            anomalies: vec!["Unknown JSON structure - using best-effort extraction".to_string()],
            raw_structure: Some(value.clone()),
            ..CanonicalOrderRecord::default()
        })
    }
}

enum Frame<'a> {
    Node(&'a Value),
    Entry(&'a str, &'a Value),
}

/// Depth-first, pre-order search for the first key matching one of `names`
/// (ASCII case-insensitive). Object keys are visited in insertion order and
/// array elements by ascending index; a matching key ends the search even if
/// its value is empty.
pub(crate) fn find_key<'a>(root: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let mut stack = vec![Frame::Node(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Entry(key, value) => {
                if names.iter().any(|n| n.eq_ignore_ascii_case(key)) {
                    return Some(value);
                }
                if value.is_object() || value.is_array() {
                    stack.push(Frame::Node(value));
                }
            }
            Frame::Node(Value::Object(map)) => {
                stack.extend(map.iter().rev().map(|(k, v)| Frame::Entry(k.as_str(), v)));
            }
            Frame::Node(Value::Array(items)) => {
                stack.extend(items.iter().rev().map(Frame::Node));
            }
            Frame::Node(_) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_is_depth_first_in_insertion_order() {
        let doc = json!({
            "meta": {"source": {"ID": "deep"}},
            "id": "shallow"
        });
        assert_eq!(find_key(&doc, ID_KEYS), Some(&json!("deep")));

        let doc = json!({"batches": [{"x": 1}, {"number": 7}], "number": 9});
        assert_eq!(find_key(&doc, ID_KEYS), Some(&json!(7)));
        assert_eq!(find_key(&json!("scalar"), ID_KEYS), None);
    }

    #[test]
    fn best_effort_extraction() {
        let doc = json!({
            "purchase": {
                "OrderID": "PO-1",
                "client": {"name": "Wayne Enterprises", "tier": "gold"},
                "line_items": [{"sku": "bat"}],
                "Amount": 250
            }
        });
        let record = CustomNormalizer.normalize(&doc, &ShapeRegistry::new()).unwrap();
        assert_eq!(record.order_id, "PO-1");
        assert_eq!(record.customer_name, "Wayne Enterprises");
        assert_eq!(record.items, vec![json!({"sku": "bat"})]);
        assert_eq!(record.total_amount, 250.0);
        assert_eq!(record.anomalies, ["Unknown JSON structure - using best-effort extraction"]);
        assert_eq!(record.raw_structure, Some(doc));
    }

    #[test]
    fn anomaly_recorded_even_when_nothing_found() {
        let record = CustomNormalizer
            .normalize(&json!(42), &ShapeRegistry::new())
            .unwrap();
        assert_eq!(record.order_id, "");
        assert!(record.items.is_empty());
        assert_eq!(record.anomalies.len(), 1);
        assert_eq!(record.raw_structure, Some(json!(42)));
    }

    #[test]
    fn first_match_wins_even_if_empty() {
        let doc = json!({"wrapper": {"id": ""}, "order_id": "later"});
        let record = CustomNormalizer.normalize(&doc, &ShapeRegistry::new()).unwrap();
        assert_eq!(record.order_id, "");
    }
}

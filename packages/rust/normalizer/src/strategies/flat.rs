//! Flat `{id, customer, products, total}` orders.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::Value;

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::{as_number, as_object, display_string, type_name};
use crate::{NormalizeError, ShapeTag};

/// Keys that mark a flat order, with the JSON type each must have.
const FLAT_FIELDS: [(&str, &str); 4] = [
    ("id", "string"),
    ("customer", "string"),
    ("products", "list"),
    ("total", "number"),
];

pub struct FlatOrderNormalizer;

impl ShapeNormalizer for FlatOrderNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::FlatOrder
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| FLAT_FIELDS.iter().any(|(key, _)| o.contains_key(*key)))
    }

    fn normalize(
        &self,
        value: &Value,
        _registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let obj = as_object(value, "root")?;

        // Every field is checked; one anomaly per missing or mistyped field.
        let mut anomalies = Vec::new();
        for (key, expected) in FLAT_FIELDS {
            match obj.get(key) {
                None => anomalies.push(format!("Missing field: {key}")),
                Some(v) if type_name(v) != expected => anomalies.push(format!(
                    "Invalid type for {key}: expected {expected}, got {}",
                    type_name(v)
                )),
                Some(_) => {}
            }
        }

        Ok(CanonicalOrderRecord {
            order_id: obj.get("id").map(display_string).unwrap_or_default(),
            customer_name: obj.get("customer").map(display_string).unwrap_or_default(),
            items: obj
                .get("products")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            total_amount: obj.get("total").and_then(as_number).unwrap_or(0.0),
            anomalies,
            ..CanonicalOrderRecord::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: Value) -> CanonicalOrderRecord {
        FlatOrderNormalizer.normalize(&value, &ShapeRegistry::new()).unwrap()
    }

    #[test]
    fn well_formed_flat_order_has_no_anomalies() {
        let record = run(json!({
            "id": "12345",
            "customer": "Jane Smith",
            "products": ["Product X", "Product Y"],
            "total": 1500.50
        }));
        assert_eq!(record.order_id, "12345");
        assert_eq!(record.customer_name, "Jane Smith");
        assert_eq!(record.items, vec![json!("Product X"), json!("Product Y")]);
        assert_eq!(record.total_amount, 1500.50);
        assert!(record.anomalies.is_empty());
    }

    #[test]
    fn validation_does_not_short_circuit() {
        let record = run(json!({"id": 12345, "products": "Product X", "total": "10"}));
        assert_eq!(
            record.anomalies,
            [
                "Invalid type for id: expected string, got number",
                "Missing field: customer",
                "Invalid type for products: expected list, got string",
                "Invalid type for total: expected number, got string",
            ]
        );
        assert_eq!(record.order_id, "12345");
        assert!(record.items.is_empty());
        // Mistyped, but still a readable amount.
        assert_eq!(record.total_amount, 10.0);
    }

    #[test]
    fn unreadable_total_is_zero_with_anomaly() {
        let record = run(json!({"id": "1", "customer": "C", "products": [], "total": "ten"}));
        assert_eq!(record.anomalies, ["Invalid type for total: expected number, got string"]);
        assert_eq!(record.total_amount, 0.0);
    }
}

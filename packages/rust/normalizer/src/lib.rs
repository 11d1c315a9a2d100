//! JSON structure classification and normalization for docrouter.
//!
//! Incoming JSON documents come in several shapes (nested order requests,
//! flat orders, RFQs, arrays, unknown structures). [`classify_structure`]
//! picks the shape by a fixed precedence ladder and [`normalize`] maps the
//! document into a [`CanonicalOrderRecord`], recording every validation
//! problem as an anomaly instead of failing.

mod strategies;
mod value;

use docrouter_shared::CanonicalOrderRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use strategies::{
    ArrayNormalizer, CustomNormalizer, FlatOrderNormalizer, NestedOrderNormalizer,
    NestedOrderRequestNormalizer, RfqNormalizer, ShapeNormalizer, ShapeRegistry,
};

/// Detected structural pattern of a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeTag {
    NestedOrderRequest,
    NestedOrder,
    FlatOrder,
    RfqStructure,
    ArrayStructure,
    CustomStructure,
}

impl ShapeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NestedOrderRequest => "nested_order_request",
            Self::NestedOrder => "nested_order",
            Self::FlatOrder => "flat_order",
            Self::RfqStructure => "rfq_structure",
            Self::ArrayStructure => "array_structure",
            Self::CustomStructure => "custom_structure",
        }
    }
}

impl std::fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input a strategy cannot walk at all. Surfaces as a "Processing error" anomaly.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("{path} must be an object, got {found}")]
    NotAnObject {
        path: &'static str,
        found: &'static str,
    },

    #[error("expected an array, got {found}")]
    NotAnArray { found: &'static str },
}

/// Shape of `value`: first satisfied rule wins, no backtracking.
pub fn classify_structure(value: &Value) -> ShapeTag {
    ShapeRegistry::new().detect(value).tag()
}

/// Normalize `value` with the strategy for `shape`. Never fails.
pub fn normalize(value: &Value, shape: ShapeTag) -> CanonicalOrderRecord {
    ShapeRegistry::new().normalize(value, shape)
}

/// Classify and normalize in one step.
pub fn normalize_value(value: &Value) -> (ShapeTag, CanonicalOrderRecord) {
    ShapeRegistry::new().normalize_detected(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precedence_ladder() {
        let cases = [
            (json!({"orderRequest": {}, "order": {}, "id": 1}), ShapeTag::NestedOrderRequest),
            (json!({"order": {}, "id": 1, "rfq": {}}), ShapeTag::NestedOrder),
            (json!({"total": 5, "rfq": {}}), ShapeTag::FlatOrder),
            (json!({"customer": "x"}), ShapeTag::FlatOrder),
            (json!({"quote": {}}), ShapeTag::RfqStructure),
            (json!({"request": "x"}), ShapeTag::RfqStructure),
            (json!([{"orderRequest": {}}]), ShapeTag::ArrayStructure),
            (json!([]), ShapeTag::ArrayStructure),
            (json!({"purchase": {}}), ShapeTag::CustomStructure),
            (json!("text"), ShapeTag::CustomStructure),
            (json!(null), ShapeTag::CustomStructure),
        ];
        for (value, expected) in cases {
            assert_eq!(classify_structure(&value), expected, "for {value}");
        }
    }

    #[test]
    fn shape_tag_wire_names() {
        assert_eq!(
            serde_json::to_value(ShapeTag::NestedOrderRequest).unwrap(),
            json!("nested_order_request")
        );
        assert_eq!(serde_json::to_value(ShapeTag::RfqStructure).unwrap(), json!("rfq_structure"));
        assert_eq!(ShapeTag::CustomStructure.to_string(), "custom_structure");
    }

    #[test]
    fn flat_order_round_trip() {
        let input = json!({
            "id": "12345",
            "customer": "Jane Smith",
            "products": ["Product X", "Product Y"],
            "total": 1500.50
        });
        let (shape, record) = normalize_value(&input);
        assert_eq!(shape, ShapeTag::FlatOrder);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "order_id": "12345",
                "customer_name": "Jane Smith",
                "items": ["Product X", "Product Y"],
                "total_amount": 1500.50
            })
        );
    }

    #[test]
    fn empty_order_request_has_no_price_anomaly() {
        let input = json!({"orderRequest": {"id": "", "customer": {"name": ""}, "items": []}});
        let (shape, record) = normalize_value(&input);
        assert_eq!(shape, ShapeTag::NestedOrderRequest);
        assert!(record.anomalies.contains(&"Missing orderRequest.id".to_string()));
        assert!(record.anomalies.iter().any(|a| a.starts_with("Missing customer name")));
        assert!(record.anomalies.contains(&"orderRequest.items is empty".to_string()));
        assert!(!record.anomalies.iter().any(|a| a.contains("cannot be calculated")));
        assert_eq!(record.total_amount, 0.0);
    }

    #[test]
    fn normalizing_own_output_is_idempotent() {
        let input = json!({"order": {
            "id": "O-1",
            "customer": {"name": "Acme"},
            "items": [{"sku": "A", "unitPrice": 2.0, "quantity": 5}]
        }});
        let (_, first) = normalize_value(&input);

        // Map the canonical record back onto the flat input shape.
        let back = json!({
            "id": first.order_id,
            "customer": first.customer_name,
            "products": first.items,
            "total": first.total_amount,
        });
        let (_, second) = normalize_value(&back);

        assert_eq!(second.order_id, first.order_id);
        assert_eq!(second.customer_name, first.customer_name);
        assert_eq!(second.items, first.items);
        assert_eq!(second.total_amount, first.total_amount);
        assert!(second.anomalies.is_empty());
    }

    #[test]
    fn mistyped_nested_total_is_an_anomaly_not_a_failure() {
        let input = json!({"order": {
            "id": "O-9",
            "customer": {"name": "Acme"},
            "items": [{"sku": "A"}],
            "total": "150.00"
        }});
        let (shape, record) = normalize_value(&input);
        assert_eq!(shape, ShapeTag::NestedOrder);
        assert_eq!(record.order_id, "O-9");
        assert_eq!(record.customer_name, "Acme");
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.total_amount, 150.0);
        assert!(!record.anomalies.iter().any(|a| a.starts_with("Processing error")));
    }

    #[test]
    fn processing_errors_degrade_to_empty_record() {
        let record = normalize(&json!({"order": [1, 2]}), ShapeTag::NestedOrder);
        assert_eq!(record.order_id, "");
        assert_eq!(record.anomalies, ["Processing error: order must be an object, got list"]);

        let record = normalize(&json!({"id": 1}), ShapeTag::ArrayStructure);
        assert_eq!(record.anomalies, ["Processing error: expected an array, got object"]);
    }
}

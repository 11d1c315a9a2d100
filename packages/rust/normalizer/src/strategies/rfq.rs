//! Requests for quotation, with or without an `rfq` wrapper.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::{Value, json};

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::{as_object, display_string, first_present};
use crate::{NormalizeError, ShapeTag};

const RFQ_KEYS: [&str; 3] = ["rfq", "request", "quote"];

pub struct RfqNormalizer;

impl ShapeNormalizer for RfqNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::RfqStructure
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| RFQ_KEYS.iter().any(|key| o.contains_key(*key)))
    }

    fn normalize(
        &self,
        value: &Value,
        _registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let root = as_object(value, "root")?;
        let rfq = match root.get("rfq") {
            Some(inner) => as_object(inner, "rfq")?,
            None => root,
        };

        let order_id = first_present(rfq, &["rfq_number", "id"])
            .map(display_string)
            .unwrap_or_default();
        let customer_name = first_present(rfq, &["vendor", "customer"])
            .map(display_string)
            .unwrap_or_default();
        let items = first_present(rfq, &["items", "products"])
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut anomalies = Vec::new();
        if order_id.is_empty() {
            anomalies.push("Missing RFQ number or ID".to_string());
        }
        if customer_name.is_empty() {
            anomalies.push("Missing vendor/customer information".to_string());
        }

        let field = |key: &str, default: Value| rfq.get(key).cloned().unwrap_or(default);
        let rfq_specific = json!({
            "deadline": field("deadline", json!("")),
            "requirements": field("requirements", json!("")),
            "specifications": field("specifications", json!({})),
        });

        // No committed price exists yet for a quotation request.
        Ok(CanonicalOrderRecord {
            order_id,
            customer_name,
            items,
            total_amount: 0.0,
            anomalies,
            rfq_specific: Some(rfq_specific),
            ..CanonicalOrderRecord::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(value: Value) -> CanonicalOrderRecord {
        RfqNormalizer.normalize(&value, &ShapeRegistry::new()).unwrap()
    }

    #[test]
    fn wrapped_rfq() {
        let record = run(json!({"rfq": {
            "rfq_number": "RFQ-2024-001",
            "vendor": "Steel Supply Co",
            "items": [{"description": "Steel beams", "quantity": 50}],
            "deadline": "2024-03-01",
            "total": 1200
        }}));
        assert_eq!(record.order_id, "RFQ-2024-001");
        assert_eq!(record.customer_name, "Steel Supply Co");
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.total_amount, 0.0);
        assert!(record.anomalies.is_empty());
        let specific = record.rfq_specific.unwrap();
        assert_eq!(specific["deadline"], json!("2024-03-01"));
        assert_eq!(specific["specifications"], json!({}));
    }

    #[test]
    fn unwrapped_rfq_missing_identity() {
        let record = run(json!({"quote": true, "products": ["bolts"]}));
        assert_eq!(record.items, vec![json!("bolts")]);
        assert_eq!(
            record.anomalies,
            ["Missing RFQ number or ID", "Missing vendor/customer information"]
        );
    }
}

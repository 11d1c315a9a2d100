//! `{"orderRequest": {...}}` procurement requests.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::{Value, json};

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::{as_object, display_string};
use crate::{NormalizeError, ShapeTag};

pub struct NestedOrderRequestNormalizer;

impl ShapeNormalizer for NestedOrderRequestNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::NestedOrderRequest
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_object().is_some_and(|o| o.contains_key("orderRequest"))
    }

    fn normalize(
        &self,
        value: &Value,
        _registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let root = as_object(value, "root")?;
        let empty = Value::Object(Default::default());
        let request = as_object(root.get("orderRequest").unwrap_or(&empty), "orderRequest")?;

        let mut anomalies = Vec::new();

        let order_id = request.get("id").map(display_string).unwrap_or_default();
        if order_id.is_empty() {
            anomalies.push("Missing orderRequest.id".to_string());
        }

        let customer_name = match request.get("customer") {
            None | Some(Value::Object(_)) => {
                let name = request
                    .get("customer")
                    .and_then(|c| c.get("name"))
                    .map(display_string)
                    .unwrap_or_default();
                if name.is_empty() {
                    anomalies.push("Missing customer name in orderRequest.customer".to_string());
                }
                name
            }
            Some(Value::String(name)) => name.clone(),
            Some(_) => {
                anomalies.push("Invalid customer format in orderRequest".to_string());
                String::new()
            }
        };

        let items: &[Value] = match request.get("items") {
            None => {
                anomalies.push("orderRequest.items is empty".to_string());
                &[]
            }
            Some(Value::Array(items)) => {
                if items.is_empty() {
                    anomalies.push("orderRequest.items is empty".to_string());
                }
                items
            }
            Some(_) => {
                anomalies.push("orderRequest.items should be a list".to_string());
                &[]
            }
        };

        let mut processed = Vec::with_capacity(items.len());
        let mut total_amount = 0.0;
        for (i, item) in items.iter().enumerate() {
            let Some(obj) = item.as_object() else {
                anomalies.push(format!("Item {i} is not a valid object"));
                continue;
            };

            if let (Some(quantity), Some(unit_price)) = (
                obj.get("quantity").and_then(Value::as_f64),
                obj.get("unitPrice").and_then(Value::as_f64),
            ) {
                total_amount += quantity * unit_price;
            }

            processed.push(json!({
                "sku": obj.get("sku").cloned().unwrap_or_else(|| json!("")),
                "description": obj.get("description").cloned().unwrap_or_else(|| json!("")),
                "quantity": obj.get("quantity").cloned().unwrap_or_else(|| json!(0)),
                "unitPrice": obj.get("unitPrice").cloned().unwrap_or(Value::Null),
                "preferredSpecs": obj.get("preferredSpecs").cloned().unwrap_or_else(|| json!({})),
            }));
        }

        if total_amount == 0.0 && !processed.is_empty() {
            anomalies.push("No unit prices available - total amount cannot be calculated".to_string());
        }

        let field = |key: &str, default: Value| request.get(key).cloned().unwrap_or(default);
        let additional_info = json!({
            "request_type": field("requestType", json!("")),
            "date_submitted": field("dateSubmitted", json!("")),
            "delivery_requirements": field("deliveryRequirements", json!({})),
            "additional_notes": field("additionalNotes", json!("")),
        });

        Ok(CanonicalOrderRecord {
            order_id,
            customer_name,
            items: processed,
            total_amount,
            anomalies,
            additional_info: Some(additional_info),
            ..CanonicalOrderRecord::default()
        })
    }
}

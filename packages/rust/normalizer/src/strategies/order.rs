//! `{"order": {...}}` documents.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::Value;

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::{as_number, as_object, display_string, first_present, priced_total, type_name};
use crate::{NormalizeError, ShapeTag};

/// Price keys accepted on order items, in lookup order.
const PRICE_KEYS: &[&str] = &["unitPrice", "price", "unit_price"];

/// Synonyms for the stated order total, in lookup order.
const TOTAL_KEYS: [&str; 2] = ["total", "amount"];

pub struct NestedOrderNormalizer;

impl ShapeNormalizer for NestedOrderNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::NestedOrder
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_object().is_some_and(|o| o.contains_key("order"))
    }

    fn normalize(
        &self,
        value: &Value,
        _registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let root = as_object(value, "root")?;
        let empty = Value::Object(Default::default());
        let order = as_object(root.get("order").unwrap_or(&empty), "order")?;

        let mut anomalies = Vec::new();

        let order_id = order.get("id").map(display_string).unwrap_or_default();
        if order_id.is_empty() {
            anomalies.push("Missing order.id".to_string());
        }

        let customer_name = match order.get("customer") {
            Some(Value::Object(customer)) => {
                customer.get("name").map(display_string).unwrap_or_default()
            }
            Some(other) => display_string(other),
            None => String::new(),
        };
        if customer_name.is_empty() {
            anomalies.push("Missing customer information".to_string());
        }

        let items = match first_present(order, &["items", "products"]) {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                anomalies.push("Items should be a list".to_string());
                Vec::new()
            }
            None => Vec::new(),
        };

        // A mistyped total is an anomaly; a numeric string still counts as the total.
        let stated = TOTAL_KEYS
            .into_iter()
            .find_map(|key| order.get(key).map(|total| (key, total)));
        let stated_total = match stated {
            Some((key, total)) => {
                if !total.is_number() {
                    anomalies.push(format!(
                        "Invalid type for order.{key}: expected number, got {}",
                        type_name(total)
                    ));
                }
                as_number(total)
            }
            None => None,
        };

        let total_amount = match stated_total {
            Some(total) => total,
            None => {
                let (total, priced) = priced_total(&items, PRICE_KEYS, Some(1.0));
                if priced == 0 && !items.is_empty() {
                    anomalies.push(
                        "No unit prices available - total amount cannot be calculated".to_string(),
                    );
                }
                total
            }
        };

        Ok(CanonicalOrderRecord {
            order_id,
            customer_name,
            items,
            total_amount,
            anomalies,
            ..CanonicalOrderRecord::default()
        })
    }
}

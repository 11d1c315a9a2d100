//! Top-level arrays: normalize the first element, count the rest.

use docrouter_shared::CanonicalOrderRecord;
use serde_json::Value;

use super::{ShapeNormalizer, ShapeRegistry};
use crate::value::type_name;
use crate::{NormalizeError, ShapeTag};

pub struct ArrayNormalizer;

impl ShapeNormalizer for ArrayNormalizer {
    fn tag(&self) -> ShapeTag {
        ShapeTag::ArrayStructure
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_array()
    }

    fn normalize(
        &self,
        value: &Value,
        registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError> {
        let elements = value.as_array().ok_or(NormalizeError::NotAnArray {
            found: type_name(value),
        })?;

        let Some(first) = elements.first() else {
            return Ok(CanonicalOrderRecord::degraded("Empty array provided"));
        };

        let (_, mut record) = registry.normalize_detected(first);

        let overflow = elements.len() - 1;
        if overflow > 0 {
            record.anomalies.push(format!(
                "Array contains {} items, processed only the first one ({overflow} additional item(s) not processed)",
                elements.len()
            ));
            record.additional_items_count = Some(overflow);
        }
        Ok(record)
    }
}

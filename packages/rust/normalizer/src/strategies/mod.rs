//! One normalization strategy per JSON shape, held in a priority registry.

mod array;
mod custom;
mod flat;
mod order;
mod order_request;
mod rfq;

use docrouter_shared::CanonicalOrderRecord;
use serde_json::Value;

use crate::{NormalizeError, ShapeTag};

pub use array::ArrayNormalizer;
pub use custom::CustomNormalizer;
pub use flat::FlatOrderNormalizer;
pub use order::NestedOrderNormalizer;
pub use order_request::NestedOrderRequestNormalizer;
pub use rfq::RfqNormalizer;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Maps one JSON shape into a [`CanonicalOrderRecord`].
///
/// Strategies are tried in priority order; `CustomNormalizer` is the always-last fallback.
pub trait ShapeNormalizer: Send + Sync {
    /// The shape this strategy handles.
    fn tag(&self) -> ShapeTag;

    /// Whether `value` has this shape.
    fn matches(&self, value: &Value) -> bool;

    /// Normalize `value`. Field-level problems become anomalies on the record;
    /// `Err` is reserved for input the strategy cannot walk at all.
    fn normalize(
        &self,
        value: &Value,
        registry: &ShapeRegistry,
    ) -> Result<CanonicalOrderRecord, NormalizeError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds normalizers in precedence order.
pub struct ShapeRegistry {
    strategies: Vec<Box<dyn ShapeNormalizer>>,
}

impl ShapeRegistry {
    /// Registry with all built-in strategies (`orderRequest` first, custom last).
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(NestedOrderRequestNormalizer),
                Box::new(NestedOrderNormalizer),
                Box::new(FlatOrderNormalizer),
                Box::new(RfqNormalizer),
                Box::new(ArrayNormalizer),
                Box::new(CustomNormalizer),
            ],
        }
    }

    /// First strategy whose shape matches. Falls back to the custom strategy.
    pub fn detect(&self, value: &Value) -> &dyn ShapeNormalizer {
        for strategy in &self.strategies {
            if strategy.matches(value) {
                return strategy.as_ref();
            }
        }
        &CustomNormalizer
    }

    /// Strategy registered for `tag`.
    pub fn strategy(&self, tag: ShapeTag) -> &dyn ShapeNormalizer {
        for strategy in &self.strategies {
            if strategy.tag() == tag {
                return strategy.as_ref();
            }
        }
        &CustomNormalizer
    }

    /// Normalize with the strategy for `shape`, degrading any error into an
    /// empty record carrying a processing-error anomaly.
    pub fn normalize(&self, value: &Value, shape: ShapeTag) -> CanonicalOrderRecord {
        match self.strategy(shape).normalize(value, self) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(%shape, error = %e, "normalization failed");
                CanonicalOrderRecord::degraded(format!("Processing error: {e}"))
            }
        }
    }

    /// Detect the shape of `value`, then normalize it.
    pub fn normalize_detected(&self, value: &Value) -> (ShapeTag, CanonicalOrderRecord) {
        let shape = self.detect(value).tag();
        tracing::debug!(%shape, "detected JSON structure");
        (shape, self.normalize(value, shape))
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

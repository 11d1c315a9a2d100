use std::sync::Arc;

use docrouter_normalizer::normalize_value;
use docrouter_shared::{CanonicalOrderRecord, ExtractedData, ThreadId};
use docrouter_storage::ContextRecorder;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::text::prefix;

/// Characters of unparseable input kept in the context for review.
pub const RAW_INPUT_CHARS: usize = 1000;

/// Structure detection and normalization of JSON documents.
pub struct JsonAgent {
    recorder: Arc<ContextRecorder>,
}

impl JsonAgent {
    pub fn new(recorder: Arc<ContextRecorder>) -> Self {
        Self { recorder }
    }

    /// Parse, classify, and normalize `text`. Unparseable input yields an
    /// empty record with a processing-error anomaly.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn process(&self, thread_id: &ThreadId, text: &str) -> CanonicalOrderRecord {
        let mut partial = ExtractedData::new();

        let record = match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                let (shape, record) = normalize_value(&value);
                info!(shape = %shape, anomalies = record.anomalies.len(), "json normalized");

                partial.insert("json_original_data".into(), value);
                match serde_json::to_value(&record) {
                    Ok(reformatted) => {
                        partial.insert("json_reformatted_data".into(), reformatted);
                    }
                    Err(e) => warn!(error = %e, "normalized record not serializable"),
                }
                partial.insert(
                    "json_anomalies".into(),
                    Value::from(record.anomalies.clone()),
                );
                partial.insert("json_structure_type".into(), shape.as_str().into());
                record
            }
            Err(e) => {
                warn!(error = %e, "json document does not parse");
                partial.insert("json_processing_error".into(), e.to_string().into());
                partial.insert("json_raw_input".into(), prefix(text, RAW_INPUT_CHARS).into());
                CanonicalOrderRecord::degraded(format!("Processing error: {e}"))
            }
        };

        self.recorder.merge(thread_id, partial).await;
        record
    }
}

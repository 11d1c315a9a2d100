//! Per-document result logs.

use std::path::{Path, PathBuf};

use docrouter_shared::{DocRouterError, Result};

use crate::pipeline::ProcessingResult;

/// Write `result` as pretty JSON to `<dir>/<thread_id>.json`, creating `dir`.
pub fn write_result_log(dir: &Path, result: &ProcessingResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| DocRouterError::io(dir, e))?;

    let path = dir.join(format!("{}.json", result.thread_id));
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| DocRouterError::parse(format!("serialize result: {e}")))?;
    std::fs::write(&path, json).map_err(|e| DocRouterError::io(&path, e))?;

    tracing::debug!(path = %path.display(), "result log written");
    Ok(path)
}

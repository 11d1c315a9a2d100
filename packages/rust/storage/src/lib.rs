//! Context storage for docrouter.
//!
//! [`ContextStore`] is the key-value contract (put with optional TTL, get,
//! list keys). Two backends implement it:
//! - [`LibsqlStore`]: local libSQL database with per-entry expiry
//! - [`MemoryStore`]: process-local map, used directly or as the fallback
//!
//! [`ContextRecorder`] builds the per-document processing trace on top.

mod database;
mod migrations;
mod recorder;
mod store;

use std::sync::Arc;

use docrouter_shared::{StoreBackend, StoreConfig};

pub use database::LibsqlStore;
pub use recorder::ContextRecorder;
pub use store::{ContextStore, MemoryStore};

/// Open the configured backend. An unreachable libSQL database degrades to
/// `fallback`, with a warning; data then lives only as long as the process.
pub async fn open_store(config: &StoreConfig, fallback: Arc<MemoryStore>) -> Arc<dyn ContextStore> {
    match config.backend {
        StoreBackend::Memory => fallback as Arc<dyn ContextStore>,
        StoreBackend::Libsql => {
            let opened = match config.resolved_path() {
                Ok(path) => LibsqlStore::open(&path).await,
                Err(e) => Err(e),
            };
            match opened {
                Ok(store) => {
                    if let Err(e) = store.purge_expired().await {
                        tracing::warn!(error = %e, "could not purge expired contexts");
                    }
                    Arc::new(store) as Arc<dyn ContextStore>
                }
                Err(e) => {
                    tracing::warn!(error = %e, "context database unavailable, using in-memory store");
                    fallback
                }
            }
        }
    }
}

/// Open the configured backend and wrap it in a [`ContextRecorder`] sharing
/// `fallback` as its process-local store.
pub async fn open_recorder(config: &StoreConfig, fallback: Arc<MemoryStore>) -> ContextRecorder {
    let store = open_store(config, fallback.clone()).await;
    ContextRecorder::new(store, fallback, config.retention())
}

//! libSQL-backed context store with per-entry expiry.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use docrouter_shared::{DocRouterError, Result};
use libsql::{Connection, Database, params};
use serde_json::Value;

use crate::migrations;
use crate::store::ContextStore;

/// Context store over a local libSQL database file.
///
/// Expired rows are invisible to reads and are removed by [`LibsqlStore::purge_expired`].
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LibsqlStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocRouterError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DocRouterError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    pub(crate) async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    /// Delete rows whose expiry has passed. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM contexts WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
            .await
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;
        if removed > 0 {
            tracing::debug!(removed, "purged expired contexts");
        }
        Ok(removed)
    }
}

#[async_trait]
impl ContextStore for LibsqlStore {
    fn backend(&self) -> &str {
        "libsql"
    }

    fn expiring(&self) -> bool {
        true
    }

    async fn put(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let value_json = serde_json::to_string(value)
            .map_err(|e| DocRouterError::Storage(format!("serialize {key}: {e}")))?;
        let now = Utc::now();
        let expires_at = ttl.map(|ttl| now.timestamp() + ttl.as_secs() as i64);
        let now = now.to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO contexts (key, value_json, created_at, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    value_json = excluded.value_json,
                    updated_at = excluded.updated_at,
                    expires_at = excluded.expires_at",
                params![key, value_json.as_str(), now.as_str(), expires_at],
            )
            .await
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value_json FROM contexts
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json = row
                    .get::<String>(0)
                    .map_err(|e| DocRouterError::Storage(e.to_string()))?;
                let value = serde_json::from_str(&json)
                    .map_err(|e| DocRouterError::Storage(format!("corrupt value for {key}: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DocRouterError::Storage(e.to_string())),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key FROM contexts
                 WHERE expires_at IS NULL OR expires_at > ?1
                 ORDER BY key",
                params![Utc::now().timestamp()],
            )
            .await
            .map_err(|e| DocRouterError::Storage(e.to_string()))?;

        let mut keys = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            keys.push(
                row.get::<String>(0)
                    .map_err(|e| DocRouterError::Storage(e.to_string()))?,
            );
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("dr_test_{}.db", Uuid::now_v7()))
    }

    async fn test_store() -> LibsqlStore {
        LibsqlStore::open(&temp_db_path()).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let path = temp_db_path();
        let first = LibsqlStore::open(&path).await.expect("first open");
        drop(first);
        let second = LibsqlStore::open(&path).await.expect("second open");
        assert_eq!(second.schema_version().await, 2);
    }

    #[tokio::test]
    async fn put_get_overwrite() {
        let store = test_store().await;
        store.put("t1", &json!({"intent": "RFQ"}), None).await.unwrap();
        store
            .put("t1", &json!({"intent": "Invoice"}), Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert_eq!(store.get("t1").await.unwrap(), Some(json!({"intent": "Invoice"})));
        assert_eq!(store.get("t2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_hidden_and_purged() {
        let store = test_store().await;
        store.put("live", &json!(1), Some(Duration::from_secs(3600))).await.unwrap();
        store.put("forever", &json!(2), None).await.unwrap();
        store.put("stale", &json!(3), Some(Duration::ZERO)).await.unwrap();

        assert_eq!(store.get("stale").await.unwrap(), None);
        assert_eq!(store.list_keys().await.unwrap(), ["forever", "live"]);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }
}

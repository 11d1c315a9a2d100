//! SQL migration definitions for the context database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: contexts keyed by thread id",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per stored value; value_json holds the serialized context.
CREATE TABLE IF NOT EXISTS contexts (
    key        TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Per-entry expiry (unix seconds, NULL = never)",
            sql: r#"
ALTER TABLE contexts ADD COLUMN expires_at INTEGER;

CREATE INDEX IF NOT EXISTS idx_contexts_expires_at ON contexts(expires_at);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}

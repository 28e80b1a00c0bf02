//! Database Schema Definitions
//!
//! Contains the local schema and its version bookkeeping.

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Schema migration versions
pub const MIGRATION_VERSIONS: &[i64] = &[1];

/// Migration bookkeeping table
pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

/// Key/value table holding client state such as the session
pub const CREATE_KV_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Get pending migrations
pub fn get_pending_migrations(current_version: i64) -> Vec<i64> {
    MIGRATION_VERSIONS
        .iter()
        .filter(|&&v| v > current_version)
        .cloned()
        .collect()
}

// Database schema: table creation.
//
// A `schema_version` table records which schema revision the file was built
// with so later migrations can be applied incrementally.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema revision.
pub const SCHEMA_VERSION: i64 = 1;

/// Create all tables if they don't exist yet.
///
/// This is idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Registered products (tenants). Only a SHA-256 digest of the api key is kept.
        CREATE TABLE IF NOT EXISTS products (
            product_id TEXT PRIMARY KEY,
            product_name TEXT NOT NULL,
            api_key_hash TEXT NOT NULL UNIQUE,
            mode TEXT NOT NULL DEFAULT 'async',   -- sync / async
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per analyzed inbound request
        CREATE TABLE IF NOT EXISTS request_analysis_results (
            result_id TEXT PRIMARY KEY,
            request_id TEXT NOT NULL,
            analyzer_name TEXT NOT NULL,
            metric REAL NOT NULL,              -- 0.0 to 1.0
            reject_flg INTEGER NOT NULL,
            reasons TEXT,                      -- JSON array of JSON-encoded reasons, NULL if none
            created_at TEXT NOT NULL
        );

        -- One row per analyzed outbound response
        CREATE TABLE IF NOT EXISTS response_analysis_results (
            result_id TEXT PRIMARY KEY,
            response_id TEXT NOT NULL,
            analyzer_name TEXT NOT NULL,
            metric REAL NOT NULL,
            reject_flg INTEGER NOT NULL,
            reasons TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_request_results_request
            ON request_analysis_results(request_id);

        CREATE INDEX IF NOT EXISTS idx_response_results_response
            ON response_analysis_results(response_id);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

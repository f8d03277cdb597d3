use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_log (
            id INTEGER PRIMARY KEY,
            imported_at INTEGER NOT NULL,
            source TEXT NOT NULL,
            format TEXT NOT NULL,
            categories_added INTEGER NOT NULL DEFAULT 0,
            sub_categories_added INTEGER NOT NULL DEFAULT 0,
            bookmarks_added INTEGER NOT NULL DEFAULT 0,
            duplicates_skipped INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS import_log_imported_at ON import_log(imported_at DESC);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};
use crate::library::{Library, MergeOutcome};
use crate::model::{Bookmark, Category};

mod schema;

const CATEGORIES_KEY: &str = "categories";
const BOOKMARKS_KEY: &str = "bookmarks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub id: i64,
    pub imported_at: i64,
    pub source: String,
    pub format: String,
    pub categories_added: usize,
    pub sub_categories_added: usize,
    pub bookmarks_added: usize,
    pub duplicates_skipped: usize,
}

/// Shared handle to the on-disk store. Each operation opens its own connection.
#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn load_library(&self) -> Result<Library> {
        self.with_connection(|conn| {
            let categories: Vec<Category> = read_value(conn, CATEGORIES_KEY)?.unwrap_or_default();
            let bookmarks: Vec<Bookmark> = read_value(conn, BOOKMARKS_KEY)?.unwrap_or_default();
            Ok(Library {
                categories,
                bookmarks,
            })
        })
    }

    /// Replaces the stored library. Both keys are written in one transaction.
    pub fn save_library(&self, library: &Library) -> Result<()> {
        self.write_library(library, None).map(|_| ())
    }

    /// Replaces the stored library and logs the import that produced it. The library
    /// and the log row commit together or not at all.
    pub fn save_import(
        &self,
        library: &Library,
        source: &str,
        format: &str,
        outcome: &MergeOutcome,
    ) -> Result<i64> {
        self.write_library(library, Some((source, format, outcome)))?
            .context("import log row was not written")
    }

    fn write_library(
        &self,
        library: &Library,
        import: Option<(&str, &str, &MergeOutcome)>,
    ) -> Result<Option<i64>> {
        library
            .validate()
            .context("refusing to save an inconsistent library")?;
        let mut conn = self.connect()?;
        let tx = conn.transaction().context("starting save transaction")?;
        write_value(&tx, CATEGORIES_KEY, &library.categories)?;
        write_value(&tx, BOOKMARKS_KEY, &library.bookmarks)?;
        let import_id = match import {
            Some((source, format, outcome)) => Some(insert_import(&tx, source, format, outcome)?),
            None => None,
        };
        tx.commit().context("committing library")?;
        let summary = library.summary();
        tracing::debug!(
            categories = summary.categories,
            bookmarks = summary.bookmarks,
            import_id,
            "library saved"
        );
        Ok(import_id)
    }

    pub fn recent_imports(&self, limit: usize) -> Result<Vec<ImportRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, imported_at, source, format, categories_added,
                            sub_categories_added, bookmarks_added, duplicates_skipped
                     FROM import_log
                     ORDER BY imported_at DESC, id DESC
                     LIMIT ?1",
                )
                .context("preparing import history query")?;
            let records = stmt
                .query_map([limit as i64], |row| {
                    Ok(ImportRecord {
                        id: row.get(0)?,
                        imported_at: row.get(1)?,
                        source: row.get(2)?,
                        format: row.get(3)?,
                        categories_added: row.get::<_, i64>(4)? as usize,
                        sub_categories_added: row.get::<_, i64>(5)? as usize,
                        bookmarks_added: row.get::<_, i64>(6)? as usize,
                        duplicates_skipped: row.get::<_, i64>(7)? as usize,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }
}

fn insert_import(conn: &Connection, source: &str, format: &str, outcome: &MergeOutcome) -> Result<i64> {
    conn.execute(
        "INSERT INTO import_log (imported_at, source, format, categories_added,
                                 sub_categories_added, bookmarks_added, duplicates_skipped)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            OffsetDateTime::now_utc().unix_timestamp(),
            source,
            format,
            outcome.categories_added as i64,
            outcome.sub_categories_added as i64,
            outcome.bookmarks_added as i64,
            outcome.duplicates_skipped as i64,
        ],
    )
    .context("recording import")?;
    Ok(conn.last_insert_rowid())
}

fn read_value<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("reading key '{key}'"))?;
    match raw {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing stored value for key '{key}'"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn write_value<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).with_context(|| format!("serialising key '{key}'"))?;
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, json, OffsetDateTime::now_utc().unix_timestamp()],
    )
    .with_context(|| format!("writing key '{key}'"))?;
    Ok(())
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "storage ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{SequentialIds, UuidIds};
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            database_path: data_dir.join("markshelf.db"),
        }
    }

    fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let storage = init(&paths, &StorageOptions::default())?;
        Ok((temp, storage))
    }

    #[test]
    fn fresh_store_loads_empty_library() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert!(storage.load_library()?.is_empty());
        Ok(())
    }

    #[test]
    fn saved_library_loads_back() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let sub = library.ensure_path("Dev", "Rust", &mut ids)?;
        library.add_bookmark(&sub, "Book", "https://doc.rust-lang.org/book", &mut ids)?;
        storage.save_library(&library)?;

        let loaded = storage.load_library()?;
        assert_eq!(loaded, library);

        library.remove_bookmark("bm-1")?;
        storage.save_library(&library)?;
        assert!(storage.load_library()?.bookmarks.is_empty());
        Ok(())
    }

    #[test]
    fn inconsistent_library_is_not_saved() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let library = Library {
            categories: Vec::new(),
            bookmarks: vec![Bookmark::new("b1", "t", "u", "missing")],
        };
        assert!(storage.save_library(&library).is_err());
        assert!(storage.load_library()?.is_empty());
        Ok(())
    }

    #[test]
    fn import_history_is_newest_first() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let mut library = Library::default();
        let first = library.merge(Default::default(), &mut UuidIds);
        storage.save_import(&library, "chrome.html", "html", &first)?;
        let second = MergeOutcome {
            bookmarks_added: 4,
            duplicates_skipped: 1,
            ..MergeOutcome::default()
        };
        storage.save_import(&library, "backup.json", "json", &second)?;

        let history = storage.recent_imports(10)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, "backup.json");
        assert_eq!(history[0].bookmarks_added, 4);
        assert_eq!(history[0].duplicates_skipped, 1);
        assert_eq!(history[1].source, "chrome.html");

        assert_eq!(storage.recent_imports(1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn import_log_and_library_commit_together() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let sub = library.ensure_path("Dev", "Rust", &mut ids)?;
        library.add_bookmark(&sub, "Book", "https://doc.rust-lang.org/book", &mut ids)?;
        let outcome = MergeOutcome {
            categories_added: 1,
            sub_categories_added: 1,
            bookmarks_added: 1,
            ..MergeOutcome::default()
        };
        let id = storage.save_import(&library, "chrome.html", "html", &outcome)?;
        assert_eq!(storage.recent_imports(5)?[0].id, id);
        assert_eq!(storage.load_library()?, library);

        storage.with_connection(|conn| {
            conn.execute_batch("DROP TABLE import_log")?;
            Ok(())
        })?;
        library.remove_bookmark("bm-1")?;
        assert!(storage
            .save_import(&library, "again.html", "html", &MergeOutcome::default())
            .is_err());
        assert_eq!(storage.load_library()?.bookmarks.len(), 1);
        Ok(())
    }

    #[test]
    fn handle_reports_the_configured_database() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let storage = init(&paths, &StorageOptions::default())?;
        assert_eq!(storage.database_path(), paths.database_path.as_path());
        assert!(storage.database_path().exists());
        Ok(())
    }
}

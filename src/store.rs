//! Read-only glossary store backed by SQLite.
//! The connection is opened once by `initialize` and held until `close`.
//! Every query runs against a single `dictionary_entries` table; nothing is
//! ever written.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Params, Row};
use thiserror::Error;
use tracing::info;

use crate::entry::{decode_list, Entry, FieldMode, Gender};

const TABLE: &str = "dictionary_entries";

const COLUMNS: &str = "id, german_base, english_base, german_gender, \
     german_annotations, german_variations, english_annotations, english_variations, \
     part_of_speech, subject_domain, usage_level, is_idiom";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dictionary database not found at {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("dictionary database is empty")]
    EmptyStore,
    #[error("dictionary database not initialized")]
    NotInitialized,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Single-owner handle to the glossary database.
pub struct EntryStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl EntryStore {
    /// Create a store for the database at `path`. Nothing is opened until
    /// `initialize` is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the database read-only and verify it has rows.
    /// A no-op once it has succeeded.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let mut guard = self.conn.lock();
        if guard.is_some() {
            return Ok(());
        }

        if !self.path.is_file() {
            return Err(StoreError::FileNotFound(self.path.clone()));
        }

        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        register_fold_case(&conn)?;

        let entries = count_rows(&conn)?;
        if entries == 0 {
            return Err(StoreError::EmptyStore);
        }

        info!(path = %self.path.display(), entries, "glossary store opened");
        *guard = Some(conn);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Release the connection. A later `initialize` reopens it.
    pub fn close(&self) {
        if self.conn.lock().take().is_some() {
            info!(path = %self.path.display(), "glossary store closed");
        }
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(count_rows)
    }

    /// Up to `limit` entries drawn uniformly at random, without replacement.
    pub fn random_sample(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        self.with_conn(|conn| {
            if limit == 0 {
                return Ok(Vec::new());
            }
            let sql = format!("SELECT {COLUMNS} FROM {TABLE} ORDER BY RANDOM() LIMIT ?1");
            query_entries(conn, &sql, params![to_sql_limit(limit)])
        })
    }

    /// Case-insensitive substring search, at most `limit` rows in id order.
    /// An empty `term` matches every row.
    pub fn search(
        &self,
        term: &str,
        mode: FieldMode,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        let needle = term.to_lowercase();
        let predicate = match mode {
            FieldMode::Source => "instr(fold_case(german_base), ?1) > 0",
            FieldMode::Target => "instr(fold_case(english_base), ?1) > 0",
            FieldMode::Both => {
                "(instr(fold_case(german_base), ?1) > 0 \
                 OR instr(fold_case(english_base), ?1) > 0)"
            }
        };
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE {predicate} ORDER BY id LIMIT ?2");
        self.with_conn(|conn| query_entries(conn, &sql, params![needle, to_sql_limit(limit)]))
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        f(conn)
    }
}

/// SQLite's `lower()` only folds ASCII; this folds the full Unicode range so
/// "TÜR" finds "Tür".
fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let folded = match ctx.get_raw(0) {
                ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).to_lowercase(),
                _ => String::new(),
            };
            Ok(folded)
        },
    )
}

fn count_rows(conn: &Connection) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as usize)
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn query_entries<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Entry>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, map_row)?;
    let entries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let gender: Option<String> = row.get(3)?;
    Ok(Entry {
        id: row.get(0)?,
        headword: row.get(1)?,
        translation: row.get(2)?,
        gender: gender.as_deref().map(Gender::from_code),
        headword_annotations: decode_list(text_column(row, 4)),
        headword_variants: decode_list(text_column(row, 5)),
        translation_annotations: decode_list(text_column(row, 6)),
        translation_variants: decode_list(text_column(row, 7)),
        part_of_speech: row.get(8)?,
        subject_domain: row.get(9)?,
        usage_level: row.get(10)?,
        is_idiom: row.get(11)?,
    })
}

/// Borrow a list-encoding column as text. Non-text values are treated as
/// absent so a bad cell never fails the whole row.
fn text_column<'r>(row: &'r Row<'_>, idx: usize) -> Option<&'r str> {
    match row.get_ref(idx).ok()? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;

pub struct Row {
    pub id: i64,
    pub german: &'static str,
    pub english: &'static str,
    pub gender: Option<&'static str>,
    pub german_annotations: Option<&'static str>,
    pub german_variations: Option<&'static str>,
    pub subject_domain: Option<&'static str>,
    pub usage_level: Option<&'static str>,
    pub is_idiom: bool,
}

impl Row {
    pub fn new(id: i64, german: &'static str, english: &'static str) -> Self {
        Self {
            id,
            german,
            english,
            gender: None,
            german_annotations: None,
            german_variations: None,
            subject_domain: None,
            usage_level: None,
            is_idiom: false,
        }
    }

    pub fn gender(mut self, code: &'static str) -> Self {
        self.gender = Some(code);
        self
    }

    pub fn idiom(mut self) -> Self {
        self.is_idiom = true;
        self
    }
}

pub fn scenario_rows() -> Vec<Row> {
    vec![
        Row::new(1, "Haus", "house").gender("n"),
        Row::new(2, "Tür", "door").gender("f"),
        Row::new(3, "Kick den Bock", "kick the bucket").idiom(),
    ]
}

/// A temp directory holding a glossary database. Dropping it deletes the file.
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

pub fn fixture(rows: &[Row]) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("output.db");
    write_db(&path, rows);
    Fixture { dir, path }
}

pub fn write_db(path: &Path, rows: &[Row]) {
    let conn = Connection::open(path).expect("open fixture db");
    conn.execute_batch(
        "CREATE TABLE dictionary_entries (
            id INTEGER PRIMARY KEY,
            german_base TEXT NOT NULL,
            english_base TEXT NOT NULL,
            german_gender TEXT,
            german_annotations TEXT,
            german_variations TEXT,
            english_annotations TEXT,
            english_variations TEXT,
            part_of_speech TEXT,
            subject_domain TEXT,
            usage_level TEXT,
            is_idiom BOOLEAN NOT NULL DEFAULT 0
        );",
    )
    .expect("create fixture table");

    let mut stmt = conn
        .prepare(
            "INSERT INTO dictionary_entries
             (id, german_base, english_base, german_gender, german_annotations,
              german_variations, subject_domain, usage_level, is_idiom)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .expect("prepare insert");
    for row in rows {
        stmt.execute(params![
            row.id,
            row.german,
            row.english,
            row.gender,
            row.german_annotations,
            row.german_variations,
            row.subject_domain,
            row.usage_level,
            row.is_idiom,
        ])
        .expect("insert fixture row");
    }
}

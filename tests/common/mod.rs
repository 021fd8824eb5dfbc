#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use tempfile::{TempDir, tempdir};
use trade_dashboard::{
    data::{ColumnMap, Table},
    source::{CsvFileSource, TableSource},
};

pub const SAMPLE: &str = "trade_sample.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads the Thai-headed sample sheet through the file source.
pub fn sample_table() -> Table {
    let source = CsvFileSource::new(fixture_path(SAMPLE), None, UTF_8);
    let rows = source.fetch_rows().expect("sample rows");
    Table::from_rows(rows, &ColumnMap::default())
}

/// Column names used by the inline tables below.
pub fn english_columns() -> ColumnMap {
    ColumnMap {
        country: "country".to_string(),
        customs_code: "code".to_string(),
        item: "item".to_string(),
        year: "year".to_string(),
        import: "import".to_string(),
        export: "export".to_string(),
    }
}

/// Builds a table from literal rows, header first.
pub fn table_from(rows: &[&[&str]]) -> Table {
    let raw = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Table::from_rows(raw, &english_columns())
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

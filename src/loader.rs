//! Fetch-once loader with a passive time-to-live cache.
//!
//! The loader never fails: source errors are absorbed into diagnostics and an
//! empty table. When a refresh fails while an earlier table is memoized, that
//! stale table is served instead and the memo is left untouched so the next
//! call tries again.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::{
    data::{ColumnMap, Table},
    diagnostic::Diagnostic,
    source::TableSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Fetched,
    Cache,
    /// A refresh failed; the previous table is being served.
    Stale,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: Arc<Table>,
    pub origin: LoadOrigin,
    pub fetched_at: Option<DateTime<Utc>>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Memo {
    table: Arc<Table>,
    fetched: Instant,
    fetched_at: DateTime<Utc>,
}

pub struct DataLoader<S> {
    source: S,
    columns: ColumnMap,
    ttl: Duration,
    memo: Mutex<Option<Memo>>,
}

impl<S: TableSource> DataLoader<S> {
    pub fn new(source: S, columns: ColumnMap, ttl: Duration) -> Self {
        Self {
            source,
            columns,
            ttl,
            memo: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn load(&self) -> LoadOutcome {
        self.load_at(Instant::now())
    }

    /// Same as [`DataLoader::load`] with an explicit clock reading.
    pub fn load_at(&self, now: Instant) -> LoadOutcome {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = memo.as_ref()
            && now.saturating_duration_since(cached.fetched) < self.ttl
        {
            debug!(
                "Serving {} row(s) from cache for {}",
                cached.table.len(),
                self.source.describe()
            );
            return LoadOutcome {
                table: Arc::clone(&cached.table),
                origin: LoadOrigin::Cache,
                fetched_at: Some(cached.fetched_at),
                diagnostics: Vec::new(),
            };
        }

        debug!("Fetching {}", self.source.describe());
        match self.source.fetch_rows() {
            Ok(rows) => {
                let table = Arc::new(Table::from_rows(rows, &self.columns));
                let fetched_at = Utc::now();
                info!(
                    "Loaded {} row(s) across {} column(s) from {}",
                    table.len(),
                    table.headers().len(),
                    self.source.describe()
                );
                let diagnostic = if table.has_no_columns() {
                    Diagnostic::info(format!("{} contains no rows", self.source.describe()))
                } else {
                    Diagnostic::info(format!(
                        "Loaded {} row(s) from {}",
                        table.len(),
                        self.source.describe()
                    ))
                };
                *memo = Some(Memo {
                    table: Arc::clone(&table),
                    fetched: now,
                    fetched_at,
                });
                LoadOutcome {
                    table,
                    origin: LoadOrigin::Fetched,
                    fetched_at: Some(fetched_at),
                    diagnostics: vec![diagnostic],
                }
            }
            Err(err) => {
                error!("Fetching {} failed: {err}", self.source.describe());
                match memo.as_ref() {
                    Some(stale) => LoadOutcome {
                        table: Arc::clone(&stale.table),
                        origin: LoadOrigin::Stale,
                        fetched_at: Some(stale.fetched_at),
                        diagnostics: vec![Diagnostic::warning(format!(
                            "Refreshing data failed ({err}); showing data fetched at {}",
                            stale.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
                        ))],
                    },
                    None => LoadOutcome {
                        table: Arc::new(Table::empty(&self.columns)),
                        origin: LoadOrigin::Unavailable,
                        fetched_at: None,
                        diagnostics: vec![
                            Diagnostic::error(format!("Failed to load data: {err}")),
                            Diagnostic::info(err.hint()),
                        ],
                    },
                }
            }
        }
    }

    /// Drops the memoized table so the next load fetches.
    pub fn invalidate(&self) {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        *memo = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostic::Level, source::SourceError};
    use std::{cell::RefCell, collections::VecDeque};

    /// Replays queued responses and counts fetches.
    struct ScriptedSource {
        responses: RefCell<VecDeque<Result<Vec<Vec<String>>, SourceError>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Vec<String>>, SourceError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl TableSource for ScriptedSource {
        fn describe(&self) -> String {
            "scripted source".to_string()
        }

        fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Malformed("script exhausted".to_string())))
        }
    }

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn ok_sheet() -> Result<Vec<Vec<String>>, SourceError> {
        Ok(sheet(&[&["ชื่อประเทศ", "นำเข้า"], &["ญี่ปุ่น", "10"]]))
    }

    fn loader(responses: Vec<Result<Vec<Vec<String>>, SourceError>>) -> DataLoader<ScriptedSource> {
        DataLoader::new(
            ScriptedSource::new(responses),
            ColumnMap::default(),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn second_load_within_ttl_hits_cache() {
        let loader = loader(vec![ok_sheet()]);
        let start = Instant::now();

        let first = loader.load_at(start);
        let second = loader.load_at(start + Duration::from_secs(299));

        assert_eq!(first.origin, LoadOrigin::Fetched);
        assert_eq!(second.origin, LoadOrigin::Cache);
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert!(second.diagnostics.is_empty());
        assert_eq!(loader.source().calls(), 1);
    }

    #[test]
    fn load_after_ttl_refetches() {
        let loader = loader(vec![ok_sheet(), ok_sheet()]);
        let start = Instant::now();

        loader.load_at(start);
        let refreshed = loader.load_at(start + Duration::from_secs(300));

        assert_eq!(refreshed.origin, LoadOrigin::Fetched);
        assert_eq!(loader.source().calls(), 2);
    }

    #[test]
    fn failure_without_memo_yields_empty_table_and_error() {
        let loader = loader(vec![Err(SourceError::SpreadsheetNotFound {
            sheet_id: "abc".to_string(),
        })]);

        let outcome = loader.load();

        assert_eq!(outcome.origin, LoadOrigin::Unavailable);
        assert!(outcome.table.is_empty());
        assert!(outcome.table.has_no_columns());
        assert_eq!(outcome.diagnostics[0].level, Level::Error);
        assert!(outcome.diagnostics[0].message.contains("abc"));
        assert_eq!(outcome.diagnostics[1].level, Level::Info);
    }

    #[test]
    fn failed_refresh_serves_stale_table_and_retries_next_time() {
        let loader = loader(vec![
            ok_sheet(),
            Err(SourceError::Unauthorized { status: 403 }),
            ok_sheet(),
        ]);
        let start = Instant::now();

        let first = loader.load_at(start);
        let stale = loader.load_at(start + Duration::from_secs(400));
        let retried = loader.load_at(start + Duration::from_secs(401));

        assert_eq!(stale.origin, LoadOrigin::Stale);
        assert!(Arc::ptr_eq(&first.table, &stale.table));
        assert_eq!(stale.diagnostics[0].level, Level::Warning);
        assert_eq!(retried.origin, LoadOrigin::Fetched);
        assert_eq!(loader.source().calls(), 3);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let loader = loader(vec![ok_sheet(), ok_sheet()]);
        let start = Instant::now();

        loader.load_at(start);
        loader.invalidate();
        let outcome = loader.load_at(start + Duration::from_secs(1));

        assert_eq!(outcome.origin, LoadOrigin::Fetched);
        assert_eq!(loader.source().calls(), 2);
    }

    #[test]
    fn numeric_columns_are_coerced_on_load() {
        let loader = loader(vec![Ok(sheet(&[
            &["ชื่อประเทศ", "นำเข้า", "ส่งออก"],
            &["จีน", " 12.5 ", "ไม่มีข้อมูล"],
        ]))]);

        let outcome = loader.load();
        let record = &outcome.table.records()[0];

        assert_eq!(record.number_at(1), 12.5);
        assert_eq!(record.number_at(2), 0.0);
    }
}

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::model::SearchResult;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(error) => write!(f, "sqlite error: {error}"),
            Self::Poisoned => write!(f, "record store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Read surface the ranker needs during boosting. Split out so the merger can
/// be tested against an in-memory fake without a database.
pub trait RecordLookup {
    fn is_pinned(&self, result: &SearchResult) -> bool;
    fn selection_count(&self, result: &SearchResult) -> i64;
}

/// Pin ("top-most") records and historical selection counters, keyed by a
/// result's stable record key. Read during boosting; written only on explicit
/// user action, never inside the dispatch path.
pub struct RecordStore {
    db: Mutex<Connection>,
}

impl RecordStore {
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self::initialize(Connection::open(path)?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS pin (record_key TEXT PRIMARY KEY)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS selection (record_key TEXT PRIMARY KEY, count INTEGER NOT NULL)",
            [],
        )?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn set_pinned(&self, result: &SearchResult, pinned: bool) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        if pinned {
            db.execute(
                "INSERT INTO pin (record_key) VALUES (?1) ON CONFLICT(record_key) DO NOTHING",
                params![result.record_key()],
            )?;
        } else {
            db.execute(
                "DELETE FROM pin WHERE record_key = ?1",
                params![result.record_key()],
            )?;
        }
        Ok(())
    }

    pub fn record_selection(&self, result: &SearchResult) -> Result<(), StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        db.execute(
            "INSERT INTO selection (record_key, count) VALUES (?1, 1)
             ON CONFLICT(record_key) DO UPDATE SET count = count + 1",
            params![result.record_key()],
        )?;
        Ok(())
    }

    fn pinned(&self, result: &SearchResult) -> Result<bool, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = db.prepare("SELECT 1 FROM pin WHERE record_key = ?1")?;
        let found = stmt.exists(params![result.record_key()])?;
        Ok(found)
    }

    fn count(&self, result: &SearchResult) -> Result<i64, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = db.prepare("SELECT count FROM selection WHERE record_key = ?1")?;
        let mut rows = stmt.query(params![result.record_key()])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

impl RecordLookup for RecordStore {
    /// Lookup failures deliberately degrade to "not pinned" / "never
    /// selected": boosting must never abort a merge mid-generation.
    fn is_pinned(&self, result: &SearchResult) -> bool {
        self.pinned(result).unwrap_or(false)
    }

    fn selection_count(&self, result: &SearchResult) -> i64 {
        self.count(result).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordLookup, RecordStore};
    use crate::model::{noop_action, SearchResult};

    fn result(title: &str) -> SearchResult {
        SearchResult::new(title, "subtitle", 10, "files", "q", noop_action())
    }

    #[test]
    fn pin_round_trip() {
        let store = RecordStore::open_memory().expect("store should open");
        let item = result("Notes.txt");
        assert!(!store.is_pinned(&item));

        store.set_pinned(&item, true).expect("pin should persist");
        assert!(store.is_pinned(&item));

        store.set_pinned(&item, false).expect("unpin should persist");
        assert!(!store.is_pinned(&item));
    }

    #[test]
    fn pinning_twice_is_idempotent() {
        let store = RecordStore::open_memory().expect("store should open");
        let item = result("Notes.txt");
        store.set_pinned(&item, true).expect("pin should persist");
        store.set_pinned(&item, true).expect("re-pin should persist");
        assert!(store.is_pinned(&item));
    }

    #[test]
    fn selection_counter_increments_per_record_key() {
        let store = RecordStore::open_memory().expect("store should open");
        let first = result("Notes.txt");
        let second = result("Report.xlsx");

        store.record_selection(&first).expect("selection should persist");
        store.record_selection(&first).expect("selection should persist");
        store.record_selection(&second).expect("selection should persist");

        assert_eq!(store.selection_count(&first), 2);
        assert_eq!(store.selection_count(&second), 1);
        assert_eq!(store.selection_count(&result("Never Chosen")), 0);
    }
}

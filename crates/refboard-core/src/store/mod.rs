mod migrations;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{AppError, AppResult};

pub const USERS: &str = "users";
pub const SESSIONS: &str = "sessions";
pub const REFERRALS: &str = "referrals";
pub const TEAMS: &str = "teams";
pub const TRANSACTIONS: &str = "transactions";
pub const PAYMENTS: &str = "payments";
pub const VERIFICATION_TOKENS: &str = "verification_tokens";

pub(crate) const COLLECTIONS: [&str; 7] = [
    USERS,
    SESSIONS,
    REFERRALS,
    TEAMS,
    TRANSACTIONS,
    PAYMENTS,
    VERIFICATION_TOKENS,
];

pub type DbPool = Pool<SqliteConnectionManager>;

/// Whole-collection record store. Every collection is one JSON array under
/// a fixed key; `save` replaces the array, so concurrent writers through
/// separate handles race with last-writer-wins semantics.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    pub fn open(path: &str) -> AppResult<Store> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("create store directory: {e}")))?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA busy_timeout = 5000;",
                )
            });

        let pool = Pool::builder().max_size(10).build(manager)?;
        let conn = pool.get()?;
        migrations::run(&conn)?;

        Ok(Store { pool })
    }

    /// Transient store for tests and demos. Capped at one connection so
    /// every handle sees the same in-memory database.
    pub fn in_memory() -> AppResult<Store> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        let conn = pool.get()?;
        migrations::run(&conn)?;

        Ok(Store { pool })
    }

    /// Read a whole collection. A key that was never written reads as empty.
    pub fn load<T: DeserializeOwned>(&self, collection: &str) -> AppResult<Vec<T>> {
        let conn = self.pool.get()?;

        let blob = match conn.query_row(
            "SELECT value FROM collections WHERE key = ?1",
            rusqlite::params![collection],
            |row| row.get::<_, String>(0),
        ) {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&blob)?)
    }

    /// Overwrite a whole collection.
    pub fn save<T: Serialize>(&self, collection: &str, records: &[T]) -> AppResult<()> {
        let conn = self.pool.get()?;
        let raw = serde_json::to_string(records)?;

        conn.execute(
            "INSERT INTO collections (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![collection, raw],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        note: String,
    }

    fn record(id: &str, note: &str) -> Record {
        Record {
            id: id.to_string(),
            note: note.to_string(),
        }
    }

    #[test]
    fn unknown_collection_loads_empty() {
        let store = Store::in_memory().unwrap();
        let records: Vec<Record> = store.load("never_written").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn known_collections_are_seeded_empty() {
        let store = Store::in_memory().unwrap();
        for key in COLLECTIONS {
            let records: Vec<serde_json::Value> = store.load(key).unwrap();
            assert!(records.is_empty(), "{key} should start empty");
        }
    }

    #[test]
    fn save_then_load_roundtrips_in_order() {
        let store = Store::in_memory().unwrap();
        let records = vec![record("a", "first"), record("b", "second")];
        store.save("scratch", &records).unwrap();

        let loaded: Vec<Record> = store.load("scratch").unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn save_replaces_the_whole_collection() {
        let store = Store::in_memory().unwrap();
        store
            .save("scratch", &[record("a", "one"), record("b", "two")])
            .unwrap();
        store.save("scratch", &[record("c", "three")]).unwrap();

        let loaded: Vec<Record> = store.load("scratch").unwrap();
        assert_eq!(loaded, vec![record("c", "three")]);
    }
}

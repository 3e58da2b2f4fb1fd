//! SQLite-backed store for the conversation graph.
//!
//! The database lives at `~/.chatledger/chatledger.db` and holds the whole
//! persisted graph: users, contacts, conversations, messages, contact links,
//! calendar events, and tasks. Everything the aggregation layer reads is
//! derived from these rows at query time; nothing derived is stored.

use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};

pub mod types;
pub use types::*;

mod contacts;
mod conversations;
mod schedule;
mod users;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.chatledger/chatledger.db` and
    /// apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Open an in-memory database with the full schema. Test and tooling use.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Open the database in read-only mode, for concurrent readers that must
    /// never write (report tooling, inspection).
    pub fn open_readonly_at(path: &std::path::Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.chatledger/chatledger.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".chatledger").join("chatledger.db"))
    }

    /// Current time as the RFC 3339 string stored in every timestamp column.
    pub(crate) fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in [
            "users",
            "contacts",
            "conversations",
            "messages",
            "contact_links",
            "calendar_events",
            "tasks",
        ] {
            let count: i32 = db
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|e| panic!("{} table should exist: {}", table, e));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_open_at_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.db");
        let db = super::Store::open_at(path.clone()).expect("open_at");
        drop(db);
        assert!(path.exists());
    }

    #[test]
    fn test_with_transaction_rolls_back_on_err() {
        let db = test_db();
        let user_id = super::test_utils::seed_user(&db, "Ada");

        let result: Result<(), super::DbError> = db.with_transaction(|tx| {
            tx.create_contact(user_id, "Maria", None)?;
            Err(super::DbError::Migration("forced".into()))
        });
        assert!(result.is_err());

        let contacts = db.list_contacts(user_id).expect("list");
        assert!(contacts.is_empty(), "rollback should discard the insert");
    }
}

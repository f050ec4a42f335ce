//! Credential Store
//!
//! Durable user table keyed by a unique username. The uniqueness check and the
//! insert are one statement: the `UNIQUE` constraint on `users.username`
//! decides which of several concurrent registrations wins.
//!
//! Tables:
//! - `users`: id, username, password_digest, created_at
//! - `tasks`: placeholder for the protected resource, counted by the status query

use super::types::{User, UserId};
use crate::error::StorageError;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of an insert into the user table
#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    Duplicate,
}

/// Storage backend for user records
pub trait CredentialStore: Send + Sync {
    /// Insert a new user; reports `Duplicate` when the username is taken
    fn create(&self, username: &str, password_digest: &str) -> Result<CreateOutcome, StorageError>;

    /// Look up a user by exact (already trimmed) username
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Look up a user by id
    fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Number of registered users
    fn count(&self) -> Result<u64, StorageError>;

    /// Number of rows in the placeholder task table
    fn task_count(&self) -> Result<u64, StorageError>;
}

/// SQLite-backed credential store
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at `path`; `:memory:` opens a private
    /// in-memory database
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        info!("Opened credential store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_digest TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn into_user(raw: (i64, String, String, i64)) -> Result<User, StorageError> {
        let (id, username, password_digest, created_at) = raw;
        Ok(User {
            id: UserId(id),
            username,
            password_digest,
            created_at: from_millis(created_at)?,
        })
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn create(&self, username: &str, password_digest: &str) -> Result<CreateOutcome, StorageError> {
        // Millisecond precision so the returned record matches what a later read sees.
        let created_at = from_millis(Utc::now().timestamp_millis())?;

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (username, password_digest, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_digest, created_at.timestamp_millis()],
        );

        match result {
            Ok(_) => {
                let id = UserId(conn.last_insert_rowid());
                debug!(user_id = %id, "Inserted user row");
                Ok(CreateOutcome::Created(User {
                    id,
                    username: username.to_string(),
                    password_digest: password_digest.to_string(),
                    created_at,
                }))
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(CreateOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT id, username, password_digest, created_at FROM users WHERE username = ?1",
                params![username],
                Self::user_from_row,
            )
            .optional()?;
        raw.map(Self::into_user).transpose()
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT id, username, password_digest, created_at FROM users WHERE id = ?1",
                params![id.0],
                Self::user_from_row,
            )
            .optional()?;
        raw.map(Self::into_user).transpose()
    }

    fn count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn task_count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {}", millis)))
}

//! SQLite-backed store of every schedule entry seen so far.
//!
//! Rows are keyed by `(start_datetime, title, location)`; the table enforces
//! that key itself, so a duplicate insert fails even when nobody asked
//! [`Session::contains`] first. Writes happen inside a [`Session`], which
//! wraps one transaction: [`Session::commit`] persists everything staged,
//! anything else (explicit rollback, an early return, a panic unwinding
//! through the owner) discards it.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params};

use crate::model::ScheduleEntry;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schedule_entries (
    start_datetime  TEXT    NOT NULL,
    title           TEXT    NOT NULL,
    note            TEXT,
    location        TEXT    NOT NULL,
    duration        INTEGER,
    includes_break  INTEGER NOT NULL DEFAULT 0,
    buy_tickets_url TEXT,
    CONSTRAINT schedule_entry_pk PRIMARY KEY (start_datetime, title, location)
);
";

#[derive(thiserror::Error, Debug)]
/// Errors raised by the schedule store.
pub enum StoreError {
    /// The database rejected a statement.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A read or write was attempted on a committed or rolled back session.
    #[error("Store operation attempted outside of an open session")]
    SessionInactive,
    /// The identity key is already taken.
    #[error("Entry already stored: {0}")]
    Duplicate(String),
    /// Committing failed; nothing staged in the session was persisted.
    #[error("Commit failed, session rolled back: {0}")]
    Commit(#[source] rusqlite::Error),
}

/// Persistent, deduplicating collection of [`ScheduleEntry`] rows.
pub struct ScheduleStore {
    conn: Connection,
}

impl ScheduleStore {
    /// Open (or create) the store file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened or the schema created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Start a unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the transaction cannot be started.
    pub fn session(&mut self) -> Result<Session<'_>, StoreError> {
        tracing::debug!("opening store session");
        let tx = self.conn.transaction()?;
        Ok(Session {
            tx: Some(tx),
            staged: 0,
        })
    }

    /// Number of committed entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM schedule_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// All committed entries in chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails or a row cannot be decoded.
    pub fn entries(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT start_datetime, title, note, location, duration, includes_break, buy_tickets_url
             FROM schedule_entries
             ORDER BY start_datetime ASC, location ASC, title ASC",
        )?;

        let rows = stmt.query_map([], map_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// An open unit of work on a [`ScheduleStore`].
///
/// Dropping a session that was neither committed nor rolled back discards
/// its staged entries.
pub struct Session<'store> {
    tx: Option<Transaction<'store>>,
    staged: usize,
}

impl Session<'_> {
    fn active(&self) -> Result<&Transaction<'_>, StoreError> {
        self.tx.as_ref().ok_or(StoreError::SessionInactive)
    }

    /// Whether the session can still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    /// Number of entries staged since the session was opened.
    #[must_use]
    pub fn staged(&self) -> usize {
        self.staged
    }

    /// Check whether an entry with the same identity is stored or staged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionInactive`] after commit or rollback, or
    /// [`StoreError::Sqlite`] if the lookup fails.
    pub fn contains(&self, entry: &ScheduleEntry) -> Result<bool, StoreError> {
        let tx = self.active()?;

        let found = tx
            .query_row(
                "SELECT 1 FROM schedule_entries
                 WHERE start_datetime = ?1 AND title = ?2 AND location = ?3
                 LIMIT 1",
                params![
                    format_datetime(entry.start_datetime),
                    entry.title,
                    entry.location
                ],
                |_row| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Stage an entry for insertion; it becomes durable on [`Session::commit`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionInactive`] after commit or rollback,
    /// [`StoreError::Duplicate`] if the identity key is already taken, or
    /// [`StoreError::Sqlite`] for any other database failure.
    pub fn add(&mut self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        let tx = self.active()?;

        let inserted = tx.execute(
            "INSERT INTO schedule_entries
                (start_datetime, title, note, location, duration, includes_break, buy_tickets_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                format_datetime(entry.start_datetime),
                entry.title,
                entry.note,
                entry.location,
                entry.duration,
                entry.includes_break,
                entry.buy_tickets_url,
            ],
        );

        match inserted {
            Ok(_) => {
                self.staged += 1;
                Ok(())
            }
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(StoreError::Duplicate(entry.to_string()))
            }
            Err(err) => Err(StoreError::Sqlite(err)),
        }
    }

    /// Persist everything staged and close the session.
    ///
    /// Returns how many entries were committed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionInactive`] if already closed, or
    /// [`StoreError::Commit`] if the commit fails; in that case the whole
    /// session is rolled back.
    pub fn commit(&mut self) -> Result<usize, StoreError> {
        let tx = self.tx.take().ok_or(StoreError::SessionInactive)?;
        let staged = std::mem::take(&mut self.staged);

        tracing::debug!(staged, "committing store session");
        match tx.commit() {
            Ok(()) => {
                tracing::debug!(staged, "store session committed");
                Ok(staged)
            }
            Err(err) => {
                tracing::error!(staged, error = %err, "commit failed, store session rolled back");
                Err(StoreError::Commit(err))
            }
        }
    }

    /// Discard everything staged and close the session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionInactive`] if already closed, or
    /// [`StoreError::Sqlite`] if the rollback statement fails.
    pub fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::SessionInactive)?;
        let staged = std::mem::take(&mut self.staged);

        tracing::debug!(staged, "rolling back store session");
        tx.rollback()?;
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::debug!(staged = self.staged, "store session dropped without commit, rolling back");
            if let Err(err) = tx.rollback() {
                tracing::warn!(error = %err, "rollback of abandoned store session failed");
            }
        }
    }
}

fn format_datetime(datetime: NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ScheduleEntry> {
    let start_str: String = row.get("start_datetime")?;
    let start_datetime = NaiveDateTime::parse_from_str(&start_str, DATETIME_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;

    Ok(ScheduleEntry {
        start_datetime,
        title: row.get("title")?,
        note: row.get("note")?,
        location: row.get("location")?,
        duration: row.get("duration")?,
        includes_break: row.get("includes_break")?,
        buy_tickets_url: row.get("buy_tickets_url")?,
    })
}

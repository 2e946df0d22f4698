//! SQLite-backed store.
//!
//! # Responsibility
//! - Own one migrated connection and the store's change notifier.
//! - Provide row conversion helpers shared by the SQLite repositories.
//!
//! # Invariants
//! - Timestamps are stored as epoch milliseconds, dates as `YYYY-MM-DD`.
//! - Change events are published only after the write committed.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::events::{ChangeEvent, ChangeNotifier};
use crate::repo::{RepoError, RepoResult, Store};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

const REQUIRED_TABLES: [&str; 6] = [
    "spaces",
    "leads",
    "clients",
    "nps_records",
    "objectives",
    "progress_logs",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    pub(crate) conn: Connection,
    notifier: ChangeNotifier,
}

impl SqliteStore {
    /// Wraps a migrated connection.
    ///
    /// Fails with `MissingRequiredTable` when the schema is not in place.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(&conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self {
            conn,
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        self.notifier.publish(event);
    }
}

impl Store for SqliteStore {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

pub(crate) fn to_epoch_ms(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn from_epoch_ms(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}"))
    })
}

pub(crate) fn date_to_db(value: Option<NaiveDate>) -> Option<String> {
    value.map(|date| date.format(DATE_FORMAT).to_string())
}

pub(crate) fn parse_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    match value {
        Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| RepoError::InvalidData(format!("invalid date `{text}` in {column}"))),
        None => Ok(None),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_enum<T>(
    value: &str,
    column: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> RepoResult<T> {
    parse(value).ok_or_else(|| RepoError::InvalidData(format!("invalid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteStore::try_new(conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable("spaces")));
    }

    #[test]
    fn date_helpers_round_trip_and_reject_garbage() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31);
        let text = date_to_db(date);
        assert_eq!(text.as_deref(), Some("2025-03-31"));
        assert_eq!(parse_date(text, "objectives.end_date").unwrap(), date);
        assert!(parse_date(Some("31/03/2025".to_string()), "objectives.end_date").is_err());
    }
}

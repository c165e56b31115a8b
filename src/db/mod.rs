//! SQLite-backed stores. Each submodule owns one table family; writes run in
//! a single transaction and take the caller's identity explicitly.

pub mod messages;
pub mod rooms;
pub mod topics;
pub mod users;

use std::str::FromStr;

use sqlx::{
    FromRow, Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::error::{ForumError, ForumResult};

pub use users::User;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub host_id: Uuid,
    pub topic_id: Uuid,
    pub name: String,
    pub description: String,
    pub updated: OffsetDateTime,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created: OffsetDateTime,
}

pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool = SqlitePoolOptions::new().max_connections(max_connections);
    // in-memory databases vanish with their last connection
    if url.contains(":memory:") {
        pool = pool.min_connections(1).idle_timeout(None).max_lifetime(None);
        pool.connect_with(options).await
    } else {
        pool.connect_with(options.journal_mode(SqliteJournalMode::Wal)).await
    }
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(db_pool).await
}

/// Parses an id taken from a URL. A malformed id names nothing, so it is
/// reported like an unknown one.
pub fn parse_id(raw: &str, what: &'static str) -> ForumResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ForumError::NotFound(what))
}

/// Opens a transaction that holds the write lock from its first statement.
/// A deferred transaction that reads before writing cannot wait for the lock
/// and fails with `SQLITE_BUSY` as soon as another writer is active.
pub(crate) async fn begin_write(db_pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    db_pool.begin_with("BEGIN IMMEDIATE").await
}

/// Fixed-width UTC text for a timestamp column, so that text order is time order.
pub fn stamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.nanosecond()
    )
}

/// `LIKE` pattern matching `query` anywhere, with `\` as the escape character.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{like_pattern, parse_id, stamp};
    use crate::error::ForumError;

    #[test]
    fn malformed_ids_are_not_found() {
        assert!(matches!(parse_id("abc", "room"), Err(ForumError::NotFound("room"))));
        let id = uuid::Uuid::now_v7();
        assert_eq!(parse_id(&id.to_string(), "room").unwrap(), id);
    }

    #[test]
    fn stamps_sort_in_time_order() {
        let whole = stamp(datetime!(2025-01-01 10:00:00 UTC));
        let tenth = stamp(datetime!(2025-01-01 10:00:00.1 UTC));
        let later = stamp(datetime!(2025-01-01 10:00:00.12 UTC));
        assert_eq!(tenth, "2025-01-01T10:00:00.100000000Z");
        assert!(whole < tenth && tenth < later);

        let shifted = stamp(datetime!(2025-01-01 12:00:00.5 +02:00));
        assert_eq!(shifted, "2025-01-01T10:00:00.500000000Z");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("math"), "%math%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }
}

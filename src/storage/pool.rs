//! Read-only `SQLite` connection pool built on `r2d2`.

use crate::error::{Result, TrendsError};
use crate::storage::schema::configure_reader;
use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

pub type ReadPool = Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Applies reader pragmas to every connection the pool opens.
#[derive(Debug, Clone, Copy)]
struct ReaderCustomizer {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<Connection, rusqlite::Error> for ReaderCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        configure_reader(conn, self.busy_timeout_ms)
    }
}

/// Settings for a [`ReadPool`].
#[derive(Debug, Clone)]
pub struct ReaderSource {
    /// Path or `file:` URI.
    pub target: String,
    pub flags: OpenFlags,
    pub busy_timeout_ms: u64,
}

impl ReaderSource {
    /// Build a pool of at most `max_size` readers over this source.
    ///
    /// One connection is opened up front so a bad target fails here rather
    /// than on the first query.
    ///
    /// # Errors
    ///
    /// Returns `Pool` if the first connection cannot be opened.
    pub fn build_pool(&self, max_size: usize, checkout_timeout: Duration) -> Result<ReadPool> {
        let manager =
            SqliteConnectionManager::file(Path::new(&self.target)).with_flags(self.flags);
        let max_size = u32::try_from(max_size.max(1)).unwrap_or(u32::MAX);
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(1))
            .connection_timeout(checkout_timeout)
            .connection_customizer(Box::new(ReaderCustomizer {
                busy_timeout_ms: self.busy_timeout_ms,
            }))
            .build(manager)?;
        debug!(source = %self.target, max = max_size, "Built read pool");
        Ok(pool)
    }
}

impl From<r2d2::Error> for TrendsError {
    fn from(err: r2d2::Error) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;
    use std::thread;
    use tempfile::TempDir;

    fn pool_for(dir: &TempDir, size: usize, timeout: Duration) -> ReadPool {
        let path = dir.path().join("pool.db");
        let writer = Connection::open(&path).unwrap();
        apply_schema(&writer).unwrap();
        ReaderSource {
            target: path.display().to_string(),
            flags: OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            busy_timeout_ms: 1_000,
        }
        .build_pool(size, timeout)
        .unwrap()
    }

    #[test]
    fn test_connections_are_reused() {
        let dir = TempDir::new().unwrap();
        let pool = pool_for(&dir, 2, Duration::from_secs(1));
        {
            let conn = pool.get().unwrap();
            let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
            assert_eq!(one, 1);
        }
        let _again = pool.get().unwrap();
        assert_eq!(pool.max_size(), 2);
        assert!(pool.state().connections <= 2);
    }

    #[test]
    fn test_readers_are_query_only() {
        let dir = TempDir::new().unwrap();
        let pool = pool_for(&dir, 1, Duration::from_secs(1));
        let conn = pool.get().unwrap();
        let query_only: i64 = conn
            .query_row("PRAGMA query_only", [], |row| row.get(0))
            .unwrap();
        assert_eq!(query_only, 1);
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let dir = TempDir::new().unwrap();
        let pool = pool_for(&dir, 1, Duration::from_millis(50));
        let _held = pool.get().unwrap();
        let err: TrendsError = pool.get().unwrap_err().into();
        assert!(matches!(err, TrendsError::Pool(_)));
    }

    #[test]
    fn test_waiter_gets_returned_connection() {
        let dir = TempDir::new().unwrap();
        let pool = pool_for(&dir, 1, Duration::from_secs(5));
        let held = pool.get().unwrap();
        thread::scope(|s| {
            let waiter = s.spawn(|| pool.get().map(|_| ()));
            thread::sleep(Duration::from_millis(20));
            drop(held);
            waiter.join().unwrap().unwrap();
        });
        assert_eq!(pool.state().connections, 1);
    }

    #[test]
    fn test_missing_database_fails_to_build() {
        let dir = TempDir::new().unwrap();
        let err = ReaderSource {
            target: dir.path().join("missing.db").display().to_string(),
            flags: OpenFlags::SQLITE_OPEN_READ_ONLY,
            busy_timeout_ms: 10,
        }
        .build_pool(1, Duration::from_millis(50))
        .unwrap_err();
        assert!(matches!(err, TrendsError::Pool(_)));
    }
}

//! Opening SQLite stores.
use std::path::Path;
#[cfg(feature = "log")]
use std::sync::Once;

use rusqlite::OpenFlags;

use crate::{debug, Result};

/// Connection string for a private in-memory store.
pub const MEMORY: &str = ":memory:";

#[cfg(feature = "log")]
fn log_callback(error_code: std::ffi::c_int, message: &str) {
    match error_code {
        rusqlite::ffi::SQLITE_NOTICE => log::trace!("{}", message),
        rusqlite::ffi::SQLITE_OK
        | rusqlite::ffi::SQLITE_DONE
        | rusqlite::ffi::SQLITE_NOTICE_RECOVER_WAL
        | rusqlite::ffi::SQLITE_NOTICE_RECOVER_ROLLBACK => log::info!("{}", message),
        rusqlite::ffi::SQLITE_WARNING | rusqlite::ffi::SQLITE_WARNING_AUTOINDEX => {
            log::warn!("{}", message)
        }
        _ => log::error!("{error_code} {}", message),
    }
}

fn init_logging() {
    #[cfg(feature = "log")]
    static INIT_SQLITE_LOGGING: Once = Once::new();

    #[cfg(feature = "log")]
    INIT_SQLITE_LOGGING.call_once(|| {
        // Must run before any connection is opened; `Once` guarantees that for this process.
        _ = unsafe { rusqlite::trace::config_log(Some(log_callback)) };
    });
}

/// Open the SQLite store at `conn_str`. `:memory:` opens a private
/// in-memory store; anything else is a file path, created if missing.
pub fn open(conn_str: &str) -> Result<rusqlite::Connection> {
    init_logging();
    let conn = if conn_str == MEMORY {
        debug!("opening in-memory store");
        rusqlite::Connection::open_in_memory()?
    } else {
        debug!("opening store {}", conn_str);
        rusqlite::Connection::open(Path::new(conn_str))?
    };
    Ok(conn)
}

/// Open an existing store file without write access. Fails if the file is
/// missing instead of creating it. `:memory:` behaves as in [`open`].
pub fn open_read_only(conn_str: &str) -> Result<rusqlite::Connection> {
    if conn_str == MEMORY {
        return open(conn_str);
    }
    init_logging();
    debug!("opening store {} read-only", conn_str);
    Ok(rusqlite::Connection::open_with_flags(
        Path::new(conn_str),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory() {
        let conn = open(MEMORY).unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meals.db");
        let conn = open(path.to_str().unwrap()).unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT)").unwrap();
        drop(conn);
        assert!(path.exists());
    }

    #[test]
    fn read_only_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(open_read_only(path.to_str().unwrap()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meals.db");
        let conn_str = path.to_str().unwrap();
        open(conn_str)
            .unwrap()
            .execute_batch("CREATE TABLE t (v TEXT)")
            .unwrap();
        let conn = open_read_only(conn_str).unwrap();
        assert!(conn.execute_batch("INSERT INTO t VALUES ('x')").is_err());
    }
}

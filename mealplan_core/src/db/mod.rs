//! Types, traits, and methods for interacting with the store.
//!
//! * `ConnectionMethods` is a trait containing the methods available on a connection or a transaction.
//!   Every operation in [users][crate::users] and [meals][crate::meals] takes an implementation of it.
//! * `Connection` is an open SQLite store. It can also begin a `Transaction`.
//! * `Transaction` implements `ConnectionMethods` and must be committed or it is rolled back on drop.
//! * `ConnectionSpec` says where the store lives and can be saved to disk for later runs.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{debug, migrations, Result};

pub mod sqlite;

pub use sqlite::MEMORY;

/// File name used when a [`ConnectionSpec`] is saved into a directory.
pub const CONNECTION_FILE_NAME: &str = "connection.json";

/// Methods available on a connection or a transaction.
///
/// Only [`ConnectionMethods::sqlite`] must be provided; everything else is
/// built on the underlying [`rusqlite::Connection`].
pub trait ConnectionMethods {
    /// The underlying SQLite handle.
    fn sqlite(&self) -> &rusqlite::Connection;

    /// Execute one or more statements that take no parameters.
    fn execute(&self, sql: &str) -> Result<()> {
        debug!("execute sql {}", sql);
        self.sqlite().execute_batch(sql)?;
        Ok(())
    }

    /// Whether a table with this name exists.
    fn has_table(&self, table: &str) -> Result<bool> {
        let mut stmt = self
            .sqlite()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?;")?;
        let mut rows = stmt.query([table])?;
        Ok(rows.next()?.is_some())
    }

    /// Column names of `table`, in declaration order. Empty if the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .sqlite()
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(columns)
    }

    /// The `user_version` stamp of the store.
    fn user_version(&self) -> Result<i64> {
        Ok(self
            .sqlite()
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Set the `user_version` stamp of the store.
    fn set_user_version(&self, version: i64) -> Result<()> {
        self.sqlite()
            .pragma_update(None, "user_version", version)?;
        Ok(())
    }

    /// Run `f` inside a savepoint named `name`. The savepoint is released if
    /// `f` succeeds and rolled back otherwise. Savepoints nest, so this is
    /// usable both on a plain connection and inside a [`Transaction`].
    fn with_savepoint<T>(&self, name: &str, f: impl FnOnce(&Self) -> Result<T>) -> Result<T>
    where
        Self: Sized,
    {
        self.execute(&format!("SAVEPOINT {name}"))?;
        match f(self) {
            Ok(value) => {
                self.execute(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) =
                    self.execute(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                {
                    crate::error!("rollback of savepoint {} failed: {}", name, rollback_err);
                }
                Err(e)
            }
        }
    }
}

impl ConnectionMethods for rusqlite::Connection {
    fn sqlite(&self) -> &rusqlite::Connection {
        self
    }
}

/// An open store.
#[derive(Debug)]
pub struct Connection {
    conn: rusqlite::Connection,
}
impl Connection {
    /// Open the store at `conn_str` without touching its schema.
    /// Most callers want [`connect`] instead.
    pub fn open(conn_str: &str) -> Result<Self> {
        sqlite::open(conn_str).map(|conn| Connection { conn })
    }

    /// Open an existing store for inspection only. A missing file is an
    /// error rather than being created.
    pub fn open_read_only(conn_str: &str) -> Result<Self> {
        sqlite::open_read_only(conn_str).map(|conn| Connection { conn })
    }

    /// Begin a transaction. The transaction must be used in place of this
    /// connection until it is committed or rolled back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        let trans = self.conn.transaction()?;
        Ok(Transaction { trans })
    }

    /// Consume the connection, returning the underlying SQLite handle.
    pub fn into_inner(self) -> rusqlite::Connection {
        self.conn
    }
}
impl ConnectionMethods for Connection {
    fn sqlite(&self) -> &rusqlite::Connection {
        &self.conn
    }
}
impl From<rusqlite::Connection> for Connection {
    fn from(conn: rusqlite::Connection) -> Self {
        Connection { conn }
    }
}

/// Database transaction.
///
/// Begin a transaction using [`Connection::transaction`]. Dropping it
/// without calling [`Transaction::commit`] rolls it back.
#[derive(Debug)]
pub struct Transaction<'c> {
    trans: rusqlite::Transaction<'c>,
}
impl Transaction<'_> {
    /// Commit the transaction.
    pub fn commit(self) -> Result<()> {
        Ok(self.trans.commit()?)
    }
    /// Roll back the transaction. Equivalent to dropping it.
    pub fn rollback(self) -> Result<()> {
        Ok(self.trans.rollback()?)
    }
}
impl ConnectionMethods for Transaction<'_> {
    fn sqlite(&self) -> &rusqlite::Connection {
        &self.trans
    }
}

/// Connection specification: where the store lives. See [`connect`] to make
/// a [`Connection`] from a `ConnectionSpec`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectionSpec {
    conn_str: String,
}
impl ConnectionSpec {
    /// A spec for the store at `conn_str`, a file path or [`MEMORY`].
    pub fn new(conn_str: impl Into<String>) -> Self {
        ConnectionSpec {
            conn_str: conn_str.into(),
        }
    }
    /// A spec for a private in-memory store.
    pub fn memory() -> Self {
        Self::new(MEMORY)
    }
    /// Save the connection spec to the filesystem for later use.
    /// If `path` is a directory the spec is written to `connection.json` inside it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let path = conn_complete_if_dir(path);
        let mut f = fs::File::create(path)?;
        f.write_all(serde_json::to_string(self)?.as_bytes())
            .map_err(|e| e.into())
    }
    /// Load a previously saved connection spec.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = conn_complete_if_dir(path.as_ref());
        serde_json::from_reader(fs::File::open(path)?).map_err(|e| e.into())
    }
    /// The connection string.
    pub fn connection_string(&self) -> &str {
        &self.conn_str
    }
    /// Whether this spec refers to an in-memory store.
    pub fn is_memory(&self) -> bool {
        self.conn_str == MEMORY
    }
}

fn conn_complete_if_dir(path: &Path) -> Cow<'_, Path> {
    if path.is_dir() {
        Cow::from(path.join(CONNECTION_FILE_NAME))
    } else {
        Cow::from(path)
    }
}

/// Open the store described by `spec` and bring its schema up to date.
pub fn connect(spec: &ConnectionSpec) -> Result<Connection> {
    let conn = Connection::open(spec.connection_string())?;
    migrations::ensure_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn spec_saves_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ConnectionSpec::new("meals.db");
        spec.save(dir.path()).unwrap();
        assert!(dir.path().join(CONNECTION_FILE_NAME).exists());
        assert_eq!(ConnectionSpec::load(dir.path()).unwrap(), spec);
    }

    #[test]
    fn spec_saves_to_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let spec = ConnectionSpec::memory();
        spec.save(&path).unwrap();
        let loaded = ConnectionSpec::load(&path).unwrap();
        assert!(loaded.is_memory());
    }

    #[test]
    fn missing_spec_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConnectionSpec::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IO(_)));
    }

    #[test]
    fn savepoint_rolls_back_on_error() {
        let conn = Connection::open(MEMORY).unwrap();
        conn.execute("CREATE TABLE t (v TEXT)").unwrap();
        let result: Result<()> = conn.with_savepoint("sp_test", |c| {
            c.execute("INSERT INTO t VALUES ('x')")?;
            Err(Error::Validation("nope".to_string()))
        });
        assert!(result.is_err());
        let count: i64 = conn
            .sqlite()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_drop_rolls_back() {
        let mut conn = Connection::open(MEMORY).unwrap();
        conn.execute("CREATE TABLE t (v TEXT)").unwrap();
        {
            let tr = conn.transaction().unwrap();
            tr.execute("INSERT INTO t VALUES ('x')").unwrap();
        }
        {
            let tr = conn.transaction().unwrap();
            tr.execute("INSERT INTO t VALUES ('y')").unwrap();
            tr.commit().unwrap();
        }
        let values: Vec<String> = conn
            .sqlite()
            .prepare("SELECT v FROM t")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(values, vec!["y".to_string()]);
    }

    #[test]
    fn wraps_and_unwraps_sqlite_handle() {
        let raw = rusqlite::Connection::open_in_memory().unwrap();
        raw.execute_batch("CREATE TABLE t (v TEXT)").unwrap();
        let conn = Connection::from(raw);
        assert!(conn.has_table("t").unwrap());
        conn.set_user_version(7).unwrap();
        let raw = conn.into_inner();
        assert_eq!(raw.user_version().unwrap(), 7);
    }

    #[test]
    fn table_columns_of_missing_table_is_empty() {
        let conn = Connection::open(MEMORY).unwrap();
        assert!(conn.table_columns("nothing").unwrap().is_empty());
        assert!(!conn.has_table("nothing").unwrap());
    }
}

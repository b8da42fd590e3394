//! Bringing a store into the current schema.
//!
//! Two layouts of the `meals` table exist in the wild:
//! * the legacy single-user layout, keyed by `meal_date` alone, and
//! * the current multi-user layout, keyed by `(user_name, meal_date)`.
//!
//! [`ensure_schema`] detects which one a store has and upgrades it in place.
//! The legacy layout is recognised by the absence of the `user_name` column,
//! never by the `user_version` stamp, since stores written by older tools
//! were never stamped.
use std::fmt;

use crate::db::ConnectionMethods;
use crate::users::{self, DEFAULT_USER_NAME};
use crate::util::timestamp_now;
use crate::{debug, info, Error, Result};

mod legacy;
pub use legacy::{LegacyMealRow, MultiUserRow, LEGACY_COLUMNS};

/// Name of the user registry table.
pub const USERS_TABLE: &str = "users";
/// Name of the meal record table.
pub const MEALS_TABLE: &str = "meals";
/// Column whose presence marks the multi-user layout.
pub const USER_COLUMN: &str = "user_name";
/// `user_version` stamped on a store once it is in the multi-user layout.
pub const CURRENT_USER_VERSION: i64 = 2;

const MEALS_STAGING_TABLE: &str = "meals_new";

const CREATE_USERS_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    user_name TEXT PRIMARY KEY,
    created_at TEXT
);";

fn create_meals_sql(table: &str, if_not_exists: bool) -> String {
    let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
    format!(
        "CREATE TABLE {guard}{table} (
    user_name TEXT NOT NULL,
    meal_date TEXT NOT NULL,
    breakfast TEXT,
    lunch TEXT,
    dinner TEXT,
    snack TEXT,
    memo TEXT,
    updated_at TEXT,
    PRIMARY KEY (user_name, meal_date)
);"
    )
}

/// Layout of the `meals` table as found in a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaVersion {
    /// No `meals` table yet.
    Empty,
    /// Single-user layout. Carries the columns the table actually has.
    Legacy {
        /// Column names of the legacy table, in declaration order.
        columns: Vec<String>,
    },
    /// Multi-user layout keyed by `(user_name, meal_date)`.
    MultiUser,
}

impl SchemaVersion {
    /// Whether [`ensure_schema`] would have to rewrite the `meals` table.
    pub fn needs_migration(&self) -> bool {
        matches!(self, SchemaVersion::Legacy { .. })
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaVersion::Empty => f.write_str("empty"),
            SchemaVersion::Legacy { columns } => {
                write!(f, "legacy single-user ({})", columns.join(", "))
            }
            SchemaVersion::MultiUser => f.write_str("multi-user"),
        }
    }
}

/// Inspect the store and report which layout its `meals` table has.
pub fn detect_schema_version(conn: &impl ConnectionMethods) -> Result<SchemaVersion> {
    if !conn.has_table(MEALS_TABLE)? {
        return Ok(SchemaVersion::Empty);
    }
    let columns = conn.table_columns(MEALS_TABLE)?;
    if columns.iter().any(|c| c == USER_COLUMN) {
        Ok(SchemaVersion::MultiUser)
    } else {
        Ok(SchemaVersion::Legacy { columns })
    }
}

/// Leave the store in the current multi-user shape, whatever shape it
/// started in. Returns the layout that was found before any change.
///
/// Safe to call on every start: on a store that is already current this only
/// re-checks that the default user exists. Everything runs inside a single
/// savepoint, so a failure part way leaves the store as it was.
pub fn ensure_schema(conn: &impl ConnectionMethods) -> Result<SchemaVersion> {
    conn.with_savepoint("ensure_schema", |conn| {
        conn.execute(CREATE_USERS_SQL)?;
        if users::insert_user_if_absent(conn, DEFAULT_USER_NAME, &timestamp_now())? {
            info!("registered default user {}", DEFAULT_USER_NAME);
        }

        let version = detect_schema_version(conn)?;
        match &version {
            SchemaVersion::Empty => {
                info!("creating {} table", MEALS_TABLE);
                conn.execute(&create_meals_sql(MEALS_TABLE, false))?;
            }
            SchemaVersion::Legacy { columns } => legacy::migrate(conn, columns)?,
            SchemaVersion::MultiUser => {
                debug!("schema is current");
            }
        }
        if version != SchemaVersion::MultiUser {
            let after = detect_schema_version(conn)?;
            if after != SchemaVersion::MultiUser {
                return Err(Error::Migration(format!(
                    "{MEALS_TABLE} table is {after} after upgrading from {version}"
                )));
            }
        }

        if conn.user_version()? != CURRENT_USER_VERSION {
            conn.set_user_version(CURRENT_USER_VERSION)?;
        }
        Ok(version)
    })
}

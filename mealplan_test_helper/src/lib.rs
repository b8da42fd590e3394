//! Test helpers to set up meal planner stores.
//! Macros depend on [`mealplan_core`], `env_logger` and [`log`].
//!
//! Every test that goes through [`StoreTestInstance`] runs once against a
//! private in-memory store and once against a store file in a temporary
//! directory, since the two behave differently around savepoints and
//! `ALTER TABLE`.
#![deny(missing_docs)]

use std::path::PathBuf;

use mealplan_core::db::MEMORY;
use mealplan_core::migrations::{LegacyMealRow, MEALS_TABLE};
use mealplan_core::{ensure_schema, ConnectionMethods, ConnectionSpec, DayMeals};
use tempfile::TempDir;

// Re-export as they are used by the macros.
pub use mealplan_core::Connection;

/// DDL of a legacy single-user `meals` table with every known column.
pub const LEGACY_MEALS_DDL: &str = "CREATE TABLE meals (
    meal_date TEXT PRIMARY KEY,
    breakfast TEXT,
    lunch TEXT,
    dinner TEXT,
    snack TEXT,
    memo TEXT,
    updated_at TEXT
);";

/// Trait for running a test.
pub trait StoreTestInstance {
    /// Run a test against a fresh store. With `migrate` the store is brought
    /// to the current schema first; without it the store is empty.
    fn run_test(test: impl FnOnce(Connection), migrate: bool);
}

/// Instance of an in-memory store test.
#[derive(Default)]
pub struct MemoryTestInstance {}

impl StoreTestInstance for MemoryTestInstance {
    fn run_test(test: impl FnOnce(Connection), migrate: bool) {
        common_setup();
        log::info!("connecting to sqlite memory database..");
        let conn = memory_connection();
        if migrate {
            setup_store(&conn);
        }
        log::info!("running memory store test");
        test(conn);
    }
}

/// Instance of a store file test.
#[derive(Default)]
pub struct FileTestInstance {}

impl StoreTestInstance for FileTestInstance {
    fn run_test(test: impl FnOnce(Connection), migrate: bool) {
        common_setup();
        let setup_data = file_setup();
        let connstr = setup_data.connection_string();
        log::info!("connecting to {}..", connstr);
        let conn = Connection::open(connstr).expect("Could not open store file");
        if migrate {
            setup_store(&conn);
        }
        log::info!("running test on {}...", connstr);
        test(conn);
        file_teardown(setup_data);
    }
}

/// Result of a store setup function. Provides a connection string and keeps
/// whatever backs the store alive until it is dropped.
pub trait SetupData {
    /// Return the connection string to use when opening the store.
    fn connection_string(&self) -> &str;
}

/// A store file inside its own temporary directory.
#[derive(Debug)]
pub struct FileSetupData {
    dir: TempDir,
    connection_string: String,
}

impl FileSetupData {
    /// The temporary directory holding the store.
    pub fn dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

impl SetupData for FileSetupData {
    fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

/// Create an empty temporary directory and pick a store file inside it.
/// The file itself is created when the store is first opened.
pub fn file_setup() -> FileSetupData {
    let dir = tempfile::tempdir().expect("Could not create temporary directory");
    let path = dir.path().join("meals.db");
    let connection_string = path
        .to_str()
        .expect("Temporary path is not valid UTF-8")
        .to_string();
    log::debug!("new store file is `{}`", connection_string);
    FileSetupData {
        dir,
        connection_string,
    }
}

/// Remove the store file and its directory.
pub fn file_teardown(data: FileSetupData) {
    if let Err(e) = data.dir.close() {
        log::warn!("could not remove temporary store: {}", e);
    }
}

/// Create an in-memory [`ConnectionSpec`].
pub fn memory_connspec() -> ConnectionSpec {
    ConnectionSpec::new(MEMORY)
}

/// Create an empty in-memory [`Connection`] with no schema.
pub fn memory_connection() -> Connection {
    Connection::open(MEMORY).expect("Could not open memory store")
}

/// Bring the store to the current schema.
pub fn setup_store(conn: &Connection) {
    let found = ensure_schema(conn).expect("Could not set up schema");
    log::debug!("schema set up from {}", found);
}

/// A legacy row with the given values and an empty `updated_at`.
pub fn legacy_row(
    meal_date: &str,
    breakfast: &str,
    lunch: &str,
    dinner: &str,
    snack: &str,
    memo: &str,
) -> LegacyMealRow {
    LegacyMealRow {
        meal_date: meal_date.to_string(),
        meals: DayMeals {
            breakfast: breakfast.to_string(),
            lunch: lunch.to_string(),
            dinner: dinner.to_string(),
            snack: snack.to_string(),
            memo: memo.to_string(),
        },
        updated_at: String::new(),
    }
}

/// Turn an empty store into one written by the single-user version, holding
/// `rows`.
pub fn create_legacy_store(conn: &Connection, rows: &[LegacyMealRow]) {
    conn.execute(LEGACY_MEALS_DDL)
        .expect("Could not create legacy table");
    for row in rows {
        conn.sqlite()
            .execute(
                &format!(
                    "INSERT INTO {MEALS_TABLE}
                     (meal_date, breakfast, lunch, dinner, snack, memo, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                rusqlite::params![
                    row.meal_date,
                    row.meals.breakfast,
                    row.meals.lunch,
                    row.meals.dinner,
                    row.meals.snack,
                    row.meals.memo,
                    row.updated_at,
                ],
            )
            .expect("Could not insert legacy row");
    }
}

/// Install the test logger. Safe to call from every test.
pub fn common_setup() {
    env_logger::try_init().ok();
}

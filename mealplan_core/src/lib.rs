//! Storage, schema migration and calendar aggregation for the meal planner.
//!
//! The crate is organised leaf to root:
//! * [`db`] opens the SQLite store and persists the [`db::ConnectionSpec`].
//! * [`migrations`] brings any store into the current multi-user shape.
//! * [`users`] and [`meals`] are the two independent stores, keyed by user name.
//! * [`calendar`] and [`export`] are pure functions over loaded records.
//!
//! Nothing in here keeps state between calls. The selected user and date are
//! always passed in explicitly.
#![deny(missing_docs)]

use thiserror::Error as ThisError;

pub mod calendar;
pub mod db;
pub mod export;
pub mod meals;
pub mod migrations;
pub mod users;

mod util;

pub use calendar::{CalendarCell, WeekRow};
pub use db::{connect, Connection, ConnectionMethods, ConnectionSpec};
pub use meals::{DayMeals, MealRecord};
pub use migrations::{ensure_schema, SchemaVersion};
pub use users::{RecordPolicy, User, DEFAULT_USER_NAME};

/// Result type that uses [`crate::Error`].
pub type Result<T> = std::result::Result<T, crate::Error>;

/// Meal planner errors.
///
/// The first group are outcomes the caller is expected to show to the user
/// as a short message (see [`Error::is_user_error`]). The rest are storage
/// failures and should be treated as fatal.
#[allow(missing_docs)]
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Protected(String),
    #[error("Invalid date {0}")]
    InvalidDate(String),
    #[error("Migration error {0}")]
    Migration(String),
    #[error("(De)serialization error {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("IO error {0}")]
    IO(#[from] std::io::Error),
    #[error("Sqlite error {0}")]
    SQLite(#[from] rusqlite::Error),
    #[error("Chrono error {0}")]
    Chrono(#[from] chrono::ParseError),
}

impl Error {
    /// Whether this is a validation, uniqueness, protection or bad date
    /// outcome, as opposed to a failure of the underlying store.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::AlreadyExists(_)
                | Error::Protected(_)
                | Error::InvalidDate(_)
        )
    }
}


#[cfg(feature = "log")]
pub use log::debug;
#[cfg(feature = "log")]
pub use log::error;
#[cfg(feature = "log")]
pub use log::info;
#[cfg(feature = "log")]
pub use log::warn;

#[cfg(not(feature = "log"))]
mod mplog {
    // this module is just for grouping -- macro_export puts them in the crate root

    /// Noop for when feature log is not enabled.
    #[macro_export]
    macro_rules! debug {
        (target: $target:expr, $($arg:tt)+) => {};
        ($($arg:tt)+) => {};
    }

    /// Noop for when feature log is not enabled.
    #[macro_export]
    macro_rules! info {
        (target: $target:expr, $($arg:tt)+) => {};
        ($($arg:tt)+) => {};
    }

    /// Noop for when feature log is not enabled.
    #[macro_export]
    macro_rules! warn {
        (target: $target:expr, $($arg:tt)+) => {};
        ($($arg:tt)+) => {};
    }

    /// Noop for when feature log is not enabled.
    #[macro_export]
    macro_rules! error {
        (target: $target:expr, $($arg:tt)+) => {};
        ($($arg:tt)+) => {};
    }
}

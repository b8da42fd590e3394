//! The user registry.
//!
//! Users are identified by name alone. One user, [`DEFAULT_USER_NAME`], is
//! created by [`ensure_schema`][crate::ensure_schema] and can never be deleted.
//!
//! Deleting a user with [`RecordPolicy::Keep`] leaves that user's meal
//! records in the store. They are not shown for any other user, but
//! registering the same name again makes the old history visible again.
//! This is intended: records are only removed when explicitly asked for.
use rusqlite::OptionalExtension;

use crate::db::ConnectionMethods;
use crate::meals;
use crate::util::timestamp_now;
use crate::{info, Error, Result};

/// Name of the user that always exists.
pub const DEFAULT_USER_NAME: &str = "나";

/// Longest accepted user name, in characters.
pub const MAX_NAME_CHARS: usize = 20;

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Unique name.
    pub name: String,
    /// When the user was registered. Empty for rows written without one.
    pub created_at: String,
}

impl User {
    /// Whether this is the protected default user.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_USER_NAME
    }
}

/// What to do with a user's meal records when the user is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Leave the records in place.
    #[default]
    Keep,
    /// Delete the records together with the user.
    Cascade,
}

/// Trim `name` and check it is acceptable as a user name.
pub fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("User name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(Error::Validation(format!(
            "User name is too long ({MAX_NAME_CHARS} characters max)"
        )));
    }
    Ok(name)
}

/// Insert a user unless one with that name already exists.
/// Returns whether a row was inserted.
pub fn insert_user_if_absent(
    conn: &impl ConnectionMethods,
    name: &str,
    created_at: &str,
) -> Result<bool> {
    let inserted = conn.sqlite().execute(
        "INSERT OR IGNORE INTO users(user_name, created_at) VALUES (?1, ?2)",
        rusqlite::params![name, created_at],
    )?;
    Ok(inserted == 1)
}

/// Names of all users, in lexicographic order.
pub fn list_users(conn: &impl ConnectionMethods) -> Result<Vec<String>> {
    let mut stmt = conn
        .sqlite()
        .prepare("SELECT user_name FROM users ORDER BY user_name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// All users with their registration time, in lexicographic order of name.
pub fn list_user_details(conn: &impl ConnectionMethods) -> Result<Vec<User>> {
    let mut stmt = conn
        .sqlite()
        .prepare("SELECT user_name, created_at FROM users ORDER BY user_name")?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                name: row.get(0)?,
                created_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<User>>>()?;
    Ok(users)
}

/// Look up a single user.
pub fn find_user(conn: &impl ConnectionMethods, name: &str) -> Result<Option<User>> {
    let user = conn
        .sqlite()
        .query_row(
            "SELECT user_name, created_at FROM users WHERE user_name = ?1",
            [name.trim()],
            |row| {
                Ok(User {
                    name: row.get(0)?,
                    created_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Register a new user.
///
/// The name is trimmed first. Fails with [`Error::Validation`] if it is empty
/// or too long and with [`Error::AlreadyExists`] if it is already registered,
/// in which case nothing is changed.
pub fn add_user(conn: &impl ConnectionMethods, name: &str) -> Result<User> {
    let name = validate_name(name)?;
    let created_at = timestamp_now();
    if !insert_user_if_absent(conn, name, &created_at)? {
        return Err(Error::AlreadyExists(format!("User {name} already exists")));
    }
    info!("registered user {}", name);
    Ok(User {
        name: name.to_string(),
        created_at,
    })
}

/// Whether the user has at least one meal record. Meant for warning before
/// a deletion that would leave records behind.
pub fn user_has_records(conn: &impl ConnectionMethods, name: &str) -> Result<bool> {
    let found = conn
        .sqlite()
        .query_row(
            "SELECT 1 FROM meals WHERE user_name = ?1 LIMIT 1",
            [name.trim()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Delete a user. Returns the number of meal records deleted with it.
///
/// Fails with [`Error::Validation`] for an empty name and with
/// [`Error::Protected`] for [`DEFAULT_USER_NAME`]. Deleting a name that is
/// not registered succeeds and changes nothing in the registry. With
/// [`RecordPolicy::Keep`] the user's records stay in the store.
pub fn delete_user(
    conn: &impl ConnectionMethods,
    name: &str,
    policy: RecordPolicy,
) -> Result<usize> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("User name is empty".to_string()));
    }
    if name == DEFAULT_USER_NAME {
        return Err(Error::Protected(format!(
            "The default user {DEFAULT_USER_NAME} cannot be deleted"
        )));
    }

    conn.with_savepoint("delete_user", |conn| {
        let removed = match policy {
            RecordPolicy::Cascade => meals::delete_user_records(conn, name)?,
            RecordPolicy::Keep => 0,
        };
        conn.sqlite()
            .execute("DELETE FROM users WHERE user_name = ?1", [name])?;
        info!("deleted user {} ({} records removed)", name, removed);
        Ok(removed)
    })
}

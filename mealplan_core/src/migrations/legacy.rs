//! The legacy single-user layout and its upgrade to the multi-user layout.
use rusqlite::types::Value;

use super::{create_meals_sql, MEALS_STAGING_TABLE, MEALS_TABLE};
use crate::db::ConnectionMethods;
use crate::meals::DayMeals;
use crate::users::DEFAULT_USER_NAME;
use crate::{debug, info, warn, Result};

/// Columns carried over from a legacy table, when present.
pub const LEGACY_COLUMNS: [&str; 7] = [
    "meal_date",
    "breakfast",
    "lunch",
    "dinner",
    "snack",
    "memo",
    "updated_at",
];

/// One row of a legacy `meals` table. Columns the table lacks, and NULLs,
/// are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacyMealRow {
    /// Date text exactly as stored.
    pub meal_date: String,
    /// Value columns.
    pub meals: DayMeals,
    /// Last write timestamp exactly as stored.
    pub updated_at: String,
}

/// One row of the multi-user `meals` table, with the date kept as stored text
/// so that legacy values are copied verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiUserRow {
    /// Owner of the record.
    pub user_name: String,
    /// Date text exactly as stored.
    pub meal_date: String,
    /// Value columns.
    pub meals: DayMeals,
    /// Last write timestamp.
    pub updated_at: String,
}

impl LegacyMealRow {
    /// Assign the row to `user_name`.
    pub fn upgrade(self, user_name: &str) -> MultiUserRow {
        MultiUserRow {
            user_name: user_name.to_string(),
            meal_date: self.meal_date,
            meals: self.meals,
            updated_at: self.updated_at,
        }
    }

    fn set(&mut self, column: &str, value: String) {
        match column {
            "meal_date" => self.meal_date = value,
            "breakfast" => self.meals.breakfast = value,
            "lunch" => self.meals.lunch = value,
            "dinner" => self.meals.dinner = value,
            "snack" => self.meals.snack = value,
            "memo" => self.meals.memo = value,
            "updated_at" => self.updated_at = value,
            _ => {}
        }
    }
}

impl MultiUserRow {
    /// Write this row into `table`, replacing any row with the same key.
    pub fn insert_or_replace(&self, conn: &impl ConnectionMethods, table: &str) -> Result<()> {
        conn.sqlite().execute(
            &format!(
                "INSERT OR REPLACE INTO {table}
                 (user_name, meal_date, breakfast, lunch, dinner, snack, memo, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            rusqlite::params![
                self.user_name,
                self.meal_date,
                self.meals.breakfast,
                self.meals.lunch,
                self.meals.dinner,
                self.meals.snack,
                self.meals.memo,
                self.updated_at,
            ],
        )?;
        Ok(())
    }
}

// SQLite columns are dynamically typed, so a legacy table may hold numbers
// where text was intended.
fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}

/// Read every row of the legacy `meals` table. `columns` are the columns the
/// table actually has; only those in [`LEGACY_COLUMNS`] are read.
pub(crate) fn read_rows(
    conn: &impl ConnectionMethods,
    columns: &[String],
) -> Result<Vec<LegacyMealRow>> {
    let selected: Vec<&str> = LEGACY_COLUMNS
        .iter()
        .copied()
        .filter(|c| columns.iter().any(|have| have == c))
        .collect();
    if !selected.contains(&"meal_date") {
        warn!(
            "legacy {} table has no meal_date column; its rows cannot be carried over",
            MEALS_TABLE
        );
        return Ok(Vec::new());
    }

    let sql = format!("SELECT {} FROM {}", selected.join(", "), MEALS_TABLE);
    debug!("query sql {}", sql);
    let mut stmt = conn.sqlite().prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let mut legacy = LegacyMealRow::default();
            for (idx, column) in selected.iter().enumerate() {
                legacy.set(column, value_to_text(row.get(idx)?));
            }
            Ok(legacy)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Replace the legacy `meals` table with one in the multi-user layout,
/// assigning every row to the default user. The new table is fully populated
/// before the old one is dropped. Callers run this inside a transaction.
pub(crate) fn migrate(conn: &impl ConnectionMethods, columns: &[String]) -> Result<()> {
    info!(
        "migrating single-user {} table to the multi-user layout",
        MEALS_TABLE
    );
    conn.execute(&create_meals_sql(MEALS_STAGING_TABLE, true))?;

    let rows = read_rows(conn, columns)?;
    let count = rows.len();
    for row in rows {
        row.upgrade(DEFAULT_USER_NAME)
            .insert_or_replace(conn, MEALS_STAGING_TABLE)?;
    }

    conn.execute(&format!(
        "DROP TABLE {MEALS_TABLE};
         ALTER TABLE {MEALS_STAGING_TABLE} RENAME TO {MEALS_TABLE};"
    ))?;
    info!("migrated {} legacy rows to user {}", count, DEFAULT_USER_NAME);
    Ok(())
}

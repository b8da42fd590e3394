//! The meal record store: one record per user and day.
use chrono::{Days, NaiveDate};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::db::ConnectionMethods;
use crate::util::{date_from_sql, date_to_sql, timestamp_now, ymd};
use crate::{debug, warn, Error, Result};

/// The free-text fields recorded for one day. Any of them may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMeals {
    /// Breakfast.
    pub breakfast: String,
    /// Lunch.
    pub lunch: String,
    /// Dinner.
    pub dinner: String,
    /// Snack.
    pub snack: String,
    /// Free-form note.
    pub memo: String,
}

impl DayMeals {
    /// Whether every field is empty after trimming.
    pub fn is_empty(&self) -> bool {
        [
            &self.breakfast,
            &self.lunch,
            &self.dinner,
            &self.snack,
            &self.memo,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
    }
}

/// A stored record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    /// Owner of the record.
    pub user_name: String,
    /// Day the record is for.
    pub date: NaiveDate,
    /// Recorded meals.
    pub meals: DayMeals,
    /// When the record was last written.
    pub updated_at: String,
}

fn text_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn day_meals_from_row(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<DayMeals> {
    Ok(DayMeals {
        breakfast: text_column(row, first)?,
        lunch: text_column(row, first + 1)?,
        dinner: text_column(row, first + 2)?,
        snack: text_column(row, first + 3)?,
        memo: text_column(row, first + 4)?,
    })
}

/// Save the meals for `user` on `date`, replacing every field of any
/// existing record and setting `updated_at` to now.
pub fn upsert_record(
    conn: &impl ConnectionMethods,
    user: &str,
    date: NaiveDate,
    meals: &DayMeals,
) -> Result<()> {
    let date = date_to_sql(date);
    debug!("upsert meals for {} on {}", user, date);
    conn.sqlite().execute(
        "INSERT INTO meals(user_name, meal_date, breakfast, lunch, dinner, snack, memo, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_name, meal_date) DO UPDATE SET
             breakfast=excluded.breakfast,
             lunch=excluded.lunch,
             dinner=excluded.dinner,
             snack=excluded.snack,
             memo=excluded.memo,
             updated_at=excluded.updated_at",
        rusqlite::params![
            user,
            date,
            meals.breakfast,
            meals.lunch,
            meals.dinner,
            meals.snack,
            meals.memo,
            timestamp_now(),
        ],
    )?;
    Ok(())
}

/// The meals recorded for `user` on `date`, or `None` if nothing was saved
/// for that day.
pub fn load_record(
    conn: &impl ConnectionMethods,
    user: &str,
    date: NaiveDate,
) -> Result<Option<DayMeals>> {
    let meals = conn
        .sqlite()
        .query_row(
            "SELECT breakfast, lunch, dinner, snack, memo
             FROM meals
             WHERE user_name = ?1 AND meal_date = ?2",
            rusqlite::params![user, date_to_sql(date)],
            |row| day_meals_from_row(row, 0),
        )
        .optional()?;
    Ok(meals)
}

/// Records of `user` with `start <= date < end`, ascending by date.
///
/// Rows whose stored date is not a valid `YYYY-MM-DD` date are skipped.
pub fn load_range(
    conn: &impl ConnectionMethods,
    user: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MealRecord>> {
    let mut stmt = conn.sqlite().prepare(
        "SELECT meal_date, breakfast, lunch, dinner, snack, memo, updated_at
         FROM meals
         WHERE user_name = ?1 AND meal_date >= ?2 AND meal_date < ?3
         ORDER BY meal_date",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![user, date_to_sql(start), date_to_sql(end)],
            |row| {
                Ok((
                    text_column(row, 0)?,
                    day_meals_from_row(row, 1)?,
                    text_column(row, 6)?,
                ))
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for (date_text, meals, updated_at) in rows {
        match date_from_sql(&date_text) {
            Ok(date) if date >= start && date < end => records.push(MealRecord {
                user_name: user.to_string(),
                date,
                meals,
                updated_at,
            }),
            Ok(date) => {
                warn!("skipping record dated {} outside {}..{}", date, start, end);
            }
            Err(e) => {
                warn!("skipping record with unreadable date {:?}: {}", date_text, e);
            }
        }
    }
    Ok(records)
}

/// Records for the seven days starting at `monday`.
pub fn load_week(
    conn: &impl ConnectionMethods,
    user: &str,
    monday: NaiveDate,
) -> Result<Vec<MealRecord>> {
    let end = add_days(monday, 7)?;
    load_range(conn, user, monday, end)
}

/// Records for one calendar month.
pub fn load_month(
    conn: &impl ConnectionMethods,
    user: &str,
    year: i32,
    month: u32,
) -> Result<Vec<MealRecord>> {
    let (start, end) = month_bounds(year, month)?;
    load_range(conn, user, start, end)
}

/// First day of the month and first day of the following month.
/// December rolls over to January of the next year.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = ymd(year, month, 1)?;
    let end = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    Ok((start, end))
}

/// Delete every record of `user`. Returns how many were removed.
pub fn delete_user_records(conn: &impl ConnectionMethods, user: &str) -> Result<usize> {
    let removed = conn
        .sqlite()
        .execute("DELETE FROM meals WHERE user_name = ?1", [user])?;
    debug!("deleted {} records of {}", removed, user);
    Ok(removed)
}

/// Number of records stored for `user`.
pub fn count_records(conn: &impl ConnectionMethods, user: &str) -> Result<usize> {
    let count: i64 = conn.sqlite().query_row(
        "SELECT COUNT(*) FROM meals WHERE user_name = ?1",
        [user],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

pub(crate) fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| Error::InvalidDate(format!("{date} + {days} days")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_rolls_over() {
        let (start, end) = month_bounds(2024, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn february_bounds() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn invalid_month_rejected() {
        assert!(matches!(month_bounds(2024, 13), Err(Error::InvalidDate(_))));
        assert!(matches!(month_bounds(2024, 0), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn empty_meals() {
        assert!(DayMeals::default().is_empty());
        let meals = DayMeals {
            memo: "  ".to_string(),
            ..Default::default()
        };
        assert!(meals.is_empty());
        let meals = DayMeals {
            snack: "apple".to_string(),
            ..Default::default()
        };
        assert!(!meals.is_empty());
    }
}

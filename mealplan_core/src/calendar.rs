//! Turning loaded records into week and month views.
//!
//! Everything here is pure: records come in, view structures come out.
use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};

use crate::meals::{month_bounds, DayMeals, MealRecord};
use crate::util::shorten;
use crate::Result;

/// Badge shown when breakfast was recorded.
pub const BREAKFAST_BADGE: &str = "🌞";
/// Badge shown when lunch was recorded.
pub const LUNCH_BADGE: &str = "🍚";
/// Badge shown when dinner was recorded.
pub const DINNER_BADGE: &str = "🌙";
/// Badge shown when a snack was recorded.
pub const SNACK_BADGE: &str = "🍪";
/// Prefix of the memo line.
pub const MEMO_MARKER: &str = "📝";
/// Longest main dish or memo shown in a cell, in characters.
pub const CELL_TEXT_CHARS: usize = 18;

/// One day of a dense week view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekRow {
    /// The day.
    pub date: NaiveDate,
    /// What was recorded, all empty if nothing was.
    pub meals: DayMeals,
}

/// One cell of a month view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalendarCell {
    /// Outside the month.
    Padding,
    /// A day of the month.
    Day {
        /// Day of month, starting at 1.
        day: u32,
        /// The full date.
        date: NaiveDate,
        /// [`summarize_cell`] of the day's record; empty if there is none.
        summary: String,
    },
}

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    // Going back at most six days from a valid date only fails at the very
    // start of the representable range.
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// The seven consecutive days starting at `monday`.
///
/// `monday` is used as given; normalise with [`week_start`] first.
pub fn week_dates(monday: NaiveDate) -> Vec<NaiveDate> {
    monday.iter_days().take(7).collect()
}

/// Exactly seven rows aligned with [`week_dates`]. Days without a record get
/// empty meals, and records outside the week are ignored.
pub fn build_week_view(records: &[MealRecord], monday: NaiveDate) -> Vec<WeekRow> {
    let by_date: HashMap<NaiveDate, &DayMeals> =
        records.iter().map(|r| (r.date, &r.meals)).collect();
    week_dates(monday)
        .into_iter()
        .map(|date| WeekRow {
            date,
            meals: by_date.get(&date).map(|m| (*m).clone()).unwrap_or_default(),
        })
        .collect()
}

/// Short text for one calendar day.
///
/// The first line holds a badge for each recorded meal followed by the most
/// substantial dish (dinner, else lunch, else breakfast). A second line
/// holds the memo if there is one. Returns an empty string when nothing was
/// recorded.
pub fn summarize_cell(meals: &DayMeals) -> String {
    let breakfast = meals.breakfast.trim();
    let lunch = meals.lunch.trim();
    let dinner = meals.dinner.trim();
    let snack = meals.snack.trim();
    let memo = meals.memo.trim();

    let badges: Vec<&str> = [
        (breakfast, BREAKFAST_BADGE),
        (lunch, LUNCH_BADGE),
        (dinner, DINNER_BADGE),
        (snack, SNACK_BADGE),
    ]
    .into_iter()
    .filter(|(text, _)| !text.is_empty())
    .map(|(_, badge)| badge)
    .collect();

    let main = [dinner, lunch, breakfast]
        .into_iter()
        .find(|text| !text.is_empty())
        .map(|text| shorten(text, CELL_TEXT_CHARS))
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(2);
    if !badges.is_empty() || !main.is_empty() {
        lines.push(format!("{} {}", badges.join(" "), main).trim().to_string());
    }
    if !memo.is_empty() {
        lines.push(format!("{MEMO_MARKER} {}", shorten(memo, CELL_TEXT_CHARS)));
    }
    lines.join("\n").trim().to_string()
}

/// Week rows of a month, Monday first. Each row has seven day numbers and
/// `0` marks a day that belongs to the previous or next month.
pub fn month_grid(year: i32, month: u32) -> Result<Vec<[u32; 7]>> {
    let (first, next) = month_bounds(year, month)?;
    let mut weeks = Vec::new();
    let mut week = [0u32; 7];
    for date in first.iter_days().take_while(|d| *d < next) {
        let column = date.weekday().num_days_from_monday() as usize;
        week[column] = date.day();
        if column == 6 {
            weeks.push(week);
            week = [0; 7];
        }
    }
    if week.iter().any(|d| *d != 0) {
        weeks.push(week);
    }
    Ok(weeks)
}

/// The month grid with each day's cell summary filled in from `records`.
/// Records outside the month are ignored.
pub fn build_month_view(
    year: i32,
    month: u32,
    records: &[MealRecord],
) -> Result<Vec<[CalendarCell; 7]>> {
    let (first, _) = month_bounds(year, month)?;
    let by_date: HashMap<NaiveDate, &DayMeals> =
        records.iter().map(|r| (r.date, &r.meals)).collect();
    let weeks = month_grid(year, month)?;
    Ok(weeks
        .into_iter()
        .map(|week| {
            week.map(|day| {
                if day == 0 {
                    return CalendarCell::Padding;
                }
                let date = first.with_day(day).unwrap_or(first);
                let summary = by_date
                    .get(&date)
                    .map(|meals| summarize_cell(meals))
                    .unwrap_or_default();
                CalendarCell::Day { day, date, summary }
            })
        })
        .collect())
}

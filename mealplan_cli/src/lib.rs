#![doc(hidden)]
//! This library is not stable, and usage is strongly discouraged.
//!
//! It is intended only to assist developing the CLI.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use mealplan_core::calendar::{build_month_view, build_week_view, week_start};
use mealplan_core::export::{default_export_file_name, PageLayout, WeekSheet};
use mealplan_core::migrations::{detect_schema_version, USERS_TABLE};
use mealplan_core::{
    db, meals, users, CalendarCell, Connection, ConnectionMethods, DayMeals, RecordPolicy,
    WeekRow,
};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Directory the CLI keeps its state in, relative to the working directory.
pub const BASE_DIR_NAME: &str = ".mealplan";
/// Directory week sheets are exported to unless `--out` is given.
pub const OUTPUT_DIR_NAME: &str = "output";
/// Shown in the month view for a day without any record.
pub const EMPTY_DAY: &str = "—";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn init(path: &str) -> Result<()> {
    let spec = db::ConnectionSpec::new(path);
    let found = detect_schema_version(&Connection::open(spec.connection_string())?)?;
    db::connect(&spec)?;
    std::fs::create_dir_all(base_dir()?)?;
    spec.save(&base_dir()?)?;
    println!("Initialized store {path} (was {found})");
    Ok(())
}

/// Where the store is: `db_path` if given (from `--db` or `MEALPLAN_DB`), else
/// the spec saved by `init`.
pub fn load_connspec(db_path: Option<&str>) -> Result<db::ConnectionSpec> {
    if let Some(conn_str) = db_path {
        return Ok(db::ConnectionSpec::new(conn_str));
    }
    match db::ConnectionSpec::load(base_dir()?) {
        Ok(spec) => Ok(spec),
        Err(mealplan_core::Error::IO(_)) => {
            eprintln!("No meal planner store configured. Did you run mealplan init?");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Open the store and bring it to the current schema.
pub fn open_store(db_path: Option<&str>) -> Result<Connection> {
    let spec = load_connspec(db_path)?;
    log::debug!("opening store {}", spec.connection_string());
    Ok(db::connect(&spec)?)
}

/// Report the layout of the store without changing it.
pub fn status(db_path: Option<&str>) -> Result<()> {
    let spec = load_connspec(db_path)?;
    if !spec.is_memory() && !Path::new(spec.connection_string()).exists() {
        return Err(mealplan_core::Error::Validation(format!(
            "No store at {}. Did you run mealplan init?",
            spec.connection_string()
        ))
        .into());
    }
    let conn = Connection::open_read_only(spec.connection_string())?;
    let version = detect_schema_version(&conn)?;
    println!("Store: {}", spec.connection_string());
    println!("Schema: {version}");
    println!("Stamp: user_version {}", conn.user_version()?);
    if version.needs_migration() {
        println!("The store will be upgraded the next time it is opened");
    }
    if conn.has_table(USERS_TABLE)? {
        println!("Users: {}", users::list_users(&conn)?.len());
    }
    Ok(())
}

pub fn list_users(conn: &Connection) -> Result<()> {
    for user in users::list_user_details(conn)? {
        let marker = if user.is_default() { " (default)" } else { "" };
        println!("{}{}\t{}", user.name, marker, user.created_at);
    }
    Ok(())
}

pub fn add_user(conn: &Connection, name: &str) -> Result<()> {
    let user = users::add_user(conn, name)?;
    println!("Added user {}", user.name);
    Ok(())
}

/// Delete `name` once `confirm` repeats it exactly.
pub fn delete_user(
    conn: &Connection,
    name: &str,
    with_records: bool,
    confirm: Option<&str>,
) -> Result<()> {
    let name = name.trim();
    if name == mealplan_core::DEFAULT_USER_NAME {
        // report protection before asking for confirmation
        users::delete_user(conn, name, RecordPolicy::Keep)?;
    }
    if confirm.map(str::trim) != Some(name) {
        return Err(mealplan_core::Error::Validation(format!(
            "Deleting {name} requires --confirm {name}"
        ))
        .into());
    }
    let policy = if with_records {
        RecordPolicy::Cascade
    } else {
        RecordPolicy::Keep
    };
    if policy == RecordPolicy::Keep && users::user_has_records(conn, name)? {
        eprintln!(
            "Warning: the meal records of {name} are kept and will reappear \
             if {name} is added again. Use --with-records to delete them too."
        );
    }
    let removed = users::delete_user(conn, name, policy)?;
    println!("Deleted user {name} ({removed} records removed)");
    Ok(())
}

/// Normalise `user` and check it is registered. Returns the name every
/// store call must use.
fn require_user<'a>(conn: &Connection, user: &'a str) -> Result<&'a str> {
    let user = users::validate_name(user)?;
    if users::find_user(conn, user)?.is_none() {
        return Err(mealplan_core::Error::Validation(format!(
            "Unknown user {user}. Add it with mealplan users add {user}"
        ))
        .into());
    }
    Ok(user)
}

pub fn format_day(user: &str, date: NaiveDate, record: Option<&DayMeals>) -> String {
    let Some(meals) = record else {
        return format!("No record for {user} on {date}\n");
    };
    let mut out = format!("{user} on {date} ({})\n", date.format("%a"));
    for (label, text) in [
        ("Breakfast", &meals.breakfast),
        ("Lunch", &meals.lunch),
        ("Dinner", &meals.dinner),
        ("Snack", &meals.snack),
        ("Memo", &meals.memo),
    ] {
        let _ = writeln!(out, "  {label:<9} {}", text.trim());
    }
    out
}

pub fn show(conn: &Connection, user: &str, date: NaiveDate) -> Result<()> {
    let user = require_user(conn, user)?;
    let record = meals::load_record(conn, user, date)?;
    print!("{}", format_day(user, date, record.as_ref()));
    Ok(())
}

pub fn save(conn: &Connection, user: &str, date: NaiveDate, day: &DayMeals) -> Result<()> {
    let user = require_user(conn, user)?;
    meals::upsert_record(conn, user, date, day)?;
    println!("Saved {user} on {date}");
    Ok(())
}

pub fn format_week(user: &str, monday: NaiveDate, rows: &[WeekRow]) -> String {
    let mut out = format!("{user}, week of {monday}\n");
    out.push_str("Date           | Breakfast | Lunch | Dinner | Snack | Memo\n");
    for row in rows {
        let m = &row.meals;
        let _ = writeln!(
            out,
            "{} {} | {} | {} | {} | {} | {}",
            row.date,
            WEEKDAYS[row.date.weekday().num_days_from_monday() as usize],
            m.breakfast.trim(),
            m.lunch.trim(),
            m.dinner.trim(),
            m.snack.trim(),
            m.memo.trim()
        );
    }
    out
}

pub fn week(conn: &Connection, user: &str, date: NaiveDate) -> Result<()> {
    let user = require_user(conn, user)?;
    let monday = week_start(date);
    let records = meals::load_week(conn, user, monday)?;
    print!("{}", format_week(user, monday, &build_week_view(&records, monday)));
    Ok(())
}

pub fn format_month(user: &str, year: i32, month: u32, view: &[[CalendarCell; 7]]) -> String {
    let mut out = format!("{user}, {year:04}-{month:02}\n");
    out.push_str(&WEEKDAYS.map(|d| format!("{d:>4}")).concat());
    out.push('\n');
    for week in view {
        for cell in week {
            match cell {
                CalendarCell::Padding => out.push_str("    "),
                CalendarCell::Day { day, .. } => {
                    let _ = write!(out, "{day:>4}");
                }
            }
        }
        out.push('\n');
    }
    out.push('\n');
    for cell in view.iter().flatten() {
        if let CalendarCell::Day { date, summary, .. } = cell {
            let summary = if summary.is_empty() {
                EMPTY_DAY.to_string()
            } else {
                summary.replace('\n', " ")
            };
            let _ = writeln!(out, "{date} {summary}");
        }
    }
    out
}

pub fn month(conn: &Connection, user: &str, year: i32, month: u32) -> Result<()> {
    let user = require_user(conn, user)?;
    let records = meals::load_month(conn, user, year, month)?;
    let view = build_month_view(year, month, &records)?;
    print!("{}", format_month(user, year, month, &view));
    Ok(())
}

/// Write the week sheet for the week containing `date`. Returns where it
/// was written.
pub fn export(
    conn: &Connection,
    user: &str,
    date: NaiveDate,
    out: Option<&Path>,
) -> Result<PathBuf> {
    let user = require_user(conn, user)?;
    let monday = week_start(date);
    let records = meals::load_week(conn, user, monday)?;
    let sheet = WeekSheet::new(user, monday, build_week_view(&records, monday))?;
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(OUTPUT_DIR_NAME).join(default_export_file_name(user, monday)),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, sheet.render_text(&PageLayout::default()))?;
    println!("Wrote {}", path.display());
    Ok(path)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn base_dir() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|d| d.join(BASE_DIR_NAME))
        .map_err(|e| e.into())
}

pub fn handle_error(r: Result<()>) {
    if let Err(e) = r {
        match e.downcast_ref::<mealplan_core::Error>() {
            Some(core) if core.is_user_error() => eprintln!("{core}"),
            _ => eprintln!("Encountered unexpected error: {e}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_without_record() {
        assert_eq!(
            format_day("kim", date(2024, 1, 1), None),
            "No record for kim on 2024-01-01\n"
        );
    }

    #[test]
    fn day_with_record() {
        let meals = DayMeals {
            lunch: " ramen ".to_string(),
            ..Default::default()
        };
        let text = format_day("kim", date(2024, 1, 1), Some(&meals));
        assert!(text.starts_with("kim on 2024-01-01 (Mon)\n"));
        assert!(text.contains("  Lunch     ramen\n"));
    }

    #[test]
    fn week_table_has_seven_rows() {
        let monday = date(2024, 1, 1);
        let text = format_week("kim", monday, &build_week_view(&[], monday));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[2], "2024-01-01 Mon |  |  |  |  | ");
        assert_eq!(lines[8], "2024-01-07 Sun |  |  |  |  | ");
    }

    #[test]
    fn month_marks_empty_days() {
        let view = build_month_view(2024, 9, &[]).unwrap();
        let text = format_month("kim", 2024, 9, &view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "kim, 2024-09");
        assert_eq!(lines[1], " Mon Tue Wed Thu Fri Sat Sun");
        assert_eq!(lines[2], "                           1");
        assert!(text.contains("2024-09-30 —\n"));
        assert_eq!(text.matches(EMPTY_DAY).count(), 30);
    }
}

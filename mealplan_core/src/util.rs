use chrono::{Local, NaiveDate};

use crate::{Error, Result};

/// Format used for `created_at` and `updated_at`: local time, to the second.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format used for the `meal_date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn date_from_sql(text: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(text, DATE_FORMAT)?)
}

pub fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
}

/// Truncate to `max` characters, appending an ellipsis if anything was cut.
/// Leading and trailing whitespace is removed first.
pub fn shorten(text: &str, max: usize) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    let mut out: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("  soup ", 18), "soup");
    }

    #[test]
    fn shorten_counts_characters_not_bytes() {
        let text = "가나다라마바사아자차카타파하가나다라마";
        assert_eq!(text.chars().count(), 19);
        assert_eq!(shorten(text, 18), "가나다라마바사아자차카타파하가나다라…");
        assert_eq!(shorten(&text[..text.len() - 3], 18), &text[..text.len() - 3]);
    }

    #[test]
    fn date_round_trip_text() {
        let date = ymd(2024, 1, 5).unwrap();
        assert_eq!(date_to_sql(date), "2024-01-05");
        assert_eq!(date_from_sql("2024-01-05").unwrap(), date);
        assert!(date_from_sql("2024-1-5x").is_err());
    }

    #[test]
    fn impossible_date_is_invalid() {
        assert!(matches!(ymd(2023, 2, 29), Err(Error::InvalidDate(_))));
    }
}

//! Printable week sheets.
//!
//! A sheet is laid out top to bottom on pages measured in points, the way a
//! printed A4 page is: the title sits at [`PageLayout::top`], each line moves
//! the cursor down, and once the cursor drops below [`PageLayout::bottom`]
//! the rest continues on a fresh page.
use std::fmt;

use chrono::NaiveDate;

use crate::calendar::WeekRow;
use crate::meals::add_days;
use crate::util::{date_to_sql, shorten};
use crate::Result;

/// Longest meal text shown in a sheet row, in characters.
pub const ROW_TEXT_CHARS: usize = 18;

/// Column headings of a sheet.
pub const HEADER: [&str; 4] = ["Date", "Breakfast", "Lunch", "Dinner"];

const COLUMN_SEPARATOR: &str = " | ";
const RULE_CHAR: char = '-';
const PAGE_BREAK: char = '\x0c';

/// Vertical geometry of a page, in points measured up from the bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLayout {
    /// Position of the first line of every page.
    pub top: i32,
    /// Content below this position moves to the next page.
    pub bottom: i32,
    /// Distance between consecutive lines.
    pub line_height: i32,
    /// Distance from the title down to the column header.
    pub title_gap: i32,
    /// Distance from the rule under the header down to the first row.
    pub header_gap: i32,
}

impl Default for PageLayout {
    fn default() -> Self {
        PageLayout {
            top: 805,
            bottom: 70,
            line_height: 18,
            title_gap: 35,
            header_gap: 16,
        }
    }
}

/// What a line on a page is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// The sheet title.
    Title,
    /// Column headings.
    Header,
    /// Horizontal rule under the headings.
    Rule,
    /// One day.
    Row,
}

/// A line of text placed on a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedLine {
    /// Vertical position.
    pub y: i32,
    /// What the line is.
    pub kind: LineKind,
    /// The text.
    pub text: String,
}

/// One page of a sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    lines: Vec<PlacedLine>,
}

impl Page {
    /// Lines from the top of the page down.
    pub fn lines(&self) -> &[PlacedLine] {
        &self.lines
    }

    /// The page as plain text, one line per placed line.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// The printable sheet of one user's week.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekSheet {
    user: String,
    monday: NaiveDate,
    sunday: NaiveDate,
    rows: Vec<WeekRow>,
}

impl WeekSheet {
    /// Build a sheet from dense week rows, normally the output of
    /// [`build_week_view`][crate::calendar::build_week_view].
    pub fn new(user: &str, monday: NaiveDate, rows: Vec<WeekRow>) -> Result<Self> {
        Ok(WeekSheet {
            user: user.to_string(),
            monday,
            sunday: add_days(monday, 6)?,
            rows,
        })
    }

    /// The heading printed at the top of the first page.
    pub fn title(&self) -> String {
        format!(
            "{} weekly meal plan ({} ~ {})",
            self.user,
            date_to_sql(self.monday),
            date_to_sql(self.sunday)
        )
    }

    fn header_line() -> String {
        HEADER.join(COLUMN_SEPARATOR)
    }

    fn row_line(row: &WeekRow) -> String {
        [
            date_to_sql(row.date),
            shorten(&row.meals.breakfast, ROW_TEXT_CHARS),
            shorten(&row.meals.lunch, ROW_TEXT_CHARS),
            shorten(&row.meals.dinner, ROW_TEXT_CHARS),
        ]
        .join(COLUMN_SEPARATOR)
    }

    /// Lay the sheet out on as many pages as it needs.
    ///
    /// The title, header and rule always go on the first page. After each row
    /// the cursor moves down one line; when it falls below `layout.bottom` a
    /// new page is started at `layout.top`.
    pub fn paginate(&self, layout: &PageLayout) -> Vec<Page> {
        let mut pages = Vec::new();
        let mut page = Page::default();

        let header = Self::header_line();
        let rule: String = std::iter::repeat(RULE_CHAR)
            .take(header.chars().count())
            .collect();

        let mut y = layout.top;
        page.lines.push(PlacedLine {
            y,
            kind: LineKind::Title,
            text: self.title(),
        });
        y -= layout.title_gap;
        page.lines.push(PlacedLine {
            y,
            kind: LineKind::Header,
            text: header,
        });
        y -= layout.line_height;
        page.lines.push(PlacedLine {
            y,
            kind: LineKind::Rule,
            text: rule,
        });
        y -= layout.header_gap;

        for row in &self.rows {
            page.lines.push(PlacedLine {
                y,
                kind: LineKind::Row,
                text: Self::row_line(row),
            });
            y -= layout.line_height;
            if y < layout.bottom {
                pages.push(std::mem::take(&mut page));
                y = layout.top;
            }
        }
        if !page.lines.is_empty() {
            pages.push(page);
        }
        pages
    }

    /// All pages as plain text, separated by form feeds.
    pub fn render_text(&self, layout: &PageLayout) -> String {
        let mut out = self
            .paginate(layout)
            .iter()
            .map(Page::text)
            .collect::<Vec<_>>()
            .join(&format!("\n{PAGE_BREAK}"));
        out.push('\n');
        out
    }
}

/// File name a week sheet is written to unless told otherwise.
pub fn default_export_file_name(user: &str, monday: NaiveDate) -> String {
    format!("{}_weekly_meals_{}.txt", user, date_to_sql(monday))
}

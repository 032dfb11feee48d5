use chrono::{Days, Local, NaiveDate, ParseResult};

/// Day-first format used for display and in the catalog file.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The date `days` after `start`, saturating at the latest representable date.
pub fn extend_date(start: NaiveDate, days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(days.into()))
        .unwrap_or(NaiveDate::MAX)
}

/// Signed number of days from `start` to `end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Days a book returned on `returned` is past `due`; 0 when not late.
pub fn days_overdue(due: NaiveDate, returned: NaiveDate) -> i64 {
    if returned <= due {
        0
    } else {
        days_between(due, returned)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

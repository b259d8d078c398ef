use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EIGHT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("date pattern should compile"));

/// Parse a `YYYYMMDD` report value. Anything that is not exactly eight
/// digits forming a real calendar date yields `None`.
pub fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if !EIGHT_DIGITS.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

/// A column counts as a date column when its (stripped) name contains `date`.
pub fn is_date_column(column: &str) -> bool {
    column.contains("date")
}

/// Find the date in a report row: a field under a date-named column whose
/// value parses as `YYYYMMDD`. If several qualify, the rightmost wins.
pub fn find_row_date(columns: &[String], row: &[String]) -> Option<NaiveDate> {
    columns
        .iter()
        .zip(row)
        .filter(|(column, _)| is_date_column(column))
        .filter_map(|(_, value)| parse_compact_date(value))
        .last()
}

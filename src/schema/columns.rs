// src/schema/columns.rs

use super::types::ColumnHeader;

/// Metadata columns appended after the report's own columns, in output order.
pub const TRAILER: [&str; 9] = [
    "querysamplinglevel",
    "sampleddata",
    "samplesize",
    "samplespace",
    "sampling_perc",
    "accountid",
    "webpropertyid",
    "profileid",
    "tableid",
];

/// `ga:date` → `date`. Names without a namespace are kept as-is.
pub fn strip_namespace(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, rest)) => rest,
        None => name,
    }
}

pub fn report_column_names(headers: &[ColumnHeader]) -> Vec<String> {
    headers
        .iter()
        .map(|h| strip_namespace(&h.name).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("ga:date"), "date");
        assert_eq!(strip_namespace("ga:sessions"), "sessions");
        assert_eq!(strip_namespace("pageviews"), "pageviews");
    }

    #[test]
    fn test_report_column_names_keeps_order() {
        let headers = vec![
            ColumnHeader {
                name: "ga:date".into(),
                column_type: Some("DIMENSION".into()),
                data_type: Some("STRING".into()),
            },
            ColumnHeader {
                name: "ga:users".into(),
                column_type: Some("METRIC".into()),
                data_type: Some("INTEGER".into()),
            },
        ];
        assert_eq!(report_column_names(&headers), vec!["date", "users"]);
    }
}

// src/process/mod.rs
//! Report flattening: raw report payloads → one date-sorted row table.

pub mod date_parser;
pub mod sampling;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::UpstreamError;
use crate::schema::{report_column_names, NormalizedRow, ReportPayload, ResultTable};

/// Position of the metric value in every report row.
pub const VALUE_INDEX: usize = 1;

/// Per-payload metadata copied onto each of its rows.
#[derive(Debug, Clone, PartialEq)]
struct PayloadMeta {
    query_sampling_level: String,
    sampled_data: bool,
    sample_size: i64,
    sample_space: i64,
    sampling_percent: f64,
    account_id: String,
    web_property_id: String,
    profile_id: String,
    table_id: String,
}

impl PayloadMeta {
    fn from_payload(payload: &ReportPayload) -> Self {
        let info = &payload.profile_info;
        let sampled_data = truthy(payload.contains_sampled_data.as_ref());
        let (sample_size, sample_space, sampling_percent) = if sampled_data {
            let size = payload.sample_size.as_ref();
            let space = payload.sample_space.as_ref();
            (
                whole(sampling::numeric("sampleSize", size).ok()),
                whole(sampling::numeric("sampleSpace", space).ok()),
                sampling::percent_or_zero(size, space),
            )
        } else {
            (0, 0, 0.0)
        };
        Self {
            query_sampling_level: payload.query.sampling_level.clone().unwrap_or_default(),
            sampled_data,
            sample_size,
            sample_space,
            sampling_percent,
            account_id: info.account_id.clone(),
            web_property_id: info.web_property_id.clone(),
            profile_id: info.profile_id.clone(),
            table_id: info.table_id.clone(),
        }
    }
}

fn whole(n: Option<f64>) -> i64 {
    n.map(|n| n.round() as i64).unwrap_or(0)
}

/// Loose boolean coercion for `containsSampledData`. Absent, null, `false`,
/// zero, empty and the string `"false"` all mean "not sampled".
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false")
        }
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn normalize_row(
    columns: &[String],
    row: &[String],
    meta: &PayloadMeta,
    source_index: usize,
) -> Option<NormalizedRow> {
    let date = date_parser::find_row_date(columns, row)?;
    let value = row.get(VALUE_INDEX)?;
    Some(NormalizedRow {
        date,
        dimension_value: value.clone(),
        query_sampling_level: meta.query_sampling_level.clone(),
        sampled_data: meta.sampled_data,
        sample_size: meta.sample_size,
        sample_space: meta.sample_space,
        sampling_percent: meta.sampling_percent,
        account_id: meta.account_id.clone(),
        web_property_id: meta.web_property_id.clone(),
        profile_id: meta.profile_id.clone(),
        table_id: meta.table_id.clone(),
        source_index: source_index as i64,
    })
}

/// Flatten report payloads into a single table sorted by date.
///
/// - No payloads → `Ok(None)`; nothing should be written.
/// - The column schema comes from the **first** payload only. Later payloads
///   are assumed to share it and are not checked.
/// - Each row keeps its `YYYYMMDD` date (from a date-named column) and the
///   value at [`VALUE_INDEX`]; rows lacking either are skipped with a warning.
/// - A payload without `rows` contributes nothing.
/// - The sort is stable, so rows sharing a date keep payload-then-row order.
#[instrument(level = "info", skip(payloads), fields(payloads = payloads.len()))]
pub fn flatten(payloads: &[ReportPayload]) -> Result<Option<ResultTable>, UpstreamError> {
    let Some(first) = payloads.first() else {
        debug!("no payloads to flatten");
        return Ok(None);
    };

    let report_columns = report_column_names(&first.column_headers);
    if report_columns.len() != 2 {
        return Err(UpstreamError::UnsupportedShape {
            found: report_columns.len(),
            columns: report_columns.join(","),
        });
    }

    let mut rows = Vec::new();
    for (payload_idx, payload) in payloads.iter().enumerate() {
        let meta = PayloadMeta::from_payload(payload);
        let before = rows.len();

        for (row_idx, data) in payload.rows.iter().flatten().enumerate() {
            match normalize_row(&report_columns, data, &meta, rows.len()) {
                Some(row) => rows.push(row),
                None => warn!(
                    payload = payload_idx,
                    row = row_idx,
                    values = ?data,
                    "skipping row without a YYYYMMDD date or a value"
                ),
            }
        }

        debug!(
            payload = payload_idx,
            profile = %meta.profile_id,
            sampling_level = %meta.query_sampling_level,
            rows = rows.len() - before,
            "payload flattened"
        );
    }

    rows.sort_by_key(|r| r.date);
    Ok(Some(ResultTable {
        report_columns,
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnHeader, ProfileInfo, QueryEcho};
    use chrono::NaiveDate;
    use serde_json::json;

    fn header(name: &str) -> ColumnHeader {
        ColumnHeader {
            name: name.to_string(),
            column_type: None,
            data_type: None,
        }
    }

    fn payload(profile: &str, rows: &[(&str, &str)]) -> ReportPayload {
        ReportPayload {
            column_headers: vec![header("ga:date"), header("ga:sessions")],
            rows: Some(
                rows.iter()
                    .map(|(d, v)| vec![d.to_string(), v.to_string()])
                    .collect(),
            ),
            profile_info: ProfileInfo {
                account_id: "126375".into(),
                web_property_id: "UA-126375-31".into(),
                profile_id: profile.into(),
                table_id: format!("ga:{}", profile),
            },
            query: QueryEcho {
                sampling_level: Some("HIGHER_PRECISION".into()),
            },
            contains_sampled_data: Some(json!(false)),
            sample_size: None,
            sample_space: None,
        }
    }

    fn sampled(mut p: ReportPayload, size: &str, space: &str) -> ReportPayload {
        p.contains_sampled_data = Some(json!(true));
        p.sample_size = Some(json!(size));
        p.sample_space = Some(json!(space));
        p
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_empty_input_yields_no_table() {
        assert_eq!(flatten(&[]).unwrap(), None);
    }

    #[test]
    fn test_unsampled_rows_have_zero_percent() {
        let table = flatten(&[payload("1", &[("20230101", "5"), ("20230102", "7")])])
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 2);
        for row in &table.rows {
            assert!(!row.sampled_data);
            assert_eq!(row.sampling_percent, 0.0);
            assert_eq!(row.sample_size, 0);
            assert_eq!(row.sample_space, 0);
        }
    }

    #[test]
    fn test_sampled_percent() {
        let p = sampled(payload("1", &[("20230101", "5")]), "201000", "220000");
        let table = flatten(&[p]).unwrap().unwrap();
        let row = &table.rows[0];
        assert!(row.sampled_data);
        assert_eq!(row.sample_size, 201000);
        assert_eq!(row.sample_space, 220000);
        assert_eq!(row.sampling_percent, 91.36);
    }

    #[test]
    fn test_unsampled_flag_ignores_sample_stats() {
        let mut p = sampled(payload("1", &[("20230101", "5")]), "201000", "220000");
        p.contains_sampled_data = Some(json!(false));
        let table = flatten(&[p]).unwrap().unwrap();
        let row = &table.rows[0];
        assert!(!row.sampled_data);
        assert_eq!(row.sample_size, 0);
        assert_eq!(row.sample_space, 0);
        assert_eq!(row.sampling_percent, 0.0);
        assert_eq!(crate::sink::row_cells(row)[6], "0.00");
    }

    #[test]
    fn test_zero_sample_space_falls_back() {
        let p = sampled(payload("1", &[("20230101", "5")]), "201000", "0");
        let table = flatten(&[p]).unwrap().unwrap();
        assert!(table.rows[0].sampled_data);
        assert_eq!(table.rows[0].sampling_percent, 0.0);
    }

    #[test]
    fn test_date_is_normalized() {
        let table = flatten(&[payload("1", &[("20230115", "3")])])
            .unwrap()
            .unwrap();
        assert_eq!(table.rows[0].date.to_string(), "2023-01-15");
        assert_eq!(table.rows[0].dimension_value, "3");
    }

    #[test]
    fn test_stable_sort_across_payloads() {
        let p1 = payload("P1", &[("20230102", "a"), ("20230101", "b")]);
        let p2 = payload("P2", &[("20230101", "c")]);
        let table = flatten(&[p1, p2]).unwrap().unwrap();

        let got: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.date, r.profile_id.as_str(), r.dimension_value.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (date("2023-01-01"), "P1", "b"),
                (date("2023-01-01"), "P2", "c"),
                (date("2023-01-02"), "P1", "a"),
            ]
        );
    }

    #[test]
    fn test_source_index_is_pre_sort_position() {
        let p1 = payload("P1", &[("20230103", "a"), ("bad", "x"), ("20230101", "b")]);
        let p2 = payload("P2", &[("20230102", "c")]);
        let table = flatten(&[p1, p2]).unwrap().unwrap();

        let got: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.dimension_value.as_str(), r.source_index))
            .collect();
        // skipped rows take no position
        assert_eq!(got, vec![("b", 1), ("c", 2), ("a", 0)]);
    }

    #[test]
    fn test_payload_without_rows_contributes_nothing() {
        let mut empty = payload("2", &[]);
        empty.rows = None;
        let table = flatten(&[payload("1", &[("20230101", "5")]), empty])
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 1);

        let mut only_empty = payload("3", &[]);
        only_empty.rows = None;
        let table = flatten(&[only_empty]).unwrap().unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 11);
    }

    #[test]
    fn test_columns_from_first_payload() {
        let mut second = payload("2", &[("20230101", "1")]);
        second.column_headers = vec![header("ga:date"), header("ga:users")];
        let table = flatten(&[payload("1", &[("20230101", "5")]), second])
            .unwrap()
            .unwrap();
        assert_eq!(
            table.columns(),
            vec![
                "date",
                "sessions",
                "querysamplinglevel",
                "sampleddata",
                "samplesize",
                "samplespace",
                "sampling_perc",
                "accountid",
                "webpropertyid",
                "profileid",
                "tableid",
            ]
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_value_is_literal_index_one() {
        // date in the second column: index 1 is the date string itself
        let mut p = payload("1", &[]);
        p.column_headers = vec![header("ga:sessions"), header("ga:date")];
        p.rows = Some(vec![vec!["9".into(), "20230105".into()]]);
        let table = flatten(&[p]).unwrap().unwrap();
        assert_eq!(table.rows[0].date, date("2023-01-05"));
        assert_eq!(table.rows[0].dimension_value, "20230105");
    }

    #[test]
    fn test_rows_without_date_are_skipped() {
        let p = payload("1", &[("2023-01-01", "5"), ("20230102", "6")]);
        let table = flatten(&[p]).unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].date, date("2023-01-02"));
    }

    #[test]
    fn test_wider_reports_are_rejected() {
        let mut p = payload("1", &[]);
        p.column_headers = vec![header("ga:date"), header("ga:country"), header("ga:sessions")];
        assert!(matches!(
            flatten(&[p]),
            Err(UpstreamError::UnsupportedShape { found: 3, .. })
        ));
    }

    #[test]
    fn test_metadata_copied_to_every_row() {
        let p = sampled(
            payload("12906114", &[("20230102", "5"), ("20230101", "6")]),
            "201000",
            "220000",
        );
        let table = flatten(&[p]).unwrap().unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows[0].date < table.rows[1].date);
        for row in &table.rows {
            assert_eq!(row.query_sampling_level, "HIGHER_PRECISION");
            assert_eq!(row.account_id, "126375");
            assert_eq!(row.web_property_id, "UA-126375-31");
            assert_eq!(row.profile_id, "12906114");
            assert_eq!(row.table_id, "ga:12906114");
            assert_eq!(row.sampling_percent, 91.36);
        }
    }

    #[test]
    fn test_truthy_coercion() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&Value::Null)));
        assert!(!truthy(Some(&json!("false"))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&json!(0))));
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!("true"))));
        assert!(truthy(Some(&json!(1))));
    }
}

// src/fetch/v4.rs
//! Reporting API v4 (`reports:batchGet`) request bodies, and conversion of its
//! responses into the v3 payload shape the flattener reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::schema::{ColumnHeader, ProfileInfo, QueryEcho, ReportPayload, ReportQuery};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub report_requests: Vec<ReportRequestBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequestBody {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    pub sampling_level: String,
    pub include_empty_rows: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct Metric {
    pub expression: String,
}

#[derive(Debug, Serialize)]
pub struct Dimension {
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct BatchGetResponse {
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub column_header: V4ColumnHeader,
    #[serde(default)]
    pub data: ReportData,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct V4ColumnHeader {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metric_header: MetricHeader,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeader {
    #[serde(default)]
    pub metric_header_entries: Vec<MetricHeaderEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MetricHeaderEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default)]
    pub rows: Option<Vec<ReportRow>>,
    #[serde(default)]
    pub samples_read_counts: Option<Vec<Value>>,
    #[serde(default)]
    pub sampling_space_sizes: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeValues {
    #[serde(default)]
    pub values: Vec<String>,
}

pub fn batch_get_body(query: &ReportQuery) -> BatchGetRequest {
    BatchGetRequest {
        report_requests: vec![ReportRequestBody {
            view_id: query.view_id.clone(),
            date_ranges: vec![DateRange {
                start_date: query.start_date.clone(),
                end_date: query.end_date.clone(),
            }],
            metrics: vec![Metric {
                expression: query.metric_expression.clone(),
            }],
            dimensions: vec![Dimension {
                name: query.dimension_name.clone(),
            }],
            sampling_level: query.sampling_level.clone(),
            include_empty_rows: true,
        }],
    }
}

/// Convert the first report of a batchGet response.
///
/// v4 carries no profile info; the view id fills `profileId`/`tableId` and
/// the requester backfills account and web property from the profile.
pub fn into_payload(
    response: BatchGetResponse,
    query: &ReportQuery,
) -> Result<ReportPayload, UpstreamError> {
    let report = response
        .reports
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::MissingReport {
            view_id: query.view_id.clone(),
        })?;

    let dimension_headers = report.column_header.dimensions.into_iter().map(|name| ColumnHeader {
        name,
        column_type: Some("DIMENSION".to_string()),
        data_type: Some("STRING".to_string()),
    });
    let metric_headers = report
        .column_header
        .metric_header
        .metric_header_entries
        .into_iter()
        .map(|m| ColumnHeader {
            name: m.name,
            column_type: Some("METRIC".to_string()),
            data_type: m.ty,
        });
    let column_headers = dimension_headers.chain(metric_headers).collect();

    let rows = report.data.rows.map(|rows| {
        rows.into_iter()
            .map(|row| {
                let mut values = row.dimensions;
                if let Some(first_range) = row.metrics.into_iter().next() {
                    values.extend(first_range.values);
                }
                values
            })
            .collect()
    });

    let first = |v: Option<Vec<Value>>| v.and_then(|v| v.into_iter().next());
    let contains_sampled = report.data.samples_read_counts.is_some();

    Ok(ReportPayload {
        column_headers,
        rows,
        profile_info: ProfileInfo {
            account_id: String::new(),
            web_property_id: String::new(),
            profile_id: query.view_id.clone(),
            table_id: format!("ga:{}", query.view_id),
        },
        query: QueryEcho {
            sampling_level: Some(query.sampling_level.clone()),
        },
        contains_sampled_data: Some(Value::Bool(contains_sampled)),
        sample_size: first(report.data.samples_read_counts),
        sample_space: first(report.data.sampling_space_sizes),
    })
}

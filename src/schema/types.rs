// src/schema/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns;

/// One entry of the management account listing.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A queryable analytics view.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct Profile {
    pub account_id: String,
    pub web_property_id: String,
    pub view_id: String,
    pub view_name: String,
}

/// Parameters of a single report request.
#[derive(Debug, Serialize, PartialEq, Clone, Eq)]
pub struct ReportQuery {
    pub view_id: String,
    pub start_date: String,
    pub end_date: String,
    pub metric_expression: String,
    pub dimension_name: String,
    pub sampling_level: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub web_property_id: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub table_id: String,
}

/// The echo of the request parameters inside a report response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryEcho {
    #[serde(default)]
    pub sampling_level: Option<String>,
}

/// Raw report response, in the v3 `data.ga` shape.
///
/// Sampling fields stay as raw JSON values: the API sends them as strings,
/// but nothing guarantees it, and the flattener decides how to coerce them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    #[serde(default)]
    pub column_headers: Vec<ColumnHeader>,
    #[serde(default)]
    pub rows: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub profile_info: ProfileInfo,
    #[serde(default)]
    pub query: QueryEcho,
    #[serde(default)]
    pub contains_sampled_data: Option<Value>,
    #[serde(default)]
    pub sample_size: Option<Value>,
    #[serde(default)]
    pub sample_space: Option<Value>,
}

/// One output record of the flattener.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub dimension_value: String,
    pub query_sampling_level: String,
    pub sampled_data: bool,
    pub sample_size: i64,
    pub sample_space: i64,
    pub sampling_percent: f64,
    pub account_id: String,
    pub web_property_id: String,
    pub profile_id: String,
    pub table_id: String,
    /// Position among kept rows before the date sort; the Postgres `data` column.
    pub source_index: i64,
}

/// Date-sorted output of the flattener, ready for a sink.
#[derive(Debug, PartialEq, Clone)]
pub struct ResultTable {
    /// Header names of the first payload, namespace prefix stripped.
    pub report_columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl ResultTable {
    /// Report columns followed by the fixed metadata trailer.
    pub fn columns(&self) -> Vec<String> {
        self.report_columns
            .iter()
            .cloned()
            .chain(columns::TRAILER.iter().map(|c| c.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

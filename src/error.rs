// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Missing or malformed settings. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path:?} as JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("parsing {path:?} as YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("missing setting `{0}`")]
    Missing(&'static str),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Failures talking to the analytics API, or payloads we cannot use. Always fatal.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("report for view {view_id} at sampling level {sampling_level} failed: {source}")]
    Report {
        view_id: String,
        sampling_level: String,
        #[source]
        source: Box<UpstreamError>,
    },
    #[error("batchGet for view {view_id} returned no report")]
    MissingReport { view_id: String },
    #[error("report has {found} columns ({columns}); only one dimension and one metric are supported")]
    UnsupportedShape { found: usize, columns: String },
}

/// Everything that can abort the extract half of a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Failures while persisting a table. Caught at the sink boundary and reported.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("resolving {host}: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no address found for {0}")]
    NoAddress(String),
    #[error("building connection url: {0}")]
    Url(#[from] url::ParseError),
    #[error("sql: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("duckdb: {0}")]
    Duck(#[from] duckdb::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

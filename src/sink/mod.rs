// src/sink/mod.rs
//! Destinations for a flattened report table.

pub mod csv;
pub mod parquet;
pub mod sql;

use async_trait::async_trait;
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{DbEngine, Settings};
use crate::duck::DuckDbSink;
use crate::error::{ConfigError, SinkError};
use crate::schema::{NormalizedRow, ResultTable};

/// Rows per insert statement. Bounds statement size only; chunks are not
/// wrapped in a shared transaction.
pub const CHUNK_SIZE: usize = 100;

/// Elapsed seconds on success. The caller reports either way; nothing retries.
pub type SinkOutcome = Result<f64, SinkError>;

#[async_trait]
pub trait Sink: Send + Sync {
    /// Human-readable destination, for log lines and the final message.
    fn describe(&self) -> String;

    async fn write(&self, table: &ResultTable) -> SinkOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// The `DBConfig` table (Postgres, Redshift or DuckDB).
    Warehouse,
    Csv,
    Parquet,
}

/// Pick the destination. Only the warehouse needs `DBConfig`.
pub fn build_sink(
    kind: SinkKind,
    settings: &Settings,
    output: Option<PathBuf>,
) -> Result<Box<dyn Sink>, ConfigError> {
    let sink: Box<dyn Sink> = match kind {
        SinkKind::Warehouse => {
            let db = settings.db()?;
            match db.engine {
                DbEngine::DuckDb => Box::new(DuckDbSink::new(db)),
                DbEngine::Postgres | DbEngine::Redshift => {
                    Box::new(sql::WarehouseSink::new(db.clone()))
                }
            }
        }
        SinkKind::Csv => Box::new(output.map(csv::CsvSink::new).unwrap_or_default()),
        SinkKind::Parquet => Box::new(output.map(parquet::ParquetSink::new).unwrap_or_default()),
    };
    Ok(sink)
}

/// Seconds since `start`, rounded to two decimals.
pub fn elapsed_secs(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100.0).round() / 100.0
}

/// Storage type of each output column, in [`ResultTable::columns`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Text,
    Bool,
    BigInt,
    Double,
}

pub const ROW_KINDS: [ColumnKind; 11] = [
    ColumnKind::Date,   // date
    ColumnKind::Text,   // report value
    ColumnKind::Text,   // querysamplinglevel
    ColumnKind::Bool,   // sampleddata
    ColumnKind::BigInt, // samplesize
    ColumnKind::BigInt, // samplespace
    ColumnKind::Double, // sampling_perc
    ColumnKind::Text,   // accountid
    ColumnKind::Text,   // webpropertyid
    ColumnKind::Text,   // profileid
    ColumnKind::Text,   // tableid
];

impl ColumnKind {
    pub fn sql_type(self, engine: DbEngine) -> &'static str {
        match (self, engine) {
            (ColumnKind::Date, _) => "DATE",
            (ColumnKind::Text, DbEngine::Postgres) => "TEXT",
            (ColumnKind::Text, DbEngine::Redshift) => "VARCHAR(65535)",
            (ColumnKind::Text, DbEngine::DuckDb) => "VARCHAR",
            (ColumnKind::Bool, _) => "BOOLEAN",
            (ColumnKind::BigInt, _) => "BIGINT",
            (ColumnKind::Double, DbEngine::DuckDb) => "DOUBLE",
            (ColumnKind::Double, _) => "DOUBLE PRECISION",
        }
    }
}

/// Column names paired with their storage kinds.
pub fn typed_columns(table: &ResultTable) -> Vec<(String, ColumnKind)> {
    table.columns().into_iter().zip(ROW_KINDS).collect()
}

/// A row as text cells, for delimited output.
pub fn row_cells(row: &NormalizedRow) -> [String; 11] {
    [
        row.date.format("%Y-%m-%d").to_string(),
        row.dimension_value.clone(),
        row.query_sampling_level.clone(),
        row.sampled_data.to_string(),
        row.sample_size.to_string(),
        row.sample_space.to_string(),
        format!("{:.2}", row.sampling_percent),
        row.account_id.clone(),
        row.web_property_id.clone(),
        row.profile_id.clone(),
        row.table_id.clone(),
    ]
}

// src/sink/parquet.rs

use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use super::{elapsed_secs, typed_columns, ColumnKind, Sink, SinkOutcome};
use crate::error::SinkError;
use crate::schema::{NormalizedRow, ResultTable};

pub const DEFAULT_PARQUET_PATH: &str = "google_analytics.parquet";

/// Snappy-compressed Parquet, one row group per write.
pub struct ParquetSink {
    path: PathBuf,
}

impl ParquetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ParquetSink {
    fn default() -> Self {
        Self::new(DEFAULT_PARQUET_PATH)
    }
}

fn data_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Date => DataType::Date32,
        ColumnKind::Text => DataType::Utf8,
        ColumnKind::Bool => DataType::Boolean,
        ColumnKind::BigInt => DataType::Int64,
        ColumnKind::Double => DataType::Float64,
    }
}

fn text(rows: &[NormalizedRow], f: impl Fn(&NormalizedRow) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
}

pub fn to_record_batch(table: &ResultTable) -> Result<RecordBatch, SinkError> {
    let fields: Vec<Field> = typed_columns(table)
        .into_iter()
        .map(|(name, kind)| Field::new(name, data_type(kind), false))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let rows = &table.rows;
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| Date32Type::from_naive_date(r.date)),
        )),
        text(rows, |r| r.dimension_value.as_str()),
        text(rows, |r| r.query_sampling_level.as_str()),
        Arc::new(BooleanArray::from(
            rows.iter().map(|r| r.sampled_data).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.sample_size))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.sample_space))),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.sampling_percent),
        )),
        text(rows, |r| r.account_id.as_str()),
        text(rows, |r| r.web_property_id.as_str()),
        text(rows, |r| r.profile_id.as_str()),
        text(rows, |r| r.table_id.as_str()),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn write_parquet(path: &Path, table: &ResultTable) -> Result<(), SinkError> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[async_trait]
impl Sink for ParquetSink {
    fn describe(&self) -> String {
        format!("parquet file {}", self.path.display())
    }

    #[instrument(level = "info", skip(self, table), fields(path = %self.path.display(), rows = table.len()))]
    async fn write(&self, table: &ResultTable) -> SinkOutcome {
        let start = Instant::now();
        write_parquet(&self.path, table)?;
        let secs = elapsed_secs(start);
        info!(secs, "parquet written");
        Ok(secs)
    }
}

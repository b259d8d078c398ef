// src/sink/csv.rs

use async_trait::async_trait;
use csv::{QuoteStyle, WriterBuilder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument};

use super::{elapsed_secs, row_cells, Sink, SinkOutcome};
use crate::error::SinkError;
use crate::schema::ResultTable;

pub const DEFAULT_CSV_PATH: &str = "google_analytics.csv";

/// `;`-delimited UTF-8 with a header row and every field quoted.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new(DEFAULT_CSV_PATH)
    }
}

/// Write `table` to `path`, truncating any existing file.
pub fn write_csv(path: &Path, table: &ResultTable) -> Result<(), SinkError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Always)
        .from_path(path)?;
    writer.write_record(table.columns())?;
    for row in &table.rows {
        writer.write_record(row_cells(row))?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl Sink for CsvSink {
    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }

    #[instrument(level = "info", skip(self, table), fields(path = %self.path.display(), rows = table.len()))]
    async fn write(&self, table: &ResultTable) -> SinkOutcome {
        let start = Instant::now();
        write_csv(&self.path, table)?;
        let secs = elapsed_secs(start);
        info!(secs, "csv written");
        Ok(secs)
    }
}

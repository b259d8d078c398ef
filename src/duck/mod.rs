// src/duck/mod.rs
//! DuckDB as a local file warehouse.

use async_trait::async_trait;
use duckdb::{Connection, ToSql};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::{DbEngine, DbSettings};
use crate::error::SinkError;
use crate::schema::ResultTable;
use crate::sink::sql::{qualified, replace_statements};
use crate::sink::{elapsed_secs, typed_columns, Sink, SinkOutcome, CHUNK_SIZE};

/// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db(path: &str) -> Result<Connection, duckdb::Error> {
    Connection::open(path)
}

/// Drop and recreate `schema.table`, then append the rows in chunks.
pub fn replace_table(
    conn: &Connection,
    schema: &str,
    table_name: &str,
    table: &ResultTable,
) -> Result<(), duckdb::Error> {
    let columns = typed_columns(table);
    let ddl = replace_statements(DbEngine::DuckDb, schema, table_name, &columns);
    conn.execute_batch(&format!("{};", ddl.join(";\n")))?;

    let mut appender = conn.appender_to_db(table_name, schema)?;
    for (n, chunk) in table.rows.chunks(CHUNK_SIZE).enumerate() {
        appender.append_rows(chunk.iter().map(|row| {
            [
                &row.date as &dyn ToSql,
                &row.dimension_value as &dyn ToSql,
                &row.query_sampling_level as &dyn ToSql,
                &row.sampled_data as &dyn ToSql,
                &row.sample_size as &dyn ToSql,
                &row.sample_space as &dyn ToSql,
                &row.sampling_percent as &dyn ToSql,
                &row.account_id as &dyn ToSql,
                &row.web_property_id as &dyn ToSql,
                &row.profile_id as &dyn ToSql,
                &row.table_id as &dyn ToSql,
            ]
        }))?;
        appender.flush()?;
        debug!(chunk = n, rows = chunk.len(), "appended");
    }
    Ok(())
}

pub struct DuckDbSink {
    path: PathBuf,
    schema: String,
    table: String,
}

impl DuckDbSink {
    pub fn new(db: &DbSettings) -> Self {
        Self {
            path: PathBuf::from(&db.database),
            schema: db.schema.clone(),
            table: db.table.clone(),
        }
    }
}

#[async_trait]
impl Sink for DuckDbSink {
    fn describe(&self) -> String {
        format!(
            "duckdb table {}.{} in {}",
            self.schema,
            self.table,
            self.path.display()
        )
    }

    #[instrument(
        level = "info",
        skip(self, table),
        fields(path = %self.path.display(), target = %qualified(&self.schema, &self.table), rows = table.len())
    )]
    async fn write(&self, table: &ResultTable) -> SinkOutcome {
        let start = Instant::now();
        let path = self.path.to_string_lossy().into_owned();
        let schema = self.schema.clone();
        let table_name = self.table.clone();
        let table = table.clone();

        tokio::task::spawn_blocking(move || -> Result<(), duckdb::Error> {
            let conn = open_disk_db(&path)?;
            replace_table(&conn, &schema, &table_name, &table)
        })
        .await??;

        let secs = elapsed_secs(start);
        info!(secs, "table replaced");
        Ok(secs)
    }
}

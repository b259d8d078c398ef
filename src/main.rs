// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use gascraper::{
    config::Settings,
    fetch::HttpAnalyticsClient,
    pipeline,
    sink::{build_sink, SinkKind},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Extract a Google Analytics report into a warehouse table or a file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Settings document (JSON, or YAML by extension).
    #[arg(long, env = "GASCRAPER_CONFIG", default_value = "setup.json")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = SinkKind::Warehouse)]
    sink: SinkKind,

    /// Output file for the csv and parquet sinks.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gascraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    info!(config = %args.config.display(), sink = ?args.sink, "startup");

    // ─── 2) settings and destination ─────────────────────────────────
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let sink = build_sink(args.sink, &settings, args.output)?;

    // ─── 3) extract ──────────────────────────────────────────────────
    let client = HttpAnalyticsClient::connect(&settings).await?;
    let Some(table) = pipeline::extract(&client, &settings).await? else {
        info!("no data fetched; nothing to write");
        return Ok(ExitCode::SUCCESS);
    };

    // ─── 4) load ─────────────────────────────────────────────────────
    info!(destination = %sink.describe(), rows = table.len(), "writing");
    match sink.write(&table).await {
        Ok(secs) => {
            println!("success: wrote {} rows to {} in {}s", table.len(), sink.describe(), secs);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "write failed");
            println!("failure: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

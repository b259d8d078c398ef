// src/bin/list_profiles.rs
//! Authenticate and print the views the configured query would cover, as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use gascraper::{config::Settings, fetch::resolve_profiles, fetch::HttpAnalyticsClient};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(about = "List the Analytics views matched by the query settings")]
struct Args {
    #[arg(long, env = "GASCRAPER_CONFIG", default_value = "setup.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let client = HttpAnalyticsClient::connect(&settings).await?;

    let q = &settings.query;
    let profiles = resolve_profiles(
        &client,
        q.account_id.as_deref(),
        &q.web_property_id,
        q.profile_id.as_deref(),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}

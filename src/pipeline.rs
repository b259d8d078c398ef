// src/pipeline.rs

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::fetch::{query_reports, resolve_profiles, AnalyticsApi, ReportRequest};
use crate::process::flatten;
use crate::schema::ResultTable;

/// Resolve profiles, request every report and flatten them into one table.
///
/// `None` when there was nothing to fetch (no profiles, or no payloads).
pub async fn extract<A: AnalyticsApi + ?Sized>(
    api: &A,
    settings: &Settings,
) -> Result<Option<ResultTable>, PipelineError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("extract", %run_id, api = settings.api.tag());

    async move {
        let q = &settings.query;
        let profiles = resolve_profiles(
            api,
            q.account_id.as_deref(),
            &q.web_property_id,
            q.profile_id.as_deref(),
        )
        .await?;

        let request = ReportRequest::from_settings(settings);
        let payloads = query_reports(api, &profiles, &request).await?;
        let table = flatten(&payloads)?;

        match &table {
            Some(t) => info!(rows = t.len(), columns = t.columns().len(), "extracted"),
            None => info!("nothing to extract"),
        }
        Ok::<_, PipelineError>(table)
    }
    .instrument(span)
    .await
}

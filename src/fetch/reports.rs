// src/fetch/reports.rs

use tracing::{debug, info, instrument};

use super::AnalyticsApi;
use crate::config::Settings;
use crate::error::UpstreamError;
use crate::schema::{Profile, ReportPayload, ReportQuery};

/// What to ask for, independent of which view it is asked of.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub start_date: String,
    pub end_date: String,
    pub metrics: String,
    pub dimensions: String,
    pub sampling_levels: Vec<String>,
}

impl ReportRequest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            start_date: settings.query.start.trim().to_string(),
            end_date: settings.query.end.trim().to_string(),
            metrics: settings.query.metrics.trim().to_string(),
            dimensions: settings.query.dimensions.trim().to_string(),
            sampling_levels: settings.sampling_levels(),
        }
    }

    pub fn query_for(&self, profile: &Profile, sampling_level: &str) -> ReportQuery {
        ReportQuery {
            view_id: profile.view_id.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            metric_expression: self.metrics.clone(),
            dimension_name: self.dimensions.clone(),
            sampling_level: sampling_level.trim().to_string(),
        }
    }
}

/// Fill profile fields the API left out (v4 responses carry none).
fn backfill(payload: &mut ReportPayload, profile: &Profile) {
    let info = &mut payload.profile_info;
    if info.account_id.is_empty() {
        info.account_id = profile.account_id.clone();
    }
    if info.web_property_id.is_empty() {
        info.web_property_id = profile.web_property_id.clone();
    }
    if info.profile_id.is_empty() {
        info.profile_id = profile.view_id.clone();
    }
    if info.table_id.is_empty() {
        info.table_id = format!("ga:{}", profile.view_id);
    }
}

/// One report per (profile, sampling level), profile-major. The first
/// failure aborts the whole run and names the view and level that failed.
#[instrument(level = "info", skip(api, profiles, request), fields(profiles = profiles.len(), levels = request.sampling_levels.len()))]
pub async fn query_reports<A: AnalyticsApi + ?Sized>(
    api: &A,
    profiles: &[Profile],
    request: &ReportRequest,
) -> Result<Vec<ReportPayload>, UpstreamError> {
    let mut payloads = Vec::with_capacity(profiles.len() * request.sampling_levels.len());

    for profile in profiles {
        debug!(view = %profile.view_id, "querying profile");
        for level in &request.sampling_levels {
            let query = request.query_for(profile, level);
            debug!(view = %query.view_id, sampling_level = %query.sampling_level, "requesting report");

            let mut payload =
                api.get_report(&query)
                    .await
                    .map_err(|source| UpstreamError::Report {
                        view_id: query.view_id.clone(),
                        sampling_level: query.sampling_level.clone(),
                        source: Box::new(source),
                    })?;
            backfill(&mut payload, profile);
            payloads.push(payload);
        }
    }

    info!(reports = payloads.len(), "reports fetched");
    Ok(payloads)
}

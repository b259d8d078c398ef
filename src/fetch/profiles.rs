// src/fetch/profiles.rs

use tracing::{info, instrument, warn};

use super::AnalyticsApi;
use crate::error::UpstreamError;
use crate::schema::Profile;

/// List the views of `(account_id, web_property_id)`, optionally narrowed to
/// `profile_id`.
///
/// Without an account id the **first** account the API lists is used; there
/// is no notion of a best account. No accounts means no profiles.
#[instrument(level = "info", skip(api))]
pub async fn resolve_profiles<A: AnalyticsApi + ?Sized>(
    api: &A,
    account_id: Option<&str>,
    web_property_id: &str,
    profile_id: Option<&str>,
) -> Result<Vec<Profile>, UpstreamError> {
    let account_id = match account_id {
        Some(id) => id.to_string(),
        None => match api.list_accounts().await?.into_iter().next() {
            Some(first) => {
                info!(account = %first.id, name = %first.name, "no account configured, using the first listed");
                first.id
            }
            None => {
                warn!("no accounts visible to this service account");
                return Ok(Vec::new());
            }
        },
    };

    let mut profiles = api.list_profiles(&account_id, web_property_id).await?;
    if let Some(wanted) = profile_id {
        profiles.retain(|p| p.view_id == wanted);
    }

    if profiles.is_empty() {
        warn!(account = %account_id, "no matching profiles");
    } else {
        info!(count = profiles.len(), "resolved profiles");
    }
    Ok(profiles)
}

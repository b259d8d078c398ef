// src/fetch/client.rs

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use super::{auth::ServiceAccount, v4, AnalyticsApi};
use crate::config::{ApiVersion, Settings};
use crate::error::{ConfigError, PipelineError, UpstreamError};
use crate::schema::{Account, Profile, ReportPayload, ReportQuery};

/// Read a response body, turning non-2xx statuses and bad JSON into errors
/// that name the URL.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    url: &str,
    resp: Response,
) -> Result<T, UpstreamError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|source| UpstreamError::Http {
        url: url.to_string(),
        source,
    })?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }
    serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
        url: url.to_string(),
        source,
    })
}

/// `root` + path segments, each percent-encoded as needed.
pub fn endpoint(root: &Url, segments: &[&str]) -> Url {
    let mut url = root.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileItem {
    id: String,
    #[serde(default)]
    account_id: String,
    #[serde(default)]
    web_property_id: String,
    #[serde(default)]
    name: String,
}

impl From<ProfileItem> for Profile {
    fn from(item: ProfileItem) -> Self {
        Profile {
            account_id: item.account_id,
            web_property_id: item.web_property_id,
            view_id: item.id,
            view_name: item.name,
        }
    }
}

/// Analytics API over HTTPS with a bearer token.
pub struct HttpAnalyticsClient {
    http: Client,
    token: String,
    api: ApiVersion,
    api_root: Url,
    management_root: Url,
}

fn root_error(e: url::ParseError) -> ConfigError {
    ConfigError::Invalid {
        key: "Config.discoveryServiceUrl",
        reason: e.to_string(),
    }
}

impl HttpAnalyticsClient {
    /// Authenticate with the configured service account and build a client.
    #[instrument(level = "info", skip(settings), fields(api = settings.api.tag()))]
    pub async fn connect(settings: &Settings) -> Result<Self, PipelineError> {
        let account = ServiceAccount::from_credentials(&settings.credentials)?;
        let http = Client::new();
        let token = account
            .fetch_token(&http, &settings.credentials.scopes)
            .await?;
        info!(service = settings.api.service_name(), "authenticated");
        Ok(Self::with_token(http, token.access_token, settings.api.clone())?)
    }

    pub fn with_token(
        http: Client,
        token: impl Into<String>,
        api: ApiVersion,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api_root: api.api_root().map_err(root_error)?,
            management_root: api.management_root().map_err(root_error)?,
            http,
            token: token.into(),
            api,
        })
    }

    pub fn accounts_url(&self) -> Url {
        endpoint(&self.management_root, &["management", "accounts"])
    }

    pub fn profiles_url(&self, account_id: &str, web_property_id: &str) -> Url {
        endpoint(
            &self.management_root,
            &[
                "management",
                "accounts",
                account_id,
                "webproperties",
                web_property_id,
                "profiles",
            ],
        )
    }

    /// v3 `data/ga` query URL.
    pub fn data_url(&self, query: &ReportQuery) -> Url {
        let mut url = endpoint(&self.api_root, &["data", "ga"]);
        url.query_pairs_mut()
            .append_pair("ids", &format!("ga:{}", query.view_id))
            .append_pair("start-date", &query.start_date)
            .append_pair("end-date", &query.end_date)
            .append_pair("metrics", &query.metric_expression)
            .append_pair("dimensions", &query.dimension_name)
            .append_pair("include-empty-rows", "true")
            .append_pair("samplingLevel", &query.sampling_level);
        url
    }

    pub fn batch_get_url(&self) -> Url {
        endpoint(&self.api_root, &["reports:batchGet"])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, UpstreamError> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| UpstreamError::Http {
                url: url.to_string(),
                source,
            })?;
        decode_response(url.as_str(), resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, UpstreamError> {
        debug!(%url, "POST");
        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|source| UpstreamError::Http {
                url: url.to_string(),
                source,
            })?;
        decode_response(url.as_str(), resp).await
    }
}

#[async_trait]
impl AnalyticsApi for HttpAnalyticsClient {
    async fn list_accounts(&self) -> Result<Vec<Account>, UpstreamError> {
        let listing: Listing<Account> = self.get_json(self.accounts_url()).await?;
        Ok(listing.items)
    }

    async fn list_profiles(
        &self,
        account_id: &str,
        web_property_id: &str,
    ) -> Result<Vec<Profile>, UpstreamError> {
        let listing: Listing<ProfileItem> = self
            .get_json(self.profiles_url(account_id, web_property_id))
            .await?;
        Ok(listing.items.into_iter().map(Profile::from).collect())
    }

    #[instrument(
        level = "debug",
        skip(self, query),
        fields(view = %query.view_id, sampling_level = %query.sampling_level)
    )]
    async fn get_report(&self, query: &ReportQuery) -> Result<ReportPayload, UpstreamError> {
        match self.api {
            ApiVersion::V3 { .. } => self.get_json(self.data_url(query)).await,
            ApiVersion::V4 { .. } => {
                let response: v4::BatchGetResponse = self
                    .post_json(self.batch_get_url(), &v4::batch_get_body(query))
                    .await?;
                v4::into_payload(response, query)
            }
        }
    }
}

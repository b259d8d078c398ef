// src/config/setup.rs
//! Raw shape of the settings document, as written by hand in `setup.json`.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::ConfigError;

/// A setting that may be written as `"A"` or `["A", "B"]`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Trimmed values in document order; blanks dropped.
    pub fn into_trimmed(self) -> Vec<String> {
        let values = match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        };
        values
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PortSetting {
    Number(u16),
    Text(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct SetupDocument {
    #[serde(rename = "Config")]
    pub config: RawConfig,
    #[serde(rename = "Query")]
    pub query: RawQuery,
    #[serde(rename = "DBConfig", default)]
    pub db: Option<RawDbConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawConfig {
    pub version: Option<String>,
    #[serde(rename = "serviceName_v3")]
    pub service_name_v3: Option<String>,
    #[serde(rename = "serviceName_v4")]
    pub service_name_v4: Option<String>,
    #[serde(rename = "discoveryServiceUrl_v3")]
    pub discovery_service_url_v3: Option<String>,
    #[serde(rename = "discoveryServiceUrl_v4")]
    pub discovery_service_url_v4: Option<String>,
    #[serde(rename = "samplingLevel_v3")]
    pub sampling_level_v3: Option<OneOrMany>,
    #[serde(rename = "samplingLevel_v4")]
    pub sampling_level_v4: Option<OneOrMany>,
    pub service_account_email: Option<String>,
    pub key_file_location: Option<String>,
    pub scope: Option<OneOrMany>,
    pub token_uri: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawQuery {
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    #[serde(rename = "webPropertyId")]
    pub web_property_id: Option<String>,
    pub profile: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub metrics: Option<String>,
    pub dimensions: Option<String>,
    #[serde(rename = "samplingLevel", alias = "samplingLevel_v3")]
    pub sampling_level: Option<OneOrMany>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawDbConfig {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "endPoint")]
    pub end_point: Option<String>,
    #[serde(rename = "tcpPort")]
    pub tcp_port: Option<PortSetting>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
}

impl SetupDocument {
    /// Read `path` as YAML when it ends in `.yaml`/`.yml`, JSON otherwise.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .map_or(false, |ext| {
                ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
            });
        if is_yaml {
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

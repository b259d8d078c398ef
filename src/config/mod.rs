// src/config/mod.rs

pub mod setup;

use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ConfigError;
pub use setup::{OneOrMany, PortSetting, SetupDocument};
use setup::{RawConfig, RawDbConfig, RawQuery};

/// Web-property wildcard accepted by the management API.
pub const ALL_WEB_PROPERTIES: &str = "~all";

/// Schema the warehouse table lives in unless `DBConfig.schema` says otherwise.
pub const DEFAULT_DB_SCHEMA: &str = "dw";

/// Management listings only exist in the v3 API, whatever generation reports come from.
pub const MANAGEMENT_ROOT: &str = "https://www.googleapis.com/analytics/v3/";

/// API generation, resolved once when the settings are loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiVersion {
    V3 {
        service_name: String,
        discovery_url: Url,
        default_sampling_levels: Option<Vec<String>>,
    },
    V4 {
        service_name: String,
        discovery_url: Url,
        default_sampling_levels: Option<Vec<String>>,
    },
}

impl ApiVersion {
    pub fn tag(&self) -> &'static str {
        match self {
            ApiVersion::V3 { .. } => "v3",
            ApiVersion::V4 { .. } => "v4",
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            ApiVersion::V3 { service_name, .. } | ApiVersion::V4 { service_name, .. } => {
                service_name
            }
        }
    }

    /// Sampling level used when neither the query nor the config names one.
    pub fn builtin_sampling_level(&self) -> &'static str {
        match self {
            ApiVersion::V3 { .. } => "HIGHER_PRECISION",
            ApiVersion::V4 { .. } => "LARGE",
        }
    }

    /// Query-supplied levels win, then the configured default, then the built-in one.
    pub fn sampling_levels(&self, requested: Option<&[String]>) -> Vec<String> {
        let configured = match self {
            ApiVersion::V3 {
                default_sampling_levels,
                ..
            }
            | ApiVersion::V4 {
                default_sampling_levels,
                ..
            } => default_sampling_levels.as_deref(),
        };
        requested
            .filter(|levels| !levels.is_empty())
            .or(configured.filter(|levels| !levels.is_empty()))
            .map(|levels| levels.iter().map(|l| l.trim().to_string()).collect())
            .unwrap_or_else(|| vec![self.builtin_sampling_level().to_string()])
    }

    /// Base URL report requests are issued against.
    pub fn api_root(&self) -> Result<Url, url::ParseError> {
        match self {
            ApiVersion::V3 {
                service_name,
                discovery_url,
                ..
            } => discovery_url
                .join("/")?
                .join(&format!("{}/v3/", service_name)),
            ApiVersion::V4 { discovery_url, .. } => discovery_url.join("/")?.join("v4/"),
        }
    }

    /// Base URL for account and profile listings.
    pub fn management_root(&self) -> Result<Url, url::ParseError> {
        match self {
            ApiVersion::V3 { .. } => self.api_root(),
            ApiVersion::V4 { .. } => Url::parse(MANAGEMENT_ROOT),
        }
    }
}

/// Service-account credentials used to obtain a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub service_account_email: Option<String>,
    pub key_file: PathBuf,
    pub scopes: Vec<String>,
    pub token_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub web_property_id: String,
    pub profile_id: Option<String>,
    pub start: String,
    pub end: String,
    pub metrics: String,
    pub dimensions: String,
    pub sampling_levels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Redshift,
    DuckDb,
}

impl DbEngine {
    /// Accepts SQLAlchemy-style names such as `postgresql+psycopg2` or `redshift+psycopg2`.
    pub fn parse(engine: &str) -> Result<Self, ConfigError> {
        let engine = engine.trim().to_ascii_lowercase();
        if engine.contains("redshift") {
            Ok(DbEngine::Redshift)
        } else if engine.starts_with("postgres") {
            Ok(DbEngine::Postgres)
        } else if engine == "duckdb" {
            Ok(DbEngine::DuckDb)
        } else {
            Err(ConfigError::Invalid {
                key: "DBConfig.engine",
                reason: format!("unsupported engine `{}`", engine),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbSettings {
    pub engine: DbEngine,
    pub user: String,
    pub password: String,
    pub end_point: String,
    pub tcp_port: u16,
    /// Database name, or the database file for DuckDB.
    pub database: String,
    pub table: String,
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api: ApiVersion,
    pub credentials: Credentials,
    pub query: QuerySettings,
    pub db: Option<DbSettings>,
}

impl Settings {
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let doc = SetupDocument::read(path.as_ref())?;
        let settings = Self::from_document(doc)?;
        debug!(api = settings.api.tag(), "settings loaded");
        Ok(settings)
    }

    pub fn from_document(doc: SetupDocument) -> Result<Self, ConfigError> {
        Ok(Self {
            api: api_version(&doc.config)?,
            credentials: credentials(&doc.config)?,
            query: query_settings(doc.query)?,
            db: doc.db.map(db_settings).transpose()?,
        })
    }

    /// Sampling levels the requester iterates, in order.
    pub fn sampling_levels(&self) -> Vec<String> {
        self.api.sampling_levels(self.query.sampling_levels.as_deref())
    }

    pub fn db(&self) -> Result<&DbSettings, ConfigError> {
        self.db.as_ref().ok_or(ConfigError::Missing("DBConfig"))
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_url(value: String, key: &'static str) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn api_version(raw: &RawConfig) -> Result<ApiVersion, ConfigError> {
    let version = required(raw.version.clone(), "Config.version")?;
    match version.as_str() {
        "v3" => Ok(ApiVersion::V3 {
            service_name: required(raw.service_name_v3.clone(), "Config.serviceName_v3")?,
            discovery_url: parse_url(
                required(
                    raw.discovery_service_url_v3.clone(),
                    "Config.discoveryServiceUrl_v3",
                )?,
                "Config.discoveryServiceUrl_v3",
            )?,
            default_sampling_levels: raw.sampling_level_v3.clone().map(OneOrMany::into_trimmed),
        }),
        "v4" => Ok(ApiVersion::V4 {
            service_name: required(raw.service_name_v4.clone(), "Config.serviceName_v4")?,
            discovery_url: parse_url(
                required(
                    raw.discovery_service_url_v4.clone(),
                    "Config.discoveryServiceUrl_v4",
                )?,
                "Config.discoveryServiceUrl_v4",
            )?,
            default_sampling_levels: raw.sampling_level_v4.clone().map(OneOrMany::into_trimmed),
        }),
        other => Err(ConfigError::Invalid {
            key: "Config.version",
            reason: format!("expected `v3` or `v4`, got `{}`", other),
        }),
    }
}

fn credentials(raw: &RawConfig) -> Result<Credentials, ConfigError> {
    let scopes = raw
        .scope
        .clone()
        .map(OneOrMany::into_trimmed)
        .unwrap_or_default();
    if scopes.is_empty() {
        return Err(ConfigError::Missing("Config.scope"));
    }
    Ok(Credentials {
        service_account_email: raw
            .service_account_email
            .clone()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        key_file: PathBuf::from(required(
            raw.key_file_location.clone(),
            "Config.key_file_location",
        )?),
        scopes,
        token_uri: raw.token_uri.clone(),
    })
}

/// `ga:12906114` → `12906114`.
pub fn profile_id_from(profile: &str) -> Result<String, ConfigError> {
    match profile.split_once(':') {
        Some((_, id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        _ => Err(ConfigError::Invalid {
            key: "Query.profile",
            reason: format!("expected `ga:<id>`, got `{}`", profile),
        }),
    }
}

/// Only one metric and one dimension per query are supported downstream.
fn single_expression(value: String, key: &'static str) -> Result<String, ConfigError> {
    let parts = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .count();
    if parts == 1 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!(
                "expected exactly one entry, got {} in `{}`",
                parts, value
            ),
        })
    }
}

fn query_settings(raw: RawQuery) -> Result<QuerySettings, ConfigError> {
    let profile_id = raw
        .profile
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| profile_id_from(&p))
        .transpose()?;
    Ok(QuerySettings {
        account_id: raw
            .account_id
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        account_name: raw.account_name,
        web_property_id: raw
            .web_property_id
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| ALL_WEB_PROPERTIES.to_string()),
        profile_id,
        start: required(raw.start, "Query.start")?,
        end: required(raw.end, "Query.end")?,
        metrics: single_expression(required(raw.metrics, "Query.metrics")?, "Query.metrics")?,
        dimensions: single_expression(
            required(raw.dimensions, "Query.dimensions")?,
            "Query.dimensions",
        )?,
        sampling_levels: raw.sampling_level.map(OneOrMany::into_trimmed),
    })
}

fn db_settings(raw: RawDbConfig) -> Result<DbSettings, ConfigError> {
    let engine = DbEngine::parse(&required(raw.engine, "DBConfig.engine")?)?;
    let tcp_port = match raw.tcp_port {
        Some(PortSetting::Number(p)) => p,
        Some(PortSetting::Text(t)) => t.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "DBConfig.tcpPort",
            reason: format!("`{}` is not a port number", t),
        })?,
        None if engine == DbEngine::DuckDb => 0,
        None => return Err(ConfigError::Missing("DBConfig.tcpPort")),
    };
    let (user, password, end_point) = if engine == DbEngine::DuckDb {
        (
            raw.user.unwrap_or_default(),
            raw.password.unwrap_or_default(),
            raw.end_point.unwrap_or_default(),
        )
    } else {
        (
            required(raw.user, "DBConfig.user")?,
            raw.password.unwrap_or_default(),
            required(raw.end_point, "DBConfig.endPoint")?,
        )
    };
    Ok(DbSettings {
        engine,
        user,
        password,
        end_point,
        tcp_port,
        database: required(raw.database, "DBConfig.database")?,
        table: required(raw.table, "DBConfig.table")?,
        schema: raw
            .schema
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DB_SCHEMA.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample(version: &str) -> serde_json::Value {
        json!({
            "Config": {
                "version": version,
                "serviceName_v3": "analytics",
                "discoveryServiceUrl_v3": "https://www.googleapis.com/discovery/v1/apis/analytics/v3/rest",
                "serviceName_v4": "analyticsreporting",
                "discoveryServiceUrl_v4": "https://analyticsreporting.googleapis.com/$discovery/rest?version=v4",
                "samplingLevel_v4": "LARGE",
                "service_account_email": "etl@example.iam.gserviceaccount.com",
                "key_file_location": "key.json",
                "scope": "https://www.googleapis.com/auth/analytics.readonly"
            },
            "Query": {
                "account_id": "126375",
                "account_name": "Example",
                "webPropertyId": "UA-126375-31",
                "profile": "ga:12906114",
                "start": " 2023-01-01 ",
                "end": "2023-01-31",
                "metrics": "ga:sessions",
                "dimensions": "ga:date",
                "samplingLevel": " DEFAULT "
            },
            "DBConfig": {
                "engine": "postgresql",
                "user": "etl",
                "password": "secret",
                "endPoint": "warehouse.internal",
                "tcpPort": "5432",
                "database": "analytics",
                "table": "google_analytics"
            }
        })
    }

    fn settings(value: serde_json::Value) -> Result<Settings, ConfigError> {
        let doc: SetupDocument = serde_json::from_value(value).unwrap();
        Settings::from_document(doc)
    }

    #[test]
    fn test_v3_document() {
        let s = settings(sample("v3")).unwrap();
        assert_eq!(s.api.tag(), "v3");
        assert_eq!(s.api.service_name(), "analytics");
        assert_eq!(s.query.profile_id.as_deref(), Some("12906114"));
        assert_eq!(s.query.start, "2023-01-01");
        assert_eq!(s.query.web_property_id, "UA-126375-31");
        assert_eq!(s.sampling_levels(), vec!["DEFAULT"]);
        assert_eq!(
            s.api.api_root().unwrap().as_str(),
            "https://www.googleapis.com/analytics/v3/"
        );

        let db = s.db().unwrap();
        assert_eq!(db.engine, DbEngine::Postgres);
        assert_eq!(db.tcp_port, 5432);
        assert_eq!(db.schema, DEFAULT_DB_SCHEMA);
    }

    #[test]
    fn test_v4_document() {
        let mut doc = sample("v4");
        doc["Query"]
            .as_object_mut()
            .unwrap()
            .remove("samplingLevel");
        let s = settings(doc).unwrap();
        assert_eq!(s.api.service_name(), "analyticsreporting");
        assert_eq!(s.sampling_levels(), vec!["LARGE"]);
        assert_eq!(
            s.api.api_root().unwrap().as_str(),
            "https://analyticsreporting.googleapis.com/v4/"
        );
        assert_eq!(s.api.management_root().unwrap().as_str(), MANAGEMENT_ROOT);
    }

    #[test]
    fn test_builtin_sampling_defaults() {
        let mut doc = sample("v3");
        doc["Query"]
            .as_object_mut()
            .unwrap()
            .remove("samplingLevel");
        assert_eq!(settings(doc).unwrap().sampling_levels(), vec!["HIGHER_PRECISION"]);

        let mut doc = sample("v4");
        doc["Config"]
            .as_object_mut()
            .unwrap()
            .remove("samplingLevel_v4");
        doc["Query"]
            .as_object_mut()
            .unwrap()
            .remove("samplingLevel");
        assert_eq!(settings(doc).unwrap().sampling_levels(), vec!["LARGE"]);
    }

    #[test]
    fn test_sampling_level_list_keeps_order() {
        let mut doc = sample("v3");
        doc["Query"]["samplingLevel"] = json!(["FASTER", " HIGHER_PRECISION "]);
        assert_eq!(
            settings(doc).unwrap().sampling_levels(),
            vec!["FASTER", "HIGHER_PRECISION"]
        );
    }

    #[test]
    fn test_profile_without_namespace_is_rejected() {
        assert!(matches!(
            profile_id_from("12906114"),
            Err(ConfigError::Invalid { key: "Query.profile", .. })
        ));
        assert_eq!(profile_id_from("ga:42").unwrap(), "42");
    }

    #[test]
    fn test_multiple_metrics_rejected() {
        let mut doc = sample("v3");
        doc["Query"]["metrics"] = json!("ga:sessions,ga:users");
        assert!(matches!(
            settings(doc),
            Err(ConfigError::Invalid { key: "Query.metrics", .. })
        ));

        let mut doc = sample("v3");
        doc["Query"]["dimensions"] = json!("ga:date,ga:country");
        assert!(matches!(
            settings(doc),
            Err(ConfigError::Invalid { key: "Query.dimensions", .. })
        ));
    }

    #[test]
    fn test_missing_and_unknown_version() {
        let mut doc = sample("v5");
        assert!(matches!(
            settings(doc.clone()),
            Err(ConfigError::Invalid { key: "Config.version", .. })
        ));
        doc["Config"].as_object_mut().unwrap().remove("version");
        assert!(matches!(
            settings(doc),
            Err(ConfigError::Missing("Config.version"))
        ));
    }

    #[test]
    fn test_missing_account_and_property_defaults() {
        let mut doc = sample("v3");
        let query = doc["Query"].as_object_mut().unwrap();
        query.remove("account_id");
        query.remove("webPropertyId");
        query.remove("profile");
        let s = settings(doc).unwrap();
        assert_eq!(s.query.account_id, None);
        assert_eq!(s.query.web_property_id, ALL_WEB_PROPERTIES);
        assert_eq!(s.query.profile_id, None);
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(DbEngine::parse("postgresql").unwrap(), DbEngine::Postgres);
        assert_eq!(
            DbEngine::parse("redshift+psycopg2").unwrap(),
            DbEngine::Redshift
        );
        assert_eq!(DbEngine::parse("duckdb").unwrap(), DbEngine::DuckDb);
        assert!(DbEngine::parse("oracle").is_err());
    }

    #[test]
    fn test_load_yaml_and_json_files() {
        let value = sample("v3");

        let mut json_file = NamedTempFile::with_suffix(".json").unwrap();
        json_file
            .write_all(serde_json::to_string(&value).unwrap().as_bytes())
            .unwrap();
        let from_json = Settings::load(json_file.path()).unwrap();

        let mut yaml_file = NamedTempFile::with_suffix(".yaml").unwrap();
        yaml_file
            .write_all(serde_yaml::to_string(&value).unwrap().as_bytes())
            .unwrap();
        let from_yaml = Settings::load(yaml_file.path()).unwrap();

        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Settings::load(Path::new("/nonexistent/setup.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}

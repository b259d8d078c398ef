// src/fetch/auth.rs
//! Service-account authentication: a signed JWT assertion exchanged for a
//! short-lived bearer token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, instrument};

use super::client::decode_response;
use crate::config::Credentials;
use crate::error::{ConfigError, UpstreamError};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct KeyFile {
    client_email: Option<String>,
    private_key: String,
    token_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    pub token_uri: String,
    private_key_pem: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Load the key named by `key_file_location`: a JSON service-account key,
    /// or a bare PEM private key paired with `service_account_email`.
    pub fn from_credentials(creds: &Credentials) -> Result<Self, ConfigError> {
        let path = creds.key_file.as_path();
        // PKCS#12 keys are binary; read lossily so they fail as "not a key", not as I/O.
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_key_text(creds, path, &String::from_utf8_lossy(&bytes))
    }

    fn from_key_text(creds: &Credentials, path: &Path, text: &str) -> Result<Self, ConfigError> {
        let key = if text.trim_start().starts_with('{') {
            serde_json::from_str::<KeyFile>(text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else if text.contains("-----BEGIN") {
            KeyFile {
                client_email: None,
                private_key: text.to_string(),
                token_uri: None,
            }
        } else {
            return Err(ConfigError::Invalid {
                key: "Config.key_file_location",
                reason: format!(
                    "{:?} is neither a JSON service-account key nor a PEM key; \
                     PKCS#12 (.p12) keys are not supported, create a JSON key for \
                     the service account in the Cloud console and point \
                     key_file_location at it",
                    path
                ),
            });
        };

        let client_email = creds
            .service_account_email
            .clone()
            .or(key.client_email)
            .ok_or(ConfigError::Missing("Config.service_account_email"))?;
        let token_uri = creds
            .token_uri
            .clone()
            .or(key.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client_email,
            token_uri,
            private_key_pem: key.private_key,
        })
    }

    pub fn claims(&self, scopes: &[String], now: DateTime<Utc>) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: scopes.join(" "),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    /// RS256-signed assertion for the token endpoint.
    pub fn assertion(&self, scopes: &[String], now: DateTime<Utc>) -> Result<String, UpstreamError> {
        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .map_err(|e| UpstreamError::Auth(format!("reading private key: {}", e)))?;
        encode(&Header::new(Algorithm::RS256), &self.claims(scopes, now), &key)
            .map_err(|e| UpstreamError::Auth(format!("signing assertion: {}", e)))
    }

    #[instrument(level = "info", skip(self, http), fields(email = %self.client_email))]
    pub async fn fetch_token(
        &self,
        http: &Client,
        scopes: &[String],
    ) -> Result<AccessToken, UpstreamError> {
        let assertion = self.assertion(scopes, Utc::now())?;
        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|source| UpstreamError::Http {
                url: self.token_uri.clone(),
                source,
            })?;
        let token: AccessToken = decode_response(&self.token_uri, resp).await?;
        debug!(expires_in = ?token.expires_in, "access token granted");
        Ok(token)
    }
}

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use leadscout_logging::{scout_debug, scout_info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::settings::Clock;
use crate::types::map_reqwest_error;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the server-reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("cannot read service account file {path}: {message}")]
    ReadCredential { path: PathBuf, message: String },
    #[error("invalid service account credential: {0}")]
    InvalidCredential(String),
    #[error("token request rejected: {0}")]
    Rejected(String),
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
}

/// The fields of a Google service-account JSON key file that token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let text = std::fs::read_to_string(path).map_err(|err| AuthError::ReadCredential {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|err| AuthError::InvalidCredential(err.to_string()))
    }
}

/// Source of bearer tokens for the Sheets API.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, for callers that obtained one elsewhere.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed JWT assertion for an access token and caches it until expiry.
///
/// The key file is read lazily on the first token request, so a missing or
/// malformed credential surfaces as an auth failure of the run that needs it.
pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    key_path: PathBuf,
    clock: Clock,
    key: Mutex<Option<ServiceAccountKey>>,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(client: reqwest::Client, key_path: PathBuf, clock: Clock) -> Self {
        Self {
            client,
            key_path,
            clock,
            key: Mutex::new(None),
            cached: Mutex::new(None),
        }
    }

    async fn load_key(&self) -> Result<ServiceAccountKey, AuthError> {
        let mut slot = self.key.lock().await;
        if let Some(key) = slot.as_ref() {
            return Ok(key.clone());
        }
        let key = ServiceAccountKey::from_file(&self.key_path)?;
        scout_info!("Loaded service account {}", key.client_email);
        *slot = Some(key.clone());
        Ok(key)
    }

    async fn request_token(
        &self,
        key: &ServiceAccountKey,
        now: DateTime<Utc>,
    ) -> Result<CachedToken, AuthError> {
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| AuthError::InvalidCredential(err.to_string()))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|err| AuthError::InvalidCredential(err.to_string()))?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();
        let response = self
            .client
            .post(&key.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|err| AuthError::Transport(map_reqwest_error(err).to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AuthError::Transport(map_reqwest_error(err).to_string()))?;
        if status.is_server_error() {
            return Err(AuthError::Transport(format!("token endpoint returned {status}")));
        }
        if !status.is_success() {
            let reason = serde_json::from_slice::<TokenErrorResponse>(&bytes)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or_else(|_| status.to_string());
            return Err(AuthError::Rejected(reason));
        }
        let token: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|err| AuthError::Rejected(format!("malformed token response: {err}")))?;
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        let now = (self.clock)();
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > now {
                return Ok(entry.token.clone());
            }
        }
        let key = self.load_key().await?;
        scout_debug!("Requesting access token from {}", key.token_uri);
        let fresh = self.request_token(&key, now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

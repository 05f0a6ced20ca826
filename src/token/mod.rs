//! App access token management with a read-through cache.
//!
//! The Lark Open API authenticates with a short-lived `app_access_token`.
//! [`TokenManager`] caches it in memory and in a JSON file under the
//! configured cache directory (the file doubles as a cross-worker cache;
//! concurrent refreshes are uncoordinated last-write-wins, which is
//! benign since every written token is valid). A safety buffer is
//! subtracted from the server-reported lifetime at store time, so a
//! cached token is never handed out within five minutes of its real
//! expiry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::LarkConfig;

/// Seconds subtracted from the server-reported token lifetime.
pub const TOKEN_TTL_BUFFER_SECS: i64 = 300;

/// Fixed cache file name inside the cache directory.
const CACHE_FILE: &str = "app_access_token.json";

/// HTTP connect timeout for the auth client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for the auth client.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A token-fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Transport-level failure talking to the auth endpoint.
    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth endpoint answered with a non-success HTTP status.
    #[error("auth endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// The auth endpoint answered with a non-zero application code.
    #[error("auth endpoint returned code {code}: {msg}")]
    Remote {
        /// Application-level status code.
        code: i64,
        /// Remote error message.
        msg: String,
    },

    /// The auth endpoint answered success but without a token.
    #[error("auth endpoint returned an empty token")]
    EmptyToken,
}

/// Decoded response of the app-access-token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Application-level status; zero means success.
    pub code: i64,
    /// Remote status message.
    #[serde(default)]
    pub msg: String,
    /// The bearer token, empty on failure.
    #[serde(default)]
    pub app_access_token: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expire: i64,
}

/// Seam over the remote auth endpoint so tests can inject a fake.
#[async_trait]
pub trait AuthEndpoint: Send + Sync {
    /// Exchange app credentials for a fresh access token.
    async fn fetch_app_access_token(&self) -> Result<AuthResponse, AuthError>;
}

/// Production [`AuthEndpoint`] backed by reqwest.
pub struct HttpAuthEndpoint {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl HttpAuthEndpoint {
    /// Build the endpoint from the Lark credentials.
    pub fn new(config: &LarkConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            http,
            base_url: config.base_url.clone(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
        }
    }
}

#[async_trait]
impl AuthEndpoint for HttpAuthEndpoint {
    async fn fetch_app_access_token(&self) -> Result<AuthResponse, AuthError> {
        let url = format!("{}/auth/v3/app_access_token/internal", self.base_url);
        let body = serde_json::json!({
            "app_id": self.app_id,
            "app_secret": self.app_secret,
        });

        debug!(app_id = %self.app_id, "requesting app access token");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(AuthError::HttpStatus(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }
}

/// The cached token entry, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    /// Valid only with a non-empty token and an expiry strictly in the
    /// future.
    fn is_valid_at(&self, now: i64) -> bool {
        !self.value.is_empty() && self.expires_at > now
    }
}

/// Fetches, caches, and refreshes the app access token.
pub struct TokenManager {
    auth: Arc<dyn AuthEndpoint>,
    cache_file: PathBuf,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    /// Create a manager caching under `cache_dir`.
    pub fn new(auth: Arc<dyn AuthEndpoint>, cache_dir: &Path) -> Self {
        Self {
            auth,
            cache_file: cache_dir.join(CACHE_FILE),
            cached: RwLock::new(None),
        }
    }

    /// Return the cached token, refreshing it if absent or expired.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();

        if let Some(entry) = self.cached.read().await.as_ref() {
            if entry.is_valid_at(now) {
                debug!("using cached app access token");
                return Ok(entry.value.clone());
            }
        }

        // Another worker may have refreshed the file already.
        if let Some(entry) = self.load_file() {
            if entry.is_valid_at(now) {
                debug!("using app access token from cache file");
                let value = entry.value.clone();
                *self.cached.write().await = Some(entry);
                return Ok(value);
            }
        }

        self.refresh().await
    }

    /// Force a fetch from the auth endpoint and cache the result.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let resp = self.auth.fetch_app_access_token().await?;
        if resp.code != 0 {
            return Err(AuthError::Remote {
                code: resp.code,
                msg: resp.msg,
            });
        }
        if resp.app_access_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let now = Utc::now().timestamp();
        let entry = CachedToken {
            value: resp.app_access_token.clone(),
            expires_at: now
                .saturating_add(resp.expire)
                .saturating_sub(TOKEN_TTL_BUFFER_SECS),
        };

        self.store_file(&entry);
        *self.cached.write().await = Some(entry);
        info!(expire = resp.expire, "app access token refreshed");
        Ok(resp.app_access_token)
    }

    /// Drop the cached token; the next `get_token` fetches a fresh one.
    pub async fn clear(&self) {
        *self.cached.write().await = None;
        match std::fs::remove_file(&self.cache_file) {
            Ok(()) => debug!("token cache file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "failed to remove token cache file"),
        }
    }

    /// Whether a currently valid token is cached.
    pub async fn is_valid(&self) -> bool {
        let now = Utc::now().timestamp();
        self.cached
            .read()
            .await
            .as_ref()
            .is_some_and(|entry| entry.is_valid_at(now))
    }

    /// Expiry of the cached token (buffer already subtracted), if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        let entry = self.cached.read().await.clone()?;
        DateTime::from_timestamp(entry.expires_at, 0)
    }

    fn load_file(&self) -> Option<CachedToken> {
        let contents = std::fs::read_to_string(&self.cache_file).ok()?;
        match serde_json::from_str(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "token cache file is corrupt; ignoring");
                None
            }
        }
    }

    fn store_file(&self, entry: &CachedToken) {
        if let Some(parent) = self.cache_file.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "failed to create cache directory");
                return;
            }
        }
        match serde_json::to_string(entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.cache_file, json) {
                    warn!(error = %e, "failed to write token cache file");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize token cache entry"),
        }
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("cache_file", &self.cache_file)
            .finish()
    }
}

//! Configuration loading and management.
//!
//! Loads larkgate configuration from `./larkgate.toml` (or
//! `$LARKGATE_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.
//!
//! Credentials default to empty strings: an empty verification token or
//! app secret never matches anything, so a missing configuration fails
//! closed rather than open.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level larkgate configuration loaded from TOML.
///
/// Path: `./larkgate.toml` or `$LARKGATE_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lark application credentials and API base URL (`[lark]`).
    pub lark: LarkConfig,
    /// Webhook server settings (`[server]`).
    pub server: ServerConfig,
    /// Token cache settings (`[cache]`).
    pub cache: CacheConfig,
    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$LARKGATE_CONFIG_PATH` or `./larkgate.toml`.
    /// If the file does not exist, returns defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: Config =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Config::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config file path: `$LARKGATE_CONFIG_PATH` or `./larkgate.toml`.
    fn config_path() -> PathBuf {
        match std::env::var("LARKGATE_CONFIG_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => PathBuf::from("larkgate.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var`
    /// in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("LARKGATE_APP_ID") {
            self.lark.app_id = v;
        }
        if let Some(v) = env("LARKGATE_APP_SECRET") {
            self.lark.app_secret = v;
        }
        if let Some(v) = env("LARKGATE_VERIFICATION_TOKEN") {
            self.lark.verification_token = v;
        }
        if let Some(v) = env("LARKGATE_ENCRYPT_KEY") {
            self.lark.encrypt_key = v;
        }
        if let Some(v) = env("LARKGATE_BASE_URL") {
            self.lark.base_url = v;
        }
        if let Some(v) = env("LARKGATE_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(v) = env("LARKGATE_CACHE_DIR") {
            self.cache.dir = v;
        }
        if let Some(v) = env("LARKGATE_LOGS_DIR") {
            self.logging.dir = v;
        }
        if let Some(v) = env("LARKGATE_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── Lark config ─────────────────────────────────────────────────

/// Lark application settings (`[lark]`).
///
/// All credential fields default to empty strings, which always fail
/// verification and auth.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LarkConfig {
    /// Application ID issued by the Lark developer console.
    pub app_id: String,
    /// Application secret used to fetch the app access token.
    pub app_secret: String,
    /// Verification token embedded in webhook envelopes.
    pub verification_token: String,
    /// Encrypt key used as the signing secret for webhook signatures.
    pub encrypt_key: String,
    /// Open API base URL.
    pub base_url: String,
}

impl std::fmt::Debug for LarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"__REDACTED__")
            .field("verification_token", &"__REDACTED__")
            .field("encrypt_key", &"__REDACTED__")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for LarkConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            verification_token: String::new(),
            encrypt_key: String::new(),
            base_url: "https://open.feishu.cn/open-apis".to_string(),
        }
    }
}

// ── Server config ───────────────────────────────────────────────

/// Webhook server settings (`[server]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the webhook server binds to.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

// ── Cache config ────────────────────────────────────────────────

/// Token cache settings (`[cache]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the access-token cache file.
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "./cache".to_string(),
        }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Logging settings (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated log files in production mode.
    pub dir: String,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".to_string(),
            level: "info".to_string(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

//! Server configuration.
//!
//! Configuration comes in three layers, each overriding the one before:
//!
//! ```text
//! stock defaults  →  config file (--config)  →  command-line flags
//! ```
//!
//! Layers are merged as TOML tables before deserializing, so a config file
//! only needs the keys it changes and a flag only replaces its own key.
//!
//! ## Configuration Options
//!
//! ```toml
//! base_url = "https://saves.example.com"   # required, used for absolute links
//! save_dir = "saves"                       # directory holding the .sav files
//! port = 7778
//! bind_address = "127.0.0.1"
//!
//! [saves]
//! extensions = ["sav"]
//! version_policy = "embedded-then-modified"  # or "modified-only"
//!
//! [cache]
//! ttl_ms = 0                 # staleness window; 0 rescans on every request
//!
//! [http]
//! request_timeout_secs = 30
//! viewer_url = "https://satisfactory-calculator.com/en/interactive-map"
//!
//! [http.cors]
//! allow_origin = "https://satisfactory-calculator.com"
//! allow_credentials = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Save directory {path} is not usable: {reason}")]
    SaveDir { path: PathBuf, reason: String },
}

/// Everything the server needs, passed explicitly to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Public URL the service is reachable at; links are built from it.
    pub base_url: String,
    /// Directory the game writes its saves to.
    pub save_dir: PathBuf,
    pub port: u16,
    pub bind_address: IpAddr,
    pub saves: SavesConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            save_dir: PathBuf::from("saves"),
            port: 7778,
            bind_address: IpAddr::from([127, 0, 0, 1]),
            saves: SavesConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate values that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("base_url is required".into()));
        }
        self.base_url()?;
        if self.saves.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "saves.extensions must not be empty".into(),
            ));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.request_timeout_secs must be positive".into(),
            ));
        }
        if axum::http::HeaderValue::from_str(&self.http.cors.allow_origin).is_err() {
            return Err(ConfigError::Validation(format!(
                "http.cors.allow_origin is not a valid header value: {:?}",
                self.http.cors.allow_origin
            )));
        }
        if !self.http.viewer_url.is_empty() && Url::parse(&self.http.viewer_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "http.viewer_url is not a valid URL: {}",
                self.http.viewer_url
            )));
        }
        Ok(())
    }

    /// `base_url` parsed; must be an absolute http(s) URL that can carry paths.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            ConfigError::Validation(format!("base_url {:?} is not a URL: {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::Validation(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }
}

/// Which files count as saves and how they are ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SavesConfig {
    /// File extensions (without dot) treated as saves.
    pub extensions: Vec<String>,
    /// Rank by embedded filename timestamp first, or by mtime only.
    pub version_policy: VersionPolicy,
}

impl Default for SavesConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["sav".to_string()],
            version_policy: VersionPolicy::default(),
        }
    }
}

/// Catalog caching. `ttl_ms = 0` disables the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Upper bound for resolving a request and for each file read while streaming.
    pub request_timeout_secs: u64,
    /// Interactive map page that accepts `?url=<save link>`. Empty hides the links.
    pub viewer_url: String,
    pub cors: CorsConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            viewer_url: "https://satisfactory-calculator.com/en/interactive-map".to_string(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin` (`*` allowed).
    pub allow_origin: String,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "https://satisfactory-calculator.com".to_string(),
            allow_credentials: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Command-line values that override the file. `None` leaves the key alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub save_dir: Option<PathBuf>,
    pub port: Option<u16>,
}

impl Overrides {
    fn into_value(self) -> toml::Value {
        let mut table = toml::map::Map::new();
        if let Some(url) = self.base_url {
            table.insert("base_url".into(), toml::Value::String(url));
        }
        if let Some(dir) = self.save_dir {
            table.insert(
                "save_dir".into(),
                toml::Value::String(dir.to_string_lossy().to_string()),
            );
        }
        if let Some(port) = self.port {
            table.insert("port".into(), toml::Value::Integer(i64::from(port)));
        }
        toml::Value::Table(table)
    }
}

/// Merge defaults, an optional config file and CLI overrides, then validate.
pub fn load_config(file: Option<&Path>, overrides: Overrides) -> Result<ServerConfig, ConfigError> {
    let mut merged = stock_defaults_value()?;
    if let Some(path) = file {
        merged = merge_toml(merged, load_raw_config(path)?);
    }
    merged = merge_toml(merged, overrides.into_value());
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Fail fast unless `dir` is a directory we can list.
pub fn check_save_dir(dir: &Path) -> Result<(), ConfigError> {
    let fail = |reason: String| ConfigError::SaveDir {
        path: dir.to_path_buf(),
        reason,
    };
    let metadata = fs::metadata(dir).map_err(|e| fail(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(fail("not a directory".into()));
    }
    fs::read_dir(dir).map_err(|e| fail(e.to_string()))?;
    Ok(())
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# satisfactory-serve-map configuration
# =====================================
# Values shown are the defaults, except base_url which has none.
# Command-line flags (--base-url, --save-dir, --port) override this file.
# Unknown keys cause an error.

# Public URL this service is reachable at. Required.
# Index links are built as <base_url>/map/<save name>.
base_url = "https://saves.example.com"

# Directory the game writes its .sav files to. Must exist and be readable.
save_dir = "saves"

# Listen address and port.
port = 7778
bind_address = "127.0.0.1"

# ---------------------------------------------------------------------------
# Save discovery
# ---------------------------------------------------------------------------
[saves]
# File extensions treated as saves (case-insensitive).
extensions = ["sav"]

# How the latest version of a save is chosen:
#   "embedded-then-modified": a timestamp in the file name (Name_YYYYMMDD-HHMMSS
#                             or Name_YYYY.MM.DD-HH.MM.SS, read as UTC) ranks
#                             first; otherwise the file modification time.
#   "modified-only":          always the file modification time.
# Ties go to the lexically greatest file path.
version_policy = "embedded-then-modified"

# ---------------------------------------------------------------------------
# Catalog cache
# ---------------------------------------------------------------------------
[cache]
# How long (milliseconds) a directory scan may be reused. A new save becomes
# visible at most this long after it is written. 0 rescans on every request.
ttl_ms = 0

# ---------------------------------------------------------------------------
# HTTP
# ---------------------------------------------------------------------------
[http]
# Per-request limit for finding a save and for each read while streaming it.
request_timeout_secs = 30

# Interactive map page linked from the index as <viewer_url>?url=<save link>.
# Set to "" to hide these links.
viewer_url = "https://satisfactory-calculator.com/en/interactive-map"

[http.cors]
# Origin allowed to fetch saves from a browser.
allow_origin = "https://satisfactory-calculator.com"
allow_credentials = true
"##
}

// =============================================================================
// Runtime Configuration — gateway settings loaded from JSON + environment
// =============================================================================
//
// All fields carry `#[serde(default)]` so a partial (or empty) file is valid.
// Secrets come from the environment: the API key is never read back out of a
// serialised config.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alpha_vantage::ClientSettings;
use crate::market::service::ServiceOptions;
use crate::types::Interval;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";
/// Environment variable overriding the HTTP bind address.
pub const BIND_ADDR_ENV: &str = "QUOTEDECK_BIND_ADDR";
/// Environment variable pointing at the JSON config file.
pub const CONFIG_PATH_ENV: &str = "QUOTEDECK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "quotedeck.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_request_spacing_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_popular_symbols() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "NFLX", "IBM", "ORCL"]
        .into_iter()
        .map(String::from)
        .collect()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Provider -------------------------------------------------------------

    /// Provider root; requests go to `{base_url}/query`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider API key. Usually supplied through `ALPHAVANTAGE_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// How long a successful response is served from cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Pause after winning the admission gate and before sending.
    #[serde(default = "default_request_spacing_ms")]
    pub request_spacing_ms: u64,

    /// Whole-request timeout (connect + response).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Views ------------------------------------------------------------------

    /// Interval used by the intraday endpoint when the caller gives none.
    #[serde(default)]
    pub default_interval: Interval,

    /// Lead the 1D view with a copy of the latest bar.
    #[serde(default = "default_true")]
    pub duplicate_latest_in_day_range: bool,

    /// Symbols on the popular board, in display order.
    #[serde(default = "default_popular_symbols")]
    pub popular_symbols: Vec<String>,

    // --- Server -----------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            request_spacing_ms: default_request_spacing_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            default_interval: Interval::default(),
            duplicate_latest_in_day_range: true,
            popular_symbols: default_popular_symbols(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults with
    /// a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            base_url = %config.base_url,
            cache_ttl_secs = config.cache_ttl_secs,
            request_spacing_ms = config.request_spacing_ms,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply environment overrides. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(addr) = lookup(BIND_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr;
        }
        self.popular_symbols = self
            .popular_symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            spacing: Duration::from_millis(self.request_spacing_ms),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            duplicate_latest_in_day_range: self.duplicate_latest_in_day_range,
            popular_symbols: self.popular_symbols.clone(),
        }
    }
}

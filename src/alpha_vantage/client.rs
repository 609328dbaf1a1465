// =============================================================================
// Alpha Vantage REST Client — the single upstream gateway
// =============================================================================
//
// Every provider call in the process goes through `AlphaVantageClient::fetch`:
//
//   cache hit ──────────────────────────────────────────────► payload
//   cache miss ─► per-key flight lock ─► admission ticket ─► spacing delay
//              ─► GET ─► JSON ─► soft-failure check ─► cache put ─► payload
//
// Concurrent misses on the same key wait on the flight lock and then read the
// cache instead of fetching again. Failed fetches are never cached.
//
// SECURITY: the API key is appended to the URL only when sending and is never
// part of a request key, a log line or a cache entry.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use super::cache::ResponseCache;
use super::error::{FetchError, SoftMarker};
use super::gate::AdmissionGate;
use super::request::RequestKey;
use super::stats::{GatewayStats, GatewayStatsSnapshot};

/// Parsed provider document. Shared, never mutated after parse.
pub type RawPayload = Arc<serde_json::Value>;

/// Everything needed to build a client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
    pub spacing: Duration,
    pub timeout: Duration,
}

type FlightMap = Mutex<HashMap<RequestKey, Arc<tokio::sync::Mutex<()>>>>;

pub struct AlphaVantageClient {
    base_url: Url,
    api_key: Option<String>,
    http: reqwest::Client,
    cache: ResponseCache,
    gate: AdmissionGate,
    in_flight: FlightMap,
    stats: GatewayStats,
    unconfigured_reported: AtomicBool,
}

impl AlphaVantageClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(settings: ClientSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid provider base url: {}", settings.base_url))?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client")?;

        let api_key = settings
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        debug!(
            base_url = %base_url,
            configured = api_key.is_some(),
            ttl_secs = settings.cache_ttl.as_secs(),
            spacing_ms = settings.spacing.as_millis() as u64,
            "AlphaVantageClient initialised"
        );

        Ok(Self {
            base_url,
            api_key,
            http,
            cache: ResponseCache::new(settings.cache_ttl),
            gate: AdmissionGate::new(settings.spacing),
            in_flight: Mutex::new(HashMap::new()),
            stats: GatewayStats::new(),
            unconfigured_reported: AtomicBool::new(false),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn stats(&self) -> GatewayStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    // -------------------------------------------------------------------------
    // Fetch
    // -------------------------------------------------------------------------

    /// Return the provider payload for `key`, from cache when fresh.
    #[instrument(skip_all, fields(key = %key), name = "alpha_vantage::fetch")]
    pub async fn fetch(
        &self,
        key: &RequestKey,
        cancel: &CancellationToken,
    ) -> Result<RawPayload, FetchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            if !self.unconfigured_reported.swap(true, Ordering::Relaxed) {
                error!("ALPHAVANTAGE_API_KEY is not set; all provider fetches will fail");
            }
            self.stats.record_failure(&FetchError::Unconfigured);
            return Err(FetchError::Unconfigured);
        };

        if let Some(hit) = self.cached(key) {
            return Ok(hit);
        }

        let mut flight = FlightSlot::join(&self.in_flight, key);
        let lock = flight.lock();
        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.stats.record_failure(&FetchError::Cancelled);
                return Err(FetchError::Cancelled);
            }
            guard = lock.lock_owned() => guard,
        };
        flight.hold(guard);

        // Another caller may have filled the cache while we queued.
        if let Some(hit) = self.cached(key) {
            return Ok(hit);
        }

        let result = self.fetch_uncached(key, api_key, cancel).await;
        if let Err(e) = &result {
            self.stats.record_failure(e);
        }
        result
    }

    fn cached(&self, key: &RequestKey) -> Option<RawPayload> {
        let hit = self.cache.get(key)?;
        self.stats.record_cache_hit();
        debug!("cache hit");
        Some(hit)
    }

    async fn fetch_uncached(
        &self,
        key: &RequestKey,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<RawPayload, FetchError> {
        let ticket = self.gate.acquire(cancel).await?;
        debug!(queued_ms = ticket.queued_for().as_millis() as u64, "cache miss, admitted");

        let url = key.to_url(&self.base_url, api_key);
        self.stats.record_network_call();

        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled during provider request");
                return Err(FetchError::Cancelled);
            }
            res = self.get_json(url) => res?,
        };

        if let Some((marker, message)) = soft_failure(&payload) {
            warn!(marker = %marker, message = %message, "provider soft failure, not caching");
            return Err(FetchError::SoftLimited { marker, message });
        }

        let payload = Arc::new(payload);
        self.cache.put(key.clone(), payload.clone());
        self.stats.record_success();
        drop(ticket);

        debug!("provider payload cached");
        Ok(payload)
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, FetchError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            let err = FetchError::from(e.without_url());
            warn!(error = %err, "provider request failed");
            err
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = %status, "provider returned non-success status");
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }

        let body = resp.bytes().await.map_err(|e| {
            let err = FetchError::Transport(e.without_url().to_string());
            warn!(error = %err, "failed to read provider response body");
            err
        })?;

        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, bytes = body.len(), "provider body is not JSON");
            FetchError::Malformed(e.to_string())
        })
    }
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("base_url", &self.base_url.as_str())
            .field("configured", &self.is_configured())
            .field("cache", &self.cache)
            .field("gate", &self.gate)
            .finish()
    }
}

/// First soft-failure marker present in the document, with its text.
fn soft_failure(payload: &serde_json::Value) -> Option<(SoftMarker, String)> {
    SoftMarker::ALL.iter().find_map(|marker| {
        let value = payload.get(marker.field())?;
        let message = value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());
        Some((*marker, message))
    })
}

// -----------------------------------------------------------------------------
// Per-key flight lock
// -----------------------------------------------------------------------------

/// Membership in the flight for one key. On drop the lock is released and the
/// map entry removed once no other caller references it.
struct FlightSlot<'a> {
    map: &'a FlightMap,
    key: &'a RequestKey,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> FlightSlot<'a> {
    fn join(map: &'a FlightMap, key: &'a RequestKey) -> Self {
        let lock = map.lock().entry(key.clone()).or_default().clone();
        Self {
            map,
            key,
            lock,
            guard: None,
        }
    }

    fn lock(&self) -> Arc<tokio::sync::Mutex<()>> {
        self.lock.clone()
    }

    fn hold(&mut self, guard: OwnedMutexGuard<()>) {
        self.guard = Some(guard);
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.map.lock();
        // Map entry + our own handle: nobody else is waiting.
        if map
            .get(self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 2)
        {
            map.remove(self.key);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

// =============================================================================
// Gateway Stats — per-outcome counters for the upstream channel
// =============================================================================
//
// Callers of the market-data service only see "data" or "no data". These
// counters keep the underlying distinction (cache hit, soft limit, transport
// failure...) observable to operators. Lock-free; any task may record or
// snapshot at any time.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::FetchError;

/// Number of back-to-back soft failures after which every further one is
/// reported at warn level with the streak length.
const SOFT_LIMIT_STREAK_WARN: u64 = 3;

pub struct GatewayStats {
    cache_hits: AtomicU64,
    network_calls: AtomicU64,
    successes: AtomicU64,
    soft_limited: AtomicU64,
    soft_limit_streak: AtomicU64,
    transport_errors: AtomicU64,
    malformed: AtomicU64,
    unconfigured: AtomicU64,
    cancelled: AtomicU64,
}

/// Immutable snapshot of the counters (serialised by the gateway endpoint).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStatsSnapshot {
    pub cache_hits: u64,
    pub network_calls: u64,
    pub successes: u64,
    pub soft_limited: u64,
    pub transport_errors: u64,
    pub malformed: u64,
    pub unconfigured: u64,
    pub cancelled: u64,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            network_calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            soft_limited: AtomicU64::new(0),
            soft_limit_streak: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            unconfigured: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_call(&self) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.soft_limit_streak.store(0, Ordering::Relaxed);
    }

    /// Count a failed fetch under its category.
    pub fn record_failure(&self, err: &FetchError) {
        let counter = match err {
            FetchError::Unconfigured => &self.unconfigured,
            FetchError::Transport(_) => &self.transport_errors,
            FetchError::Malformed(_) => &self.malformed,
            FetchError::Cancelled => &self.cancelled,
            FetchError::SoftLimited { .. } => {
                let streak = self.soft_limit_streak.fetch_add(1, Ordering::Relaxed) + 1;
                if streak >= SOFT_LIMIT_STREAK_WARN {
                    warn!(streak, "provider keeps rejecting requests; check quota");
                }
                &self.soft_limited
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GatewayStatsSnapshot {
        GatewayStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            network_calls: self.network_calls.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            soft_limited: self.soft_limited.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unconfigured: self.unconfigured.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.snapshot();
        f.debug_struct("GatewayStats")
            .field("cache_hits", &s.cache_hits)
            .field("network_calls", &s.network_calls)
            .field("successes", &s.successes)
            .field("soft_limited", &s.soft_limited)
            .field("transport_errors", &s.transport_errors)
            .finish()
    }
}

// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every request handler through `Arc<AppState>`. The market-data
// service owns the gateway (and through it the cache and admission gate); the
// shutdown token is the parent of every per-request cancellation token.
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::alpha_vantage::{AlphaVantageClient, GatewayStatsSnapshot};
use crate::market::MarketDataService;
use crate::runtime_config::RuntimeConfig;
use crate::types::Interval;

pub struct AppState {
    pub service: MarketDataService,
    pub default_interval: Interval,
    pub shutdown: CancellationToken,
}

/// Gateway counters plus cache occupancy, for the operator endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayReport {
    pub configured: bool,
    pub cached_entries: usize,
    #[serde(flatten)]
    pub stats: GatewayStatsSnapshot,
}

impl AppState {
    pub fn new(config: &RuntimeConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let client = AlphaVantageClient::new(config.client_settings())?;
        Ok(Self {
            service: MarketDataService::new(Arc::new(client), config.service_options()),
            default_interval: config.default_interval,
            shutdown,
        })
    }

    /// Token for one request, cancelled on shutdown. A handler future dropped
    /// by a disconnecting client releases its gate ticket on its own.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn gateway_report(&self) -> GatewayReport {
        let client = self.service.client();
        GatewayReport {
            configured: client.is_configured(),
            cached_entries: client.cached_entries(),
            stats: client.stats(),
        }
    }
}

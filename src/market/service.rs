// =============================================================================
// Market Data Service — consumer-facing operations over the gateway
// =============================================================================
//
// Every operation answers "data" or "no data". Gateway failures are logged and
// counted (see `GatewayStats`) and then collapse into `None` here; only the
// operator sees the difference.
// =============================================================================

use std::sync::Arc;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::range::{RangeCode, SeriesSource};
use crate::alpha_vantage::{parse, AlphaVantageClient, FetchError, RawPayload, RequestKey};
use crate::types::{Interval, PopularQuote, Quote, Series};

/// Interval used by the range views that need intraday bars.
pub const RANGE_INTRADAY_INTERVAL: Interval = Interval::FiveMinutes;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub duplicate_latest_in_day_range: bool,
    pub popular_symbols: Vec<String>,
}

#[derive(Debug)]
pub struct MarketDataService {
    client: Arc<AlphaVantageClient>,
    options: ServiceOptions,
}

impl MarketDataService {
    pub fn new(client: Arc<AlphaVantageClient>, options: ServiceOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &AlphaVantageClient {
        &self.client
    }

    // -------------------------------------------------------------------------
    // Gateway access
    // -------------------------------------------------------------------------

    async fn payload(&self, key: &RequestKey, cancel: &CancellationToken) -> Option<RawPayload> {
        match self.client.fetch(key, cancel).await {
            Ok(payload) => Some(payload),
            // Reported once by the client.
            Err(e) if !e.is_recoverable() => None,
            Err(FetchError::Cancelled) => {
                debug!(key = %key, "fetch cancelled");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "provider fetch failed");
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Best-matching ticker for free text such as a company name.
    #[instrument(skip(self, cancel))]
    pub async fn resolve_symbol(&self, query: &str, cancel: &CancellationToken) -> Option<String> {
        if query.trim().is_empty() {
            return None;
        }
        let payload = self.payload(&RequestKey::symbol_search(query), cancel).await?;
        parse::parse_symbol_match(&payload)
    }

    #[instrument(skip(self, cancel))]
    pub async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        cancel: &CancellationToken,
    ) -> Option<Series> {
        if symbol.trim().is_empty() {
            return None;
        }
        let payload = self
            .payload(&RequestKey::intraday(symbol, interval), cancel)
            .await?;
        parse::parse_intraday(&payload, symbol, interval)
    }

    #[instrument(skip(self, cancel))]
    pub async fn fetch_daily(&self, symbol: &str, cancel: &CancellationToken) -> Option<Series> {
        if symbol.trim().is_empty() {
            return None;
        }
        let payload = self.payload(&RequestKey::daily(symbol), cancel).await?;
        parse::parse_daily(&payload, symbol)
    }

    #[instrument(skip(self, cancel))]
    pub async fn fetch_quote(&self, symbol: &str, cancel: &CancellationToken) -> Option<Quote> {
        if symbol.trim().is_empty() {
            return None;
        }
        let payload = self.payload(&RequestKey::global_quote(symbol), cancel).await?;
        parse::parse_quote(&payload, symbol)
    }

    /// Series windowed for a range code (`1D`, `1W`, `1M`, anything else).
    ///
    /// `None` means no underlying series could be obtained; an empty series
    /// means one was obtained but had no bars in the window.
    #[instrument(skip(self, cancel))]
    pub async fn resolve_range(
        &self,
        symbol: &str,
        range_code: &str,
        cancel: &CancellationToken,
    ) -> Option<Series> {
        let range = RangeCode::parse(range_code);

        let series = match range.source() {
            SeriesSource::IntradayOrDaily => {
                match self.fetch_series(symbol, RANGE_INTRADAY_INTERVAL, cancel).await {
                    Some(series) => Some(series),
                    None if cancel.is_cancelled() => None,
                    None => {
                        debug!(symbol, "intraday unavailable, falling back to daily");
                        self.fetch_daily(symbol, cancel).await
                    }
                }
            }
            SeriesSource::Daily => self.fetch_daily(symbol, cancel).await,
            SeriesSource::Intraday => {
                self.fetch_series(symbol, RANGE_INTRADAY_INTERVAL, cancel).await
            }
        }?;

        let view = range.window(&series, self.options.duplicate_latest_in_day_range);
        if view.is_empty() {
            warn!(symbol = view.symbol(), range = %range, "series has no bars to show");
        }
        info!(
            symbol = view.symbol(),
            range = %range,
            points = view.len(),
            last_refreshed = %view.last_refreshed(),
            "range resolved"
        );
        Some(view)
    }

    /// Quotes for the configured popular symbols, in configured order. Every
    /// request still queues on the single admission gate.
    #[instrument(skip_all)]
    pub async fn popular_quotes(&self, cancel: &CancellationToken) -> Vec<PopularQuote> {
        let quotes = join_all(
            self.options
                .popular_symbols
                .iter()
                .map(|symbol| self.fetch_quote(symbol, cancel)),
        )
        .await;

        let rows: Vec<PopularQuote> = self
            .options
            .popular_symbols
            .iter()
            .zip(quotes)
            .map(|(symbol, quote)| PopularQuote::from_quote(symbol, quote))
            .collect();

        debug!(
            symbols = rows.len(),
            missing = rows.iter().filter(|r| r.price.is_zero()).count(),
            "popular quotes fetched"
        );
        rows
    }
}

// =============================================================================
// Tests
// =============================================================================

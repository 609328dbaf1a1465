// =============================================================================
// Shared types used across the QuoteDeck gateway
// =============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Provider wall-clock time (US/Eastern for Alpha Vantage) stamped as UTC.
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Canonical time series for one symbol and interval.
///
/// Points are always ascending by timestamp. The only way to build a `Series`
/// from raw bars is [`Series::from_points`], which sorts and drops duplicate
/// timestamps; the windowing helpers only ever take suffixes of an existing
/// series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    symbol: String,
    interval: String,
    last_refreshed: DateTime<Utc>,
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a series from unordered raw points. The symbol is upper-cased.
    pub fn from_points(
        symbol: &str,
        interval: impl Into<String>,
        last_refreshed: DateTime<Utc>,
        mut points: Vec<SeriesPoint>,
    ) -> Self {
        // Stable sort keeps the first-seen point when two labels collapse to
        // the same instant.
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);

        Self {
            symbol: symbol.trim().to_uppercase(),
            interval: interval.into(),
            last_refreshed,
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn last_refreshed(&self) -> DateTime<Utc> {
        self.last_refreshed
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent `n` points (or all of them if there are fewer).
    pub fn tail(&self, n: usize) -> &[SeriesPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Same symbol, interval and freshness with a different window of points.
    pub(crate) fn with_window(&self, points: Vec<SeriesPoint>) -> Self {
        Self {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            last_refreshed: self.last_refreshed,
            points,
        }
    }
}

/// Latest price snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    /// Percent change with the `%` sign stripped (e.g. `1.25` for `1.25%`).
    pub change_percent: Decimal,
}

/// Row of the popular-symbols board. Absent quotes are reported as zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularQuote {
    pub symbol: String,
    pub price: Decimal,
    pub change_percent: Decimal,
}

impl PopularQuote {
    pub fn from_quote(symbol: &str, quote: Option<Quote>) -> Self {
        match quote {
            Some(q) => Self {
                symbol: symbol.to_string(),
                price: q.price,
                change_percent: q.change_percent,
            },
            None => Self {
                symbol: symbol.to_string(),
                price: Decimal::ZERO,
                change_percent: Decimal::ZERO,
            },
        }
    }
}

/// Intraday bar width supported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1min")]
    OneMinute,
    #[default]
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::ThirtyMinutes => "30min",
            Self::SixtyMinutes => "60min",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported interval: {0}")]
pub struct UnsupportedInterval(pub String);

impl FromStr for Interval {
    type Err = UnsupportedInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1min" => Ok(Self::OneMinute),
            "5min" => Ok(Self::FiveMinutes),
            "15min" => Ok(Self::FifteenMinutes),
            "30min" => Ok(Self::ThirtyMinutes),
            "60min" => Ok(Self::SixtyMinutes),
            other => Err(UnsupportedInterval(other.to_string())),
        }
    }
}

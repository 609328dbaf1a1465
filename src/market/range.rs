// =============================================================================
// Range codes — which canonical series a view needs and how it is windowed
// =============================================================================

use crate::types::Series;

/// Daily bars in a trading week.
pub const WEEK_BARS: usize = 5;
/// Daily bars in a trading month.
pub const MONTH_BARS: usize = 22;
/// Intraday bars shown for the one-day view (after the leading latest bar).
pub const DAY_BARS: usize = 6;

/// Caller-selected view. Parsing is case-insensitive and total: anything not
/// recognised is [`RangeCode::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeCode {
    OneDay,
    OneWeek,
    OneMonth,
    Default,
}

/// Which canonical series a range is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    /// 5-minute intraday, falling back to daily when intraday is unavailable.
    IntradayOrDaily,
    Daily,
    Intraday,
}

impl RangeCode {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "1D" => Self::OneDay,
            "1W" => Self::OneWeek,
            "1M" => Self::OneMonth,
            _ => Self::Default,
        }
    }

    pub fn source(&self) -> SeriesSource {
        match self {
            Self::OneDay => SeriesSource::IntradayOrDaily,
            Self::OneWeek | Self::OneMonth => SeriesSource::Daily,
            Self::Default => SeriesSource::Intraday,
        }
    }

    /// Cut `series` down to this range's window.
    ///
    /// `OneDay` yields the latest bar followed by the six latest bars, so the
    /// latest bar appears twice. Clients rely on that shape; pass
    /// `duplicate_latest = false` to get only the six latest bars.
    pub fn window(&self, series: &Series, duplicate_latest: bool) -> Series {
        match self {
            Self::OneDay => {
                let mut points = Vec::with_capacity(DAY_BARS + 1);
                if duplicate_latest {
                    points.extend_from_slice(series.tail(1));
                }
                points.extend_from_slice(series.tail(DAY_BARS));
                series.with_window(points)
            }
            Self::OneWeek => series.with_window(series.tail(WEEK_BARS).to_vec()),
            Self::OneMonth => series.with_window(series.tail(MONTH_BARS).to_vec()),
            Self::Default => series.clone(),
        }
    }
}

impl std::fmt::Display for RangeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneDay => write!(f, "1D"),
            Self::OneWeek => write!(f, "1W"),
            Self::OneMonth => write!(f, "1M"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Payload parsing — provider documents into canonical series and quotes
// =============================================================================
//
// Alpha Vantage encodes every number as text under numbered keys
// ("1. open", "5. volume", "05. price"...). Parsing is lenient per field: a
// bad number becomes zero without discarding the bar. A bar whose label is not
// a timestamp is dropped. A missing section is "no data" (`None`).
// =============================================================================

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Interval, Quote, Series, SeriesPoint};

/// Series label used for daily bars.
pub const DAILY_LABEL: &str = "1day";

const DAILY_SERIES_KEY: &str = "Time Series (Daily)";
const META_KEY: &str = "Meta Data";
const LAST_REFRESHED_KEY: &str = "3. Last Refreshed";
const GLOBAL_QUOTE_KEY: &str = "Global Quote";
const BEST_MATCHES_KEY: &str = "bestMatches";

fn intraday_series_key(interval: Interval) -> String {
    format!("Time Series ({})", interval.as_str())
}

/// Intraday bars at `interval`. `None` when the payload has no such section.
pub fn parse_intraday(payload: &Value, symbol: &str, interval: Interval) -> Option<Series> {
    parse_series(
        payload,
        &intraday_series_key(interval),
        symbol,
        interval.as_str(),
    )
}

/// Daily bars. `None` when the payload has no daily section.
pub fn parse_daily(payload: &Value, symbol: &str) -> Option<Series> {
    parse_series(payload, DAILY_SERIES_KEY, symbol, DAILY_LABEL)
}

fn parse_series(payload: &Value, series_key: &str, symbol: &str, label: &str) -> Option<Series> {
    let Some(bars) = payload.get(series_key).and_then(Value::as_object) else {
        warn!(symbol, series_key, "response has no time series section");
        return None;
    };

    let mut dropped = 0usize;
    let points: Vec<SeriesPoint> = bars
        .iter()
        .filter_map(|(label, bar)| {
            let point = parse_point(label, bar);
            if point.is_none() {
                dropped += 1;
            }
            point
        })
        .collect();

    if dropped > 0 {
        debug!(symbol, dropped, "dropped bars with unparsable timestamps");
    }

    Some(Series::from_points(
        symbol,
        label,
        last_refreshed(payload).unwrap_or_else(Utc::now),
        points,
    ))
}

fn parse_point(label: &str, bar: &Value) -> Option<SeriesPoint> {
    let timestamp = parse_timestamp(label)?;
    Some(SeriesPoint {
        timestamp,
        open: decimal_field(bar, "1. open"),
        high: decimal_field(bar, "2. high"),
        low: decimal_field(bar, "3. low"),
        close: decimal_field(bar, "4. close"),
        volume: volume_field(bar, "5. volume"),
    })
}

fn last_refreshed(payload: &Value) -> Option<DateTime<Utc>> {
    payload
        .get(META_KEY)?
        .get(LAST_REFRESHED_KEY)?
        .as_str()
        .and_then(parse_timestamp)
}

/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (midnight), read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn field_text(obj: &Value, field: &str) -> Option<String> {
    match obj.get(field)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn decimal_field(obj: &Value, field: &str) -> Decimal {
    field_text(obj, field)
        .and_then(|s| parse_decimal(&s))
        .unwrap_or(Decimal::ZERO)
}

fn volume_field(obj: &Value, field: &str) -> u64 {
    let Some(text) = field_text(obj, field) else {
        return 0;
    };
    text.parse::<u64>()
        .ok()
        .or_else(|| {
            parse_decimal(&text)
                .filter(|d| d.is_sign_positive())
                .and_then(|d| d.trunc().to_u64())
        })
        .unwrap_or(0)
}

/// Latest quote. `None` when the payload has no quote section; an empty
/// section yields a zero price and change.
pub fn parse_quote(payload: &Value, symbol: &str) -> Option<Quote> {
    let quote = payload.get(GLOBAL_QUOTE_KEY)?;
    if quote.as_object()?.is_empty() {
        debug!(symbol, "empty global quote section");
    }

    let change_percent = field_text(quote, "10. change percent")
        .map(|s| s.trim_end_matches('%').trim().to_string())
        .and_then(|s| parse_decimal(&s))
        .unwrap_or(Decimal::ZERO);

    Some(Quote {
        symbol: symbol.trim().to_uppercase(),
        price: decimal_field(quote, "05. price"),
        change_percent,
    })
}

/// Symbol of the first best match, if any.
pub fn parse_symbol_match(payload: &Value) -> Option<String> {
    let first = payload.get(BEST_MATCHES_KEY)?.as_array()?.first()?;
    field_text(first, "1. symbol").filter(|s| !s.is_empty())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn intraday_payload() -> Value {
        json!({
            "Meta Data": {
                "1. Information": "Intraday (5min) open, high, low, close prices and volume",
                "2. Symbol": "IBM",
                "3. Last Refreshed": "2024-01-05 19:55:00",
                "4. Interval": "5min",
                "5. Output Size": "Compact",
                "6. Time Zone": "US/Eastern"
            },
            "Time Series (5min)": {
                "2024-01-05 19:55:00": {
                    "1. open": "159.1600", "2. high": "159.1600", "3. low": "159.1000",
                    "4. close": "159.1000", "5. volume": "143"
                },
                "2024-01-05 19:45:00": {
                    "1. open": "159.0000", "2. high": "159.2000", "3. low": "158.9000",
                    "4. close": "159.1500", "5. volume": "N/A"
                },
                "not-a-time": {
                    "1. open": "1", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1"
                },
                "2024-01-05 19:50:00": {
                    "1. open": "159.1500", "2. high": "oops", "3. low": "159.0500",
                    "4. close": "159.1600", "5. volume": "88"
                }
            }
        })
    }

    #[test]
    fn intraday_is_sorted_and_drops_bad_labels() {
        let series = parse_intraday(&intraday_payload(), "ibm", Interval::FiveMinutes).unwrap();

        assert_eq!(series.symbol(), "IBM");
        assert_eq!(series.interval(), "5min");
        assert_eq!(series.len(), 3);
        assert!(series
            .points()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(
            series.last_refreshed(),
            Utc.with_ymd_and_hms(2024, 1, 5, 19, 55, 0).unwrap()
        );
    }

    #[test]
    fn bad_numeric_field_defaults_only_that_field() {
        let series = parse_intraday(&intraday_payload(), "IBM", Interval::FiveMinutes).unwrap();

        let first = &series.points()[0];
        assert_eq!(first.volume, 0);
        assert_eq!(first.close, dec!(159.1500));
        assert_eq!(first.open, dec!(159.0000));

        let middle = &series.points()[1];
        assert_eq!(middle.high, Decimal::ZERO);
        assert_eq!(middle.low, dec!(159.0500));
        assert_eq!(middle.volume, 88);
    }

    #[test]
    fn wrong_interval_section_is_no_data() {
        assert!(parse_intraday(&intraday_payload(), "IBM", Interval::OneMinute).is_none());
        assert!(parse_daily(&intraday_payload(), "IBM").is_none());
    }

    #[test]
    fn daily_without_metadata_defaults_freshness_to_now() {
        let payload = json!({
            "Time Series (Daily)": {
                "2024-01-04": { "1. open": "1", "2. high": "2", "3. low": "0.5", "4. close": "1.5", "5. volume": "1000" },
                "2024-01-05": { "1. open": "1.5", "2. high": "2", "3. low": "1", "4. close": "1.8", "5. volume": "1200" }
            }
        });
        let before = Utc::now();
        let series = parse_daily(&payload, "msft").unwrap();

        assert_eq!(series.interval(), DAILY_LABEL);
        assert!(series.last_refreshed() >= before);
        assert_eq!(
            series.points()[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap()
        );
        assert_eq!(series.points()[1].close, dec!(1.8));
    }

    #[test]
    fn unparsable_last_refreshed_falls_back() {
        let payload = json!({
            "Meta Data": { "3. Last Refreshed": "yesterday-ish" },
            "Time Series (Daily)": {}
        });
        let series = parse_daily(&payload, "IBM").unwrap();
        assert!(series.is_empty());
        assert!(series.last_refreshed() > Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn quote_strips_percent_sign() {
        let payload = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "05. price": "161.1000",
                "10. change percent": "-1.2345%"
            }
        });
        let quote = parse_quote(&payload, "ibm").unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.price, dec!(161.1000));
        assert_eq!(quote.change_percent, dec!(-1.2345));
    }

    #[test]
    fn quote_defaults_unparsable_fields() {
        let payload = json!({
            "Global Quote": { "01. symbol": "IBM", "05. price": "n/a" }
        });
        let quote = parse_quote(&payload, "IBM").unwrap();
        assert_eq!(quote.price, Decimal::ZERO);
        assert_eq!(quote.change_percent, Decimal::ZERO);
    }

    #[test]
    fn empty_quote_section_is_zero_quote() {
        let quote = parse_quote(&json!({ "Global Quote": {} }), "zzzz").unwrap();
        assert_eq!(quote.symbol, "ZZZZ");
        assert_eq!(quote.price, Decimal::ZERO);
        assert_eq!(quote.change_percent, Decimal::ZERO);
    }

    #[test]
    fn missing_or_non_object_quote_is_no_data() {
        assert!(parse_quote(&json!({}), "ZZZZ").is_none());
        assert!(parse_quote(&json!({ "Global Quote": "n/a" }), "ZZZZ").is_none());
    }

    #[test]
    fn symbol_match_uses_first_entry() {
        let payload = json!({
            "bestMatches": [
                { "1. symbol": "TSLA", "2. name": "Tesla Inc" },
                { "1. symbol": "TL0.DEX", "2. name": "Tesla" }
            ]
        });
        assert_eq!(parse_symbol_match(&payload), Some("TSLA".to_string()));
    }

    #[test]
    fn empty_best_matches_is_absence() {
        assert_eq!(parse_symbol_match(&json!({ "bestMatches": [] })), None);
        assert_eq!(parse_symbol_match(&json!({})), None);
        assert_eq!(parse_symbol_match(&json!({ "bestMatches": "x" })), None);
    }

    #[test]
    fn timestamps_accept_date_and_datetime() {
        assert_eq!(
            parse_timestamp("2024-02-29"),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-02-29 09:35:00"),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 9, 35, 0).unwrap())
        );
        assert_eq!(parse_timestamp("2024-02-30"), None);
        assert_eq!(parse_timestamp("02/29/2024"), None);
    }

    #[test]
    fn volume_rejects_negative_and_accepts_decimal_text() {
        let bar = json!({ "a": "-5", "b": "1200.0", "c": 77 });
        assert_eq!(volume_field(&bar, "a"), 0);
        assert_eq!(volume_field(&bar, "b"), 1200);
        assert_eq!(volume_field(&bar, "c"), 77);
        assert_eq!(volume_field(&bar, "missing"), 0);
    }
}

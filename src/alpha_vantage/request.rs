// =============================================================================
// Request keys — one value for both the outbound query and the cache identity
// =============================================================================

use reqwest::Url;

use crate::types::Interval;

/// Provider endpoint selected through the `function` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    TimeSeriesIntraday,
    TimeSeriesDaily,
    GlobalQuote,
    SymbolSearch,
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeSeriesIntraday => "TIME_SERIES_INTRADAY",
            Self::TimeSeriesDaily => "TIME_SERIES_DAILY",
            Self::GlobalQuote => "GLOBAL_QUOTE",
            Self::SymbolSearch => "SYMBOL_SEARCH",
        }
    }
}

/// Fully-formed upstream query, minus the API key.
///
/// Symbols are trimmed and upper-cased at construction, so `aapl` and `AAPL`
/// produce equal keys and share the same cache entry and in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    function: Function,
    params: Vec<(&'static str, String)>,
}

impl RequestKey {
    pub fn intraday(symbol: &str, interval: Interval) -> Self {
        Self {
            function: Function::TimeSeriesIntraday,
            params: vec![
                ("symbol", canonical_symbol(symbol)),
                ("interval", interval.as_str().to_string()),
                ("outputsize", "compact".to_string()),
            ],
        }
    }

    pub fn daily(symbol: &str) -> Self {
        Self {
            function: Function::TimeSeriesDaily,
            params: vec![
                ("symbol", canonical_symbol(symbol)),
                ("outputsize", "compact".to_string()),
            ],
        }
    }

    pub fn global_quote(symbol: &str) -> Self {
        Self {
            function: Function::GlobalQuote,
            params: vec![("symbol", canonical_symbol(symbol))],
        }
    }

    /// Free-text search; keywords keep their case.
    pub fn symbol_search(keywords: &str) -> Self {
        Self {
            function: Function::SymbolSearch,
            params: vec![("keywords", keywords.trim().to_string())],
        }
    }

    /// Absolute request URL under `base_url`, with the API key appended.
    pub fn to_url(&self, base_url: &Url, api_key: &str) -> Url {
        let mut url = base_url.clone();
        let path = format!("{}/query", base_url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("function", self.function.as_str());
            for (k, v) in &self.params {
                query.append_pair(k, v);
            }
            query.append_pair("apikey", api_key);
        }
        url
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "function={}", self.function.as_str())?;
        for (k, v) in &self.params {
            write!(f, "&{k}={v}")?;
        }
        Ok(())
    }
}

fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

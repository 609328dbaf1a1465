use thiserror::Error;

/// Payload field through which the provider signals a rejected request on an
/// otherwise successful HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftMarker {
    /// `Note`: call-frequency limit reached.
    Note,
    /// `Information`: any other advisory (premium endpoint, daily quota...).
    Information,
    /// `Error Message`: invalid symbol or parameters.
    ErrorMessage,
}

impl SoftMarker {
    pub const ALL: [SoftMarker; 3] = [Self::Note, Self::Information, Self::ErrorMessage];

    pub fn field(&self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Information => "Information",
            Self::ErrorMessage => "Error Message",
        }
    }
}

impl std::fmt::Display for SoftMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// Failure of a single upstream fetch.
///
/// "No data" is not represented here; a well-formed payload without the
/// expected section surfaces as `None` from the parsers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No API key configured. Nothing was sent.
    #[error("Alpha Vantage API key is not configured")]
    Unconfigured,

    /// Connection failure, timeout or non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Body was not a JSON document.
    #[error("malformed response body: {0}")]
    Malformed(String),

    /// Provider rejected the request inside a 2xx response. Never cached.
    #[error("provider soft failure ({marker}): {message}")]
    SoftLimited { marker: SoftMarker, message: String },

    /// Caller cancelled while waiting for admission or for the response.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// `false` only for configuration errors that no retry can fix.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

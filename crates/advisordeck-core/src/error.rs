use thiserror::Error;

/// Validation and contract errors exposed by `advisordeck-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("forecast series must not be empty")]
    EmptyForecast,
    #[error("time series must not be empty")]
    EmptySeries,

    #[error("invalid market-cap bucket '{value}', expected one of small, mid, large")]
    InvalidCapBucket { value: String },
}

/// Transport and request-lifecycle errors.
///
/// `Cancelled` and `Superseded` are bookkeeping outcomes, not user-visible
/// failures: callers discard them silently. Everything else is converted
/// into a fallback dataset plus a `Failed` operation state before it
/// reaches the rendering layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("backend returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Parse(String),

    #[error("payload did not normalize into a usable view model")]
    Unusable,

    #[error("operation cancelled before completion")]
    Cancelled,

    #[error("operation superseded by a newer invocation")]
    Superseded,
}

impl ApiError {
    /// Whether the error should be swallowed without surfacing fallback
    /// content (late or torn-down operations).
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Superseded)
    }
}


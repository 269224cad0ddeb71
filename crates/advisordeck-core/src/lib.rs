//! Data synchronization and resilience layer for the advisordeck client.
//!
//! This crate contains:
//! - Canonical view models and validation
//! - The backend transport and its error taxonomy
//! - Defensive payload normalization and deterministic fallback data
//! - Per-operation state slots with supersession and cancellation
//! - The live feed subscriber and the shared view model store

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod feed;
pub mod http_client;
pub mod normalize;
pub mod ops;
pub mod store;
pub mod transport;

pub use config::{BackendConfig, API_URL_ENV, DEFAULT_API_URL};
pub use coordinator::{
    local_filter, DataOrigin, RequestCoordinator, ScreenerQuery, Sourced,
};
pub use domain::{
    clamp_share, AdvisorReply, AnalysisResult, BreakdownSlice, CapBucket, HealthSnapshot, Holding,
    MarketOverview, OverviewMetric, Portfolio, PredictionResult, RiskMetric, RiskReport,
    ScreenerRow, SeriesPoint, StockSnapshot, Symbol, WatchlistEntry, MISSING_LABEL, SERIES_LEN,
};
pub use error::{ApiError, ValidationError};
pub use fallback::{synth_series, FALLBACK_RISK_SCORES};
pub use feed::{FeedConfig, FeedMessage, FeedState, FeedSubscriber};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient, QueueHttpClient,
    ReqwestHttpClient, ScriptedExchange,
};
pub use normalize::{default_breakdown, sector_slices, BREAKDOWN_LIMIT, WATCHLIST_LIMIT};
pub use ops::{KeyedSlots, OpSlot, OpTicket, OperationState};
pub use store::{ChatLog, ChatMessage, ChatRole, ViewModelStore};
pub use transport::{encode_segment, ApiTransport};

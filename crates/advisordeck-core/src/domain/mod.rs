//! Canonical view models for the dashboard features, decoupled from the
//! backend wire format.

mod models;
mod symbol;

pub use models::{
    clamp_share, AdvisorReply, AnalysisResult, BreakdownSlice, CapBucket, HealthSnapshot, Holding,
    MarketOverview, OverviewMetric, Portfolio, PredictionResult, RiskMetric, RiskReport,
    ScreenerRow, SeriesPoint, StockSnapshot, WatchlistEntry, MISSING_LABEL, SERIES_LEN,
};
pub use symbol::Symbol;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Symbol, ValidationError};

/// Placeholder shown for labels the backend failed to supply.
pub const MISSING_LABEL: &str = "—";

/// Number of points in every watchlist and fallback time series.
pub const SERIES_LEN: usize = 24;

/// One headline metric on the market overview (label, display value,
/// signed percent delta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewMetric {
    pub label: String,
    pub value: String,
    pub change_percent: f64,
}

impl OverviewMetric {
    pub fn new(label: impl Into<String>, value: impl Into<String>, change_percent: f64) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            change_percent,
        }
    }
}

/// One slice of the portfolio breakdown chart. Shares are clamped to
/// [0, 100] but need not sum to exactly 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownSlice {
    pub name: String,
    /// Stable key for chart element identity across refreshes.
    pub key: String,
    pub share: u8,
}

impl BreakdownSlice {
    pub fn new(name: impl Into<String>, share: f64) -> Self {
        let name: String = name.into();
        let key = name.to_ascii_lowercase().replace(' ', "_");
        Self {
            name,
            key,
            share: clamp_share(share),
        }
    }
}

/// Clamp a raw percentage into [0, 100] and round to the nearest integer.
pub fn clamp_share(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

/// One point of a sparkline series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub index: u32,
    pub price: f64,
}

/// One watchlist row with its sparkline series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: Symbol,
    pub price: f64,
    pub change_percent: f64,
    pub series: Vec<SeriesPoint>,
}

impl WatchlistEntry {
    pub fn new(
        symbol: Symbol,
        price: f64,
        change_percent: f64,
        series: Vec<SeriesPoint>,
    ) -> Result<Self, ValidationError> {
        if series.is_empty() {
            return Err(ValidationError::EmptySeries);
        }
        Ok(Self {
            symbol,
            price,
            change_percent,
            series,
        })
    }
}

/// The merged market-overview view model consumed by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub metrics: Vec<OverviewMetric>,
    pub breakdown: Vec<BreakdownSlice>,
    pub watchlist: Vec<WatchlistEntry>,
}

/// A single position in the user's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: f64,
    pub avg_cost: f64,
    pub last_price: f64,
}

impl Holding {
    pub fn new(
        symbol: Symbol,
        quantity: f64,
        avg_cost: f64,
        last_price: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("quantity", quantity)?;
        validate_non_negative("avg_cost", avg_cost)?;
        validate_non_negative("last_price", last_price)?;
        Ok(Self {
            symbol,
            quantity,
            avg_cost,
            last_price,
        })
    }

    /// Unrealized profit/loss for this position.
    pub fn profit_loss(&self) -> f64 {
        (self.last_price - self.avg_cost) * self.quantity
    }
}

/// Portfolio = set of holdings, unique per symbol. Total P/L is derived,
/// never stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the position for a symbol. Symbols stay unique.
    pub fn upsert(&mut self, holding: Holding) {
        match self.holdings.iter_mut().find(|h| h.symbol == holding.symbol) {
            Some(existing) => *existing = holding,
            None => self.holdings.push(holding),
        }
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn total_profit_loss(&self) -> f64 {
        self.holdings.iter().map(Holding::profit_loss).sum()
    }

    /// Weight map (symbol → current market value) used by the risk and
    /// optimization request bodies.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.holdings
            .iter()
            .map(|h| (h.symbol.as_str().to_owned(), h.quantity * h.last_price))
            .collect()
    }
}

/// Market-capitalization bucket used by the screener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapBucket {
    Small,
    Mid,
    Large,
}

impl CapBucket {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Mid => "Mid",
            Self::Large => "Large",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "mid" => Ok(Self::Mid),
            "large" => Ok(Self::Large),
            other => Err(ValidationError::InvalidCapBucket {
                value: other.to_owned(),
            }),
        }
    }

    /// Bucket a raw market-cap figure (same unit the backend reports).
    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap >= 1.0e12 {
            Self::Large
        } else if market_cap >= 2.0e11 {
            Self::Mid
        } else {
            Self::Small
        }
    }
}

/// One screener result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRow {
    pub symbol: Symbol,
    pub sector: String,
    pub cap: CapBucket,
    pub pe: f64,
    pub price: f64,
    pub volume: Option<u64>,
    pub predicted_price: Option<f64>,
}

/// Backend-produced analysis result. Every field is optional at the
/// boundary; the raw payload is retained for opaque passthrough.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub allocation: BTreeMap<String, f64>,
    pub strategy: Option<String>,
    pub expected_return: Option<f64>,
    pub risk_level: Option<String>,
    pub sharpe_ratio: Option<f64>,
    pub recommendations: Vec<String>,
    pub rebalancing_needed: Option<bool>,
    /// Untouched backend payload for fields this layer does not model.
    #[serde(default)]
    pub raw: Value,
}

/// One scored risk dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMetric {
    pub name: String,
    pub score: u8,
}

impl RiskMetric {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score: clamp_share(score),
        }
    }
}

/// Risk analysis view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub metrics: Vec<RiskMetric>,
    pub summary: Option<String>,
}

/// Price-prediction view model for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: Symbol,
    pub current_price: f64,
    /// Ordered forecast prices over the requested horizon.
    pub forecast: Vec<f64>,
    /// First forecast value, surfaced separately for headline display.
    pub predicted_price: f64,
    /// RFC3339 UTC timestamp of the prediction.
    pub timestamp: String,
}

impl PredictionResult {
    pub fn new(
        symbol: Symbol,
        current_price: f64,
        forecast: Vec<f64>,
        timestamp: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("current_price", current_price)?;
        let predicted_price = *forecast.first().ok_or(ValidationError::EmptyForecast)?;
        Ok(Self {
            symbol,
            current_price,
            forecast,
            predicted_price,
            timestamp: timestamp.into(),
        })
    }
}

/// Advisor (natural-language query) reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorReply {
    pub answer: String,
    /// Untouched backend payload (citations, confidence, etc.).
    #[serde(default)]
    pub raw: Value,
}

/// Backend health snapshot from `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub components: BTreeMap<String, bool>,
}

/// Real-time snapshot for a single stock from `GET /api/v1/market/stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: Symbol,
    pub price: f64,
    pub change_percent: f64,
    pub volume: Option<u64>,
    pub sector: Option<String>,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

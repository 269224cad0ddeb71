//! Deterministic synthetic datasets used whenever the transport or the
//! normalizer cannot produce a usable result.
//!
//! Nothing here is random: series come from a fixed wave formula over the
//! point index, and prices are seeded from the symbol bytes. Repeated
//! calls are byte-for-byte reproducible, and every dataset satisfies the
//! same invariants as live data so the rendering layer needs no
//! special-casing.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::{
    AdvisorReply, AnalysisResult, CapBucket, HealthSnapshot, Holding, MarketOverview,
    OverviewMetric, Portfolio, PredictionResult, RiskMetric, RiskReport, ScreenerRow, SeriesPoint,
    StockSnapshot, Symbol, WatchlistEntry, SERIES_LEN,
};

/// Fixed five-dimension risk score set used when risk analysis fails.
pub const FALLBACK_RISK_SCORES: [(&str, u8); 5] = [
    ("Volatility", 58),
    ("Drawdown", 41),
    ("Beta", 52),
    ("Liquidity", 77),
    ("Concentration", 38),
];

const FALLBACK_WATCHLIST: [&str; 6] = [
    "RELIANCE.NS",
    "TCS.NS",
    "HDFCBANK.NS",
    "INFY.NS",
    "ICICIBANK.NS",
    "SBIN.NS",
];

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

fn seeded_price(symbol: &Symbol) -> f64 {
    250.0 + (symbol_seed(symbol) % 3_200) as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fixed-length synthetic sparkline: a wave over the point index with a
/// phase offset derived from the entry's position in its list. A
/// non-positive base price falls back to a nominal 100 so the series is
/// still drawable.
pub fn synth_series(base_price: f64, position: usize, len: usize) -> Vec<SeriesPoint> {
    let base = if base_price > 0.0 { base_price } else { 100.0 };
    let phase = position as f64 * 0.8;
    (0..len)
        .map(|index| SeriesPoint {
            index: index as u32,
            price: round2(base * (1.0 + 0.04 * (index as f64 * 0.55 + phase).sin())),
        })
        .collect()
}

/// Complete synthetic market overview.
pub fn fallback_overview() -> MarketOverview {
    let watchlist = FALLBACK_WATCHLIST
        .iter()
        .enumerate()
        .filter_map(|(position, name)| {
            let symbol = Symbol::parse(name).ok()?;
            let price = seeded_price(&symbol);
            let change = ((symbol_seed(&symbol) % 700) as f64 / 100.0) - 3.5;
            let series = synth_series(price, position, SERIES_LEN);
            WatchlistEntry::new(symbol, price, round2(change), series).ok()
        })
        .collect();

    MarketOverview {
        metrics: vec![
            OverviewMetric::new("Advances", "27", 0.0),
            OverviewMetric::new("Declines", "18", 0.0),
            OverviewMetric::new("Unchanged", "5", 0.0),
            OverviewMetric::new("Top Gainer", "RELIANCE.NS", 2.4),
        ],
        breakdown: crate::normalize::default_breakdown(),
        watchlist,
    }
}

/// Synthetic demo portfolio.
pub fn fallback_portfolio() -> Portfolio {
    let mut portfolio = Portfolio::new();
    let positions = [
        ("RELIANCE.NS", 12.0, 2410.0),
        ("TCS.NS", 8.0, 3350.0),
        ("HDFCBANK.NS", 20.0, 1580.0),
        ("INFY.NS", 15.0, 1425.0),
    ];
    for (name, quantity, avg_cost) in positions {
        let Ok(symbol) = Symbol::parse(name) else {
            continue;
        };
        let last_price = round2(seeded_price(&symbol) * 0.9 + avg_cost * 0.1);
        if let Ok(holding) = Holding::new(symbol, quantity, avg_cost, last_price) {
            portfolio.upsert(holding);
        }
    }
    portfolio
}

/// Baseline screener dataset, also used as the input of the local-filter
/// path when the remote screener call fails.
pub fn fallback_screener_rows() -> Vec<ScreenerRow> {
    let rows = [
        ("RELIANCE.NS", "Energy", CapBucket::Large, 26.8, 2465.0),
        ("TCS.NS", "IT", CapBucket::Large, 28.3, 3610.0),
        ("HDFCBANK.NS", "Banking", CapBucket::Large, 19.4, 1612.0),
        ("TATAMOTORS.NS", "Auto", CapBucket::Mid, 14.7, 945.0),
        ("PERSISTENT.NS", "IT", CapBucket::Mid, 30.5, 5240.0),
        ("IDFCFIRSTB.NS", "Banking", CapBucket::Small, 22.1, 84.0),
    ];
    rows.iter()
        .filter_map(|(name, sector, cap, pe, price)| {
            let symbol = Symbol::parse(name).ok()?;
            let predicted = round2(price * 1.03);
            let volume = 100_000 + symbol_seed(&symbol) % 900_000;
            Some(ScreenerRow {
                symbol,
                sector: (*sector).to_owned(),
                cap: *cap,
                pe: *pe,
                price: *price,
                volume: Some(volume),
                predicted_price: Some(predicted),
            })
        })
        .collect()
}

/// Fixed five-metric risk report.
pub fn fallback_risk_report() -> RiskReport {
    RiskReport {
        metrics: FALLBACK_RISK_SCORES
            .iter()
            .map(|(name, score)| RiskMetric::new(*name, f64::from(*score)))
            .collect(),
        summary: Some("Estimated from baseline profile; live analysis unavailable.".to_owned()),
    }
}

/// Static advisory note substituted when optimization fails.
pub fn fallback_analysis() -> AnalysisResult {
    let mut allocation = BTreeMap::new();
    allocation.insert("Large-cap equity".to_owned(), 0.5);
    allocation.insert("Mid-cap equity".to_owned(), 0.2);
    allocation.insert("Debt funds".to_owned(), 0.2);
    allocation.insert("Cash".to_owned(), 0.1);

    AnalysisResult {
        allocation,
        strategy: Some("moderate".to_owned()),
        expected_return: Some(0.11),
        risk_level: Some("moderate".to_owned()),
        sharpe_ratio: None,
        recommendations: vec![
            "Live optimization is unavailable; showing a baseline moderate allocation.".to_owned(),
            "Re-run once the analysis service is reachable.".to_owned(),
        ],
        rebalancing_needed: Some(false),
        raw: json!({"fallback": true}),
    }
}

/// Fixed advisor reply.
pub fn fallback_advisor_reply() -> AdvisorReply {
    AdvisorReply {
        answer: "The advisory service is unreachable right now. General guidance: keep a \
                 diversified allocation across large-cap equity, debt and cash, and avoid \
                 concentrating more than 10% in a single position."
            .to_owned(),
        raw: json!({"fallback": true}),
    }
}

/// Deterministic forecast: mild upward drift plus a small wave.
pub fn fallback_prediction(symbol: &Symbol, horizon: usize, timestamp: &str) -> PredictionResult {
    let current = seeded_price(symbol);
    let steps = horizon.max(1);
    let forecast = (0..steps)
        .map(|step| {
            let drift = current * 0.004 * (step as f64 + 1.0);
            let wave = current * 0.006 * ((step as f64) * 0.9).sin();
            round2(current + drift + wave)
        })
        .collect();

    PredictionResult::new(symbol.clone(), current, forecast, timestamp)
        .expect("fallback forecast is non-empty by construction")
}

/// Synthetic single-stock snapshot.
pub fn fallback_stock(symbol: &Symbol) -> StockSnapshot {
    StockSnapshot {
        symbol: symbol.clone(),
        price: seeded_price(symbol),
        change_percent: round2(((symbol_seed(symbol) % 500) as f64 / 100.0) - 2.5),
        volume: Some(100_000 + symbol_seed(symbol) % 900_000),
        sector: None,
    }
}

/// Health snapshot reported when the backend cannot be reached.
pub fn fallback_health() -> HealthSnapshot {
    HealthSnapshot {
        status: "unreachable".to_owned(),
        components: BTreeMap::new(),
    }
}

//! Defensive per-feature mappings from raw backend payloads to view models.
//!
//! Every function here is pure: the same input yields the same output, and
//! no field of the raw payload is trusted. Absent or mistyped fields
//! resolve to documented defaults (numbers → 0, labels → a placeholder
//! dash). A payload that cannot produce a usable view model at all yields
//! `None`, which routes the caller onto the fallback generator.

use serde_json::Value;

use crate::domain::{
    AdvisorReply, AnalysisResult, BreakdownSlice, CapBucket, HealthSnapshot, MarketOverview,
    OverviewMetric, PredictionResult, RiskMetric, RiskReport, ScreenerRow, StockSnapshot, Symbol,
    WatchlistEntry, MISSING_LABEL, SERIES_LEN,
};
use crate::fallback::synth_series;

/// Maximum watchlist entries synthesized from the movers lists.
pub const WATCHLIST_LIMIT: usize = 6;

/// Breakdown slices taken from sector performance before the chart is full.
pub const BREAKDOWN_LIMIT: usize = 4;

fn field_f64(raw: &Value, key: &str) -> Option<f64> {
    let value = raw.get(key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v| v.is_finite())
}

fn field_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn display_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Dashboard overview aggregator: market breadth plus the movers lists
/// become exactly four headline metrics and up to six watchlist entries.
pub fn normalize_overview(raw: &Value) -> Option<MarketOverview> {
    if !raw.is_object() {
        return None;
    }

    let breadth = raw.get("market_breadth").cloned().unwrap_or(Value::Null);
    let advances = field_f64(&breadth, "advances").unwrap_or(0.0);
    let declines = field_f64(&breadth, "declines").unwrap_or(0.0);
    let unchanged = field_f64(&breadth, "unchanged").unwrap_or(0.0);

    let gainers = raw
        .get("top_gainers")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let losers = raw
        .get("top_losers")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let top_gainer_label = gainers
        .first()
        .and_then(|entry| field_str(entry, "symbol"))
        .unwrap_or(MISSING_LABEL)
        .to_owned();
    let top_gainer_change = gainers
        .first()
        .and_then(|entry| field_f64(entry, "change"))
        .unwrap_or(0.0);

    let metrics = vec![
        OverviewMetric::new("Advances", display_count(advances), 0.0),
        OverviewMetric::new("Declines", display_count(declines), 0.0),
        OverviewMetric::new("Unchanged", display_count(unchanged), 0.0),
        OverviewMetric::new("Top Gainer", top_gainer_label, top_gainer_change),
    ];

    let watchlist = gainers
        .iter()
        .chain(losers.iter())
        .filter_map(|entry| {
            let symbol = Symbol::parse(field_str(entry, "symbol")?).ok()?;
            let price = field_f64(entry, "price").unwrap_or(0.0);
            let change = field_f64(entry, "change").unwrap_or(0.0);
            Some((symbol, price, change))
        })
        .take(WATCHLIST_LIMIT)
        .enumerate()
        .filter_map(|(position, (symbol, price, change))| {
            let series = synth_series(price, position, SERIES_LEN);
            WatchlistEntry::new(symbol, price, change, series).ok()
        })
        .collect();

    let breakdown = normalize_breakdown(raw.get("sector_performance").unwrap_or(&Value::Null));

    Some(MarketOverview {
        metrics,
        breakdown,
        watchlist,
    })
}

/// Sector-performance slices with no default substitution. Callers that
/// must tell "nothing usable" apart from the fixed distribution use this
/// directly; [`normalize_breakdown`] layers the default on top.
pub fn sector_slices(sectors: &Value) -> Vec<BreakdownSlice> {
    sectors
        .as_object()
        .map(|map| {
            map.iter()
                .take(BREAKDOWN_LIMIT)
                .filter_map(|(name, entry)| {
                    let share = entry
                        .as_f64()
                        .or_else(|| field_f64(entry, "change_percent"))
                        .or_else(|| field_f64(entry, "performance"))?;
                    Some(BreakdownSlice::new(name.clone(), share))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Portfolio-breakdown normalizer: the first four sector-performance
/// entries, clamped and rounded. An empty result substitutes the fixed
/// 60/20/10/10 distribution so the chart is never empty.
pub fn normalize_breakdown(sectors: &Value) -> Vec<BreakdownSlice> {
    let slices = sector_slices(sectors);
    if slices.is_empty() {
        default_breakdown()
    } else {
        slices
    }
}

/// Fixed distribution used when sector performance is empty or unusable.
pub fn default_breakdown() -> Vec<BreakdownSlice> {
    vec![
        BreakdownSlice::new("Equity", 60.0),
        BreakdownSlice::new("Debt", 20.0),
        BreakdownSlice::new("Gold", 10.0),
        BreakdownSlice::new("Cash", 10.0),
    ]
}

/// Single-stock snapshot from `GET /api/v1/market/stock/{symbol}`.
pub fn normalize_stock(raw: &Value, requested: &Symbol) -> Option<StockSnapshot> {
    if !raw.is_object() {
        return None;
    }
    let symbol = field_str(raw, "symbol")
        .and_then(|s| Symbol::parse(s).ok())
        .unwrap_or_else(|| requested.clone());
    Some(StockSnapshot {
        symbol,
        price: field_f64(raw, "current_price")
            .or_else(|| field_f64(raw, "price"))
            .unwrap_or(0.0),
        change_percent: field_f64(raw, "change_percent").unwrap_or(0.0),
        volume: raw.get("volume").and_then(Value::as_u64),
        sector: field_str(raw, "sector").map(str::to_owned),
    })
}

/// Screener rows from the `{count, stocks, timestamp}` response shape.
pub fn normalize_screener(raw: &Value) -> Option<Vec<ScreenerRow>> {
    let stocks = raw.get("stocks").and_then(Value::as_array)?;
    let rows = stocks
        .iter()
        .filter_map(|entry| {
            let symbol = Symbol::parse(field_str(entry, "symbol")?).ok()?;
            Some(ScreenerRow {
                symbol,
                sector: field_str(entry, "sector").unwrap_or("Unknown").to_owned(),
                cap: CapBucket::from_market_cap(field_f64(entry, "market_cap").unwrap_or(0.0)),
                pe: field_f64(entry, "pe_ratio")
                    .or_else(|| field_f64(entry, "pe"))
                    .unwrap_or(0.0),
                price: field_f64(entry, "price").unwrap_or(0.0),
                volume: entry.get("volume").and_then(Value::as_u64),
                predicted_price: field_f64(entry, "predicted_price"),
            })
        })
        .collect();
    Some(rows)
}

/// Prediction view model. `default_timestamp` is applied when the payload
/// carries none, keeping this function clock-free.
pub fn normalize_prediction(
    raw: &Value,
    requested: &Symbol,
    default_timestamp: &str,
) -> Option<PredictionResult> {
    let forecast: Vec<f64> = raw
        .get("predictions")
        .or_else(|| raw.get("forecast"))
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|point| {
            point
                .as_f64()
                .or_else(|| field_f64(point, "price"))
                .filter(|v| v.is_finite())
        })
        .collect();
    if forecast.is_empty() {
        return None;
    }

    let symbol = field_str(raw, "symbol")
        .and_then(|s| Symbol::parse(s).ok())
        .unwrap_or_else(|| requested.clone());
    let current_price = field_f64(raw, "current_price").unwrap_or(0.0).max(0.0);
    let timestamp = field_str(raw, "timestamp")
        .unwrap_or(default_timestamp)
        .to_owned();

    PredictionResult::new(symbol, current_price, forecast, timestamp).ok()
}

/// Portfolio-analysis result. Every modeled field is optional; the raw
/// payload is retained for fields this layer does not model.
pub fn normalize_analysis(raw: &Value) -> Option<AnalysisResult> {
    let object = raw.as_object()?;

    let allocation = object
        .get("allocation")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(name, weight)| Some((name.clone(), weight.as_f64()?)))
                .collect()
        })
        .unwrap_or_default();

    let recommendations = object
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Some(AnalysisResult {
        allocation,
        strategy: field_str(raw, "strategy").map(str::to_owned),
        expected_return: field_f64(raw, "expected_return"),
        risk_level: field_str(raw, "risk_level").map(str::to_owned),
        sharpe_ratio: field_f64(raw, "sharpe_ratio"),
        recommendations,
        rebalancing_needed: object.get("rebalancing_needed").and_then(Value::as_bool),
        raw: raw.clone(),
    })
}

/// Risk report: a map of named scores plus an optional summary line.
pub fn normalize_risk(raw: &Value) -> Option<RiskReport> {
    let scores = raw
        .get("risk_metrics")
        .or_else(|| raw.get("metrics"))
        .and_then(Value::as_object)?;

    let metrics: Vec<RiskMetric> = scores
        .iter()
        .filter_map(|(name, score)| {
            let score = score.as_f64().or_else(|| field_f64(score, "score"))?;
            Some(RiskMetric::new(name.clone(), score))
        })
        .collect();

    if metrics.is_empty() {
        return None;
    }

    Some(RiskReport {
        metrics,
        summary: field_str(raw, "summary")
            .or_else(|| field_str(raw, "risk_level"))
            .map(str::to_owned),
    })
}

/// Advisor reply from the non-streaming query path.
pub fn normalize_advisor(raw: &Value) -> Option<AdvisorReply> {
    let answer = raw
        .as_str()
        .or_else(|| field_str(raw, "answer"))
        .or_else(|| field_str(raw, "response"))
        .or_else(|| field_str(raw, "result"))?
        .to_owned();
    if answer.trim().is_empty() {
        return None;
    }
    Some(AdvisorReply {
        answer,
        raw: raw.clone(),
    })
}

/// Health snapshot from `GET /health`.
pub fn normalize_health(raw: &Value) -> Option<HealthSnapshot> {
    let status = field_str(raw, "status")?.to_owned();
    let components = raw
        .get("components")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(name, ready)| Some((name.clone(), ready.as_bool()?)))
                .collect()
        })
        .unwrap_or_default();
    Some(HealthSnapshot { status, components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overview_builds_exactly_four_metrics() {
        let raw = json!({
            "market_breadth": {"advances": 30, "declines": 15, "unchanged": 5},
            "top_gainers": [{"symbol": "XYZ", "change": 2.1}]
        });

        let overview = normalize_overview(&raw).expect("usable payload");
        assert_eq!(overview.metrics.len(), 4);
        assert_eq!(overview.metrics[0].label, "Advances");
        assert_eq!(overview.metrics[0].value, "30");
        assert_eq!(overview.metrics[1].value, "15");
        assert_eq!(overview.metrics[2].value, "5");
        assert_eq!(overview.metrics[3].label, "Top Gainer");
        assert_eq!(overview.metrics[3].value, "XYZ");
        assert!((overview.metrics[3].change_percent - 2.1).abs() < 1e-9);
    }

    #[test]
    fn overview_metrics_default_when_breadth_is_mistyped() {
        let raw = json!({"market_breadth": "not-an-object", "top_gainers": []});
        let overview = normalize_overview(&raw).expect("still usable");
        assert_eq!(overview.metrics[0].value, "0");
        assert_eq!(overview.metrics[3].value, MISSING_LABEL);
        assert_eq!(overview.metrics[3].change_percent, 0.0);
    }

    #[test]
    fn overview_rejects_non_object_payload() {
        assert!(normalize_overview(&json!([1, 2, 3])).is_none());
        assert!(normalize_overview(&Value::Null).is_none());
    }

    #[test]
    fn watchlist_caps_at_six_and_pads_from_losers() {
        let gainers: Vec<Value> = (0..4)
            .map(|i| json!({"symbol": format!("GAIN{i}"), "change": 1.0 + i as f64}))
            .collect();
        let losers: Vec<Value> = (0..5)
            .map(|i| json!({"symbol": format!("LOSS{i}"), "change": -(1.0 + i as f64)}))
            .collect();
        let raw = json!({"top_gainers": gainers, "top_losers": losers});

        let overview = normalize_overview(&raw).expect("usable payload");
        assert_eq!(overview.watchlist.len(), 6);
        assert_eq!(overview.watchlist[0].symbol.as_str(), "GAIN0");
        assert_eq!(overview.watchlist[4].symbol.as_str(), "LOSS0");
        for entry in &overview.watchlist {
            assert_eq!(entry.series.len(), SERIES_LEN);
            assert_eq!(entry.price, 0.0, "price defaults to 0 when unknown");
        }
    }

    #[test]
    fn watchlist_series_depends_on_entry_position() {
        let raw = json!({
            "top_gainers": [
                {"symbol": "AAA", "price": 100.0, "change": 1.0},
                {"symbol": "BBB", "price": 100.0, "change": 1.0}
            ]
        });
        let overview = normalize_overview(&raw).expect("usable payload");
        assert_ne!(
            overview.watchlist[0].series, overview.watchlist[1].series,
            "phase offset must differ by position"
        );
    }

    #[test]
    fn empty_sector_performance_gets_fixed_distribution() {
        let breakdown = normalize_breakdown(&json!({}));
        let shares: Vec<(String, u8)> = breakdown
            .iter()
            .map(|slice| (slice.name.clone(), slice.share))
            .collect();
        assert_eq!(
            shares,
            vec![
                ("Equity".to_owned(), 60),
                ("Debt".to_owned(), 20),
                ("Gold".to_owned(), 10),
                ("Cash".to_owned(), 10),
            ]
        );
    }

    #[test]
    fn breakdown_is_idempotent() {
        let sectors = json!({"IT": 34.2, "Banking": 27.9, "Energy": 140.0, "Auto": -3.0, "FMCG": 9.0});
        let first = normalize_breakdown(&sectors);
        let second = normalize_breakdown(&sectors);
        assert_eq!(first, second);
        assert_eq!(first.len(), BREAKDOWN_LIMIT);
        // Object keys iterate sorted, so the first four are Auto, Banking,
        // Energy, FMCG. Shares are clamped and rounded.
        assert_eq!(first[0].name, "Auto");
        assert_eq!(first[0].share, 0);
        assert_eq!(first[1].share, 28);
        assert_eq!(first[2].share, 100);
        assert_eq!(first[3].share, 9);
    }

    #[test]
    fn screener_rows_default_missing_fields() {
        let raw = json!({
            "count": 2,
            "stocks": [
                {"symbol": "TCS", "sector": "IT", "market_cap": 1.3e13, "pe_ratio": 28.3, "price": 3600.0},
                {"symbol": "ZOMATO"}
            ]
        });
        let rows = normalize_screener(&raw).expect("usable payload");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cap, CapBucket::Large);
        assert_eq!(rows[1].sector, "Unknown");
        assert_eq!(rows[1].cap, CapBucket::Small);
        assert_eq!(rows[1].pe, 0.0);
        assert!(rows[1].predicted_price.is_none());
    }

    #[test]
    fn screener_requires_stocks_array() {
        assert!(normalize_screener(&json!({"count": 0})).is_none());
    }

    #[test]
    fn prediction_reads_forecast_and_first_value() {
        let symbol = Symbol::parse("INFY").expect("valid");
        let raw = json!({
            "symbol": "INFY",
            "current_price": 1500.0,
            "predictions": [1510.0, 1524.0, 1531.0, 1540.0, 1552.0],
            "timestamp": "2026-02-01T10:00:00Z"
        });
        let prediction =
            normalize_prediction(&raw, &symbol, "2026-01-01T00:00:00Z").expect("usable");
        assert_eq!(prediction.forecast.len(), 5);
        assert!((prediction.predicted_price - 1510.0).abs() < 1e-9);
        assert_eq!(prediction.timestamp, "2026-02-01T10:00:00Z");
    }

    #[test]
    fn prediction_without_forecast_is_unusable() {
        let symbol = Symbol::parse("INFY").expect("valid");
        assert!(normalize_prediction(&json!({"predictions": []}), &symbol, "t").is_none());
        assert!(normalize_prediction(&json!({"current_price": 10.0}), &symbol, "t").is_none());
    }

    #[test]
    fn analysis_tolerates_absent_fields() {
        let result = normalize_analysis(&json!({})).expect("empty object is usable");
        assert!(result.allocation.is_empty());
        assert!(result.expected_return.is_none());
        assert!(result.recommendations.is_empty());

        let rich = normalize_analysis(&json!({
            "allocation": {"TCS": 0.4, "INFY": 0.6},
            "expected_return": 0.12,
            "sharpe_ratio": 1.4,
            "recommendations": ["hold cash buffer", 42],
            "rebalancing_needed": true
        }))
        .expect("usable");
        assert_eq!(rich.allocation.len(), 2);
        assert_eq!(rich.recommendations, vec!["hold cash buffer".to_owned()]);
        assert_eq!(rich.rebalancing_needed, Some(true));
    }

    #[test]
    fn risk_scores_are_clamped() {
        let report = normalize_risk(&json!({
            "risk_metrics": {"Volatility": 58.0, "Drawdown": 141.0, "Beta": -9.0},
            "risk_level": "moderate"
        }))
        .expect("usable");
        let by_name = |name: &str| {
            report
                .metrics
                .iter()
                .find(|m| m.name == name)
                .map(|m| m.score)
        };
        assert_eq!(by_name("Volatility"), Some(58));
        assert_eq!(by_name("Drawdown"), Some(100));
        assert_eq!(by_name("Beta"), Some(0));
        assert_eq!(report.summary.as_deref(), Some("moderate"));
    }

    #[test]
    fn advisor_reply_falls_through_key_aliases() {
        let reply = normalize_advisor(&json!({"response": "Diversify."})).expect("usable");
        assert_eq!(reply.answer, "Diversify.");
        assert!(normalize_advisor(&json!({"confidence": 0.8})).is_none());
        assert!(normalize_advisor(&json!({"answer": "   "})).is_none());
    }
}

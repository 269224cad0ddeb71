//! Request coordinator.
//!
//! Drives every backend operation end to end: issue the request through
//! the transport, normalize the payload, substitute deterministic
//! fallback data when the backend is unusable, and publish the outcome
//! through the per-operation slots and the shared store.
//!
//! The contract for callers is uniform. A real failure never bubbles out
//! as `Err`; it settles the slot as failed and returns a fallback-backed
//! value tagged [`DataOrigin::Fallback`]. `Err` is reserved for the two
//! silent outcomes, [`ApiError::Cancelled`] and [`ApiError::Superseded`],
//! which mean the result must not be rendered at all.

use std::sync::Arc;

use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::BackendConfig;
use crate::domain::{
    AdvisorReply, AnalysisResult, CapBucket, HealthSnapshot, MarketOverview, Portfolio,
    PredictionResult, RiskReport, ScreenerRow, StockSnapshot, Symbol,
};
use crate::error::ApiError;
use crate::fallback::{
    fallback_advisor_reply, fallback_analysis, fallback_health, fallback_overview,
    fallback_portfolio, fallback_prediction, fallback_risk_report, fallback_screener_rows,
    fallback_stock,
};
use crate::http_client::HttpClient;
use crate::normalize::{
    normalize_advisor, normalize_analysis, normalize_health, normalize_overview,
    normalize_prediction, normalize_risk, normalize_screener, normalize_stock, sector_slices,
};
use crate::ops::{KeyedSlots, OpSlot, OpTicket, OperationState};
use crate::store::{ChatLog, ChatRole, ViewModelStore};
use crate::transport::{encode_segment, ApiTransport};

const OVERVIEW_PATH: &str = "/api/v1/market/overview";
const SECTORS_PATH: &str = "/api/v1/market/sectors";
const QUERY_PATH: &str = "/api/v1/query";
const PORTFOLIO_PATH: &str = "/api/v1/analyze/portfolio";
const RISK_PATH: &str = "/api/v1/analyze/risk";
const SCREENER_PATH: &str = "/api/v1/screener";
const HEALTH_PATH: &str = "/health";

/// Where a delivered value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Live,
    Fallback,
}

/// A delivered value plus its provenance. When `origin` is
/// [`DataOrigin::Fallback`], `error` carries the failure that forced the
/// substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub origin: DataOrigin,
    pub error: Option<String>,
}

impl<T> Sourced<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            origin: DataOrigin::Live,
            error: None,
        }
    }

    fn fallback(value: T, error: &ApiError) -> Self {
        Self {
            value,
            origin: DataOrigin::Fallback,
            error: Some(error.to_string()),
        }
    }

    pub fn is_live(&self) -> bool {
        self.origin == DataOrigin::Live
    }
}

/// Screener request parameters. `None` means the dimension is
/// unconstrained, as does a sector of `"All"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenerQuery {
    pub cap: Option<CapBucket>,
    pub sector: Option<String>,
    pub min_pe: Option<f64>,
    pub max_pe: Option<f64>,
    pub min_volume: Option<u64>,
    pub include_predictions: bool,
}

impl ScreenerQuery {
    /// Wire body for `POST /api/v1/screener`. The cap bucket is expressed
    /// as the market-cap bounds the backend filters on.
    fn request_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        match self.cap {
            Some(CapBucket::Large) => {
                body.insert("market_cap_min".into(), Value::from(1.0e12));
            }
            Some(CapBucket::Mid) => {
                body.insert("market_cap_min".into(), Value::from(2.0e11));
                body.insert("market_cap_max".into(), Value::from(1.0e12));
            }
            Some(CapBucket::Small) => {
                body.insert("market_cap_max".into(), Value::from(2.0e11));
            }
            None => {}
        }
        if let Some(sector) = &self.sector {
            if sector != "All" {
                body.insert("sector".into(), Value::from(sector.clone()));
            }
        }
        if let Some(min_pe) = self.min_pe {
            body.insert("pe_min".into(), Value::from(min_pe));
        }
        if let Some(max_pe) = self.max_pe {
            body.insert("pe_max".into(), Value::from(max_pe));
        }
        if let Some(min_volume) = self.min_volume {
            body.insert("min_volume".into(), Value::from(min_volume));
        }
        body.insert(
            "include_predictions".into(),
            Value::from(self.include_predictions),
        );
        Value::Object(body)
    }
}

/// Apply a screener query locally. Used both to re-filter backend rows
/// (the backend may ignore a dimension) and to filter fallback rows. The
/// price/earnings bounds are inclusive; a row without a reported volume
/// cannot satisfy a volume floor.
pub fn local_filter(rows: &[ScreenerRow], query: &ScreenerQuery) -> Vec<ScreenerRow> {
    rows.iter()
        .filter(|row| {
            if let Some(cap) = query.cap {
                if row.cap != cap {
                    return false;
                }
            }
            if let Some(sector) = &query.sector {
                if sector != "All" && &row.sector != sector {
                    return false;
                }
            }
            if let Some(min_pe) = query.min_pe {
                if row.pe < min_pe {
                    return false;
                }
            }
            if let Some(max_pe) = query.max_pe {
                if row.pe > max_pe {
                    return false;
                }
            }
            if let Some(min_volume) = query.min_volume {
                if row.volume.is_none_or(|volume| volume < min_volume) {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// One coordinator per backend. Shared behind an `Arc`; every method
/// takes `&self`.
pub struct RequestCoordinator {
    transport: ApiTransport,
    store: ViewModelStore,
    chat: ChatLog,
    overview_op: OpSlot<MarketOverview>,
    optimize_op: OpSlot<AnalysisResult>,
    risk_op: OpSlot<RiskReport>,
    screen_op: OpSlot<Vec<ScreenerRow>>,
    advisor_op: OpSlot<AdvisorReply>,
    predict_ops: KeyedSlots<Symbol, PredictionResult>,
}

impl RequestCoordinator {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_transport(ApiTransport::new(config))
    }

    pub fn with_transport(transport: ApiTransport) -> Self {
        Self {
            transport,
            store: ViewModelStore::new(),
            chat: ChatLog::new(),
            overview_op: OpSlot::new(),
            optimize_op: OpSlot::new(),
            risk_op: OpSlot::new(),
            screen_op: OpSlot::new(),
            advisor_op: OpSlot::new(),
            predict_ops: KeyedSlots::new(),
        }
    }

    pub fn with_http_client(config: BackendConfig, http: Arc<dyn HttpClient>) -> Self {
        Self::with_transport(ApiTransport::with_http_client(config, http))
    }

    pub fn store(&self) -> &ViewModelStore {
        &self.store
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn config(&self) -> &BackendConfig {
        self.transport.config()
    }

    /// Refresh the dashboard overview and publish it to the store.
    /// Sector performance comes from its own endpoint when available;
    /// that second fetch is best effort and never fails the operation.
    pub async fn refresh_overview(&self) -> Result<Sourced<MarketOverview>, ApiError> {
        let ticket = self.overview_op.begin();
        let fetched = self.transport.get(OVERVIEW_PATH).await;

        let mut sourced = match &fetched {
            Ok(raw) => match normalize_overview(raw) {
                Some(overview) => Sourced::live(overview),
                None => Sourced::fallback(fallback_overview(), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_overview(), error),
        };

        if sourced.is_live() {
            if let Ok(response) = self.transport.get(SECTORS_PATH).await {
                // The endpoint wraps the map as {"sectors": {...}, "timestamp": ...}.
                let sectors = response.get("sectors").unwrap_or(&response);
                let slices = sector_slices(sectors);
                if !slices.is_empty() {
                    sourced.value.breakdown = slices;
                }
            }
        }

        self.settle(&self.overview_op, ticket, &sourced)?;
        self.store.set_overview(sourced.value.clone()).await;
        Ok(sourced)
    }

    /// Snapshot one stock. Not slot-managed; callers that need
    /// last-writer-wins semantics per symbol use [`Self::predict`].
    pub async fn stock(&self, symbol: &Symbol) -> Result<Sourced<StockSnapshot>, ApiError> {
        let path = format!("/api/v1/market/stock/{}", encode_segment(symbol.as_str()));
        let sourced = match self.transport.get(&path).await {
            Ok(raw) => match normalize_stock(&raw, symbol) {
                Some(snapshot) => Sourced::live(snapshot),
                None => Sourced::fallback(fallback_stock(symbol), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_stock(symbol), &error),
        };
        Ok(sourced)
    }

    /// Forecast prices for one symbol. Requests are keyed by symbol: a
    /// newer request for the same symbol supersedes the in-flight one,
    /// while requests for different symbols proceed independently.
    pub async fn predict(
        &self,
        symbol: &Symbol,
        horizon: usize,
    ) -> Result<Sourced<PredictionResult>, ApiError> {
        let horizon = horizon.max(1);
        let slot = self.predict_ops.slot(symbol);
        let ticket = slot.begin();

        let path = format!(
            "/api/v1/predict/{}?forecast_horizon={horizon}",
            encode_segment(symbol.as_str())
        );
        let timestamp = now_timestamp();
        let sourced = match self.transport.get(&path).await {
            Ok(raw) => match normalize_prediction(&raw, symbol, &timestamp) {
                Some(prediction) => Sourced::live(prediction),
                None => Sourced::fallback(
                    fallback_prediction(symbol, horizon, &timestamp),
                    &ApiError::Unusable,
                ),
            },
            Err(error) => {
                Sourced::fallback(fallback_prediction(symbol, horizon, &timestamp), &error)
            }
        };

        match &sourced.error {
            None => slot.complete(ticket, sourced.value.clone())?,
            Some(reason) => slot.fail(ticket, reason.clone())?,
        }
        Ok(sourced)
    }

    /// Run portfolio optimization over the store's current holdings.
    pub async fn optimize(&self) -> Result<Sourced<AnalysisResult>, ApiError> {
        let ticket = self.optimize_op.begin();
        let portfolio = self.ensure_portfolio().await;
        let body = json!({
            "strategy": "moderate",
            "existing_portfolio": portfolio.weights(),
        });

        let sourced = match self.transport.post(PORTFOLIO_PATH, &body).await {
            Ok(raw) => match normalize_analysis(&raw) {
                Some(analysis) => Sourced::live(analysis),
                None => Sourced::fallback(fallback_analysis(), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_analysis(), &error),
        };

        self.settle(&self.optimize_op, ticket, &sourced)?;
        Ok(sourced)
    }

    /// Score portfolio risk. A failed request settles the slot as failed
    /// and yields the fixed five-metric fallback report.
    pub async fn analyze_risk(&self) -> Result<Sourced<RiskReport>, ApiError> {
        let ticket = self.risk_op.begin();
        let portfolio = self.ensure_portfolio().await;
        let body = json!({ "portfolio": portfolio.weights() });

        let sourced = match self.transport.post(RISK_PATH, &body).await {
            Ok(raw) => match normalize_risk(&raw) {
                Some(report) => Sourced::live(report),
                None => Sourced::fallback(fallback_risk_report(), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_risk_report(), &error),
        };

        self.settle(&self.risk_op, ticket, &sourced)?;
        Ok(sourced)
    }

    /// Screen stocks. Backend rows are re-filtered locally so the result
    /// honors the query even when the backend ignores a dimension; a
    /// failed request filters the fallback universe instead.
    pub async fn screen(&self, query: &ScreenerQuery) -> Result<Sourced<Vec<ScreenerRow>>, ApiError> {
        let ticket = self.screen_op.begin();

        let sourced = match self.transport.post(SCREENER_PATH, &query.request_body()).await {
            Ok(raw) => match normalize_screener(&raw) {
                Some(rows) => Sourced::live(local_filter(&rows, query)),
                None => Sourced::fallback(
                    local_filter(&fallback_screener_rows(), query),
                    &ApiError::Unusable,
                ),
            },
            Err(error) => {
                Sourced::fallback(local_filter(&fallback_screener_rows(), query), &error)
            }
        };

        self.settle(&self.screen_op, ticket, &sourced)?;
        self.store.set_screener(sourced.value.clone()).await;
        Ok(sourced)
    }

    /// Ask the advisor a free-form question. Both sides of the exchange
    /// land in the chat log; the user turn is recorded even when the
    /// backend fails, so the transcript never loses a question.
    pub async fn ask_advisor(&self, question: &str) -> Result<Sourced<AdvisorReply>, ApiError> {
        let ticket = self.advisor_op.begin();
        self.chat.append(ChatRole::User, question, now_timestamp());

        let body = json!({ "query": question, "stream": false });
        let sourced = match self.transport.post(QUERY_PATH, &body).await {
            Ok(raw) => match normalize_advisor(&raw) {
                Some(reply) => Sourced::live(reply),
                None => Sourced::fallback(fallback_advisor_reply(), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_advisor_reply(), &error),
        };

        self.settle(&self.advisor_op, ticket, &sourced)?;
        self.chat
            .append(ChatRole::Advisor, sourced.value.answer.clone(), now_timestamp());
        Ok(sourced)
    }

    /// Probe backend health. One-shot, never slot-managed.
    pub async fn health(&self) -> Result<Sourced<HealthSnapshot>, ApiError> {
        let sourced = match self.transport.get(HEALTH_PATH).await {
            Ok(raw) => match normalize_health(&raw) {
                Some(snapshot) => Sourced::live(snapshot),
                None => Sourced::fallback(fallback_health(), &ApiError::Unusable),
            },
            Err(error) => Sourced::fallback(fallback_health(), &error),
        };
        Ok(sourced)
    }

    /// Seed the store with the demo portfolio when no holdings exist yet.
    pub async fn ensure_portfolio(&self) -> Portfolio {
        let current = self.store.portfolio().await;
        if !current.is_empty() {
            return current;
        }
        let seeded = fallback_portfolio();
        self.store.set_portfolio(seeded.clone()).await;
        seeded
    }

    pub fn overview_state(&self) -> OperationState<MarketOverview> {
        self.overview_op.state()
    }

    pub fn risk_state(&self) -> OperationState<RiskReport> {
        self.risk_op.state()
    }

    pub fn optimize_state(&self) -> OperationState<AnalysisResult> {
        self.optimize_op.state()
    }

    pub fn screen_state(&self) -> OperationState<Vec<ScreenerRow>> {
        self.screen_op.state()
    }

    pub fn advisor_state(&self) -> OperationState<AdvisorReply> {
        self.advisor_op.state()
    }

    pub fn prediction_state(&self, symbol: &Symbol) -> OperationState<PredictionResult> {
        self.predict_ops.state(symbol)
    }

    /// Cancel the in-flight prediction for one symbol. Its late
    /// completion will settle as cancelled and stay silent.
    pub fn cancel_prediction(&self, symbol: &Symbol) {
        self.predict_ops.slot(symbol).cancel();
    }

    /// Cancel everything in flight and clear the store. Chat history is
    /// append-only and survives.
    pub async fn reset(&self) {
        self.overview_op.cancel();
        self.optimize_op.cancel();
        self.risk_op.cancel();
        self.screen_op.cancel();
        self.advisor_op.cancel();
        self.predict_ops.cancel_all();
        self.store.reset().await;
    }

    fn settle<T: Clone>(
        &self,
        slot: &OpSlot<T>,
        ticket: OpTicket,
        sourced: &Sourced<T>,
    ) -> Result<(), ApiError> {
        match &sourced.error {
            None => slot.complete(ticket, sourced.value.clone()),
            Some(reason) => {
                tracing::warn!(target: "coordinator", %reason, "operation failed, serving fallback data");
                slot.fail(ticket, reason.clone())
            }
        }
    }
}

fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpResponse, QueueHttpClient, ScriptedExchange};
    use serde_json::json;

    fn coordinator_with(exchanges: Vec<ScriptedExchange>) -> RequestCoordinator {
        let config = BackendConfig::new("http://127.0.0.1:8000").expect("valid url");
        RequestCoordinator::with_http_client(config, Arc::new(QueueHttpClient::new(exchanges)))
    }

    #[test]
    fn local_filter_pe_bound_is_inclusive() {
        let rows = crate::fallback::fallback_screener_rows();
        let query = ScreenerQuery {
            max_pe: Some(22.1),
            ..ScreenerQuery::default()
        };
        let kept = local_filter(&rows, &query);
        assert!(kept.iter().any(|row| (row.pe - 22.1).abs() < f64::EPSILON));
        assert!(kept.iter().all(|row| row.pe <= 22.1));
    }

    #[test]
    fn local_filter_pe_floor_and_volume_floor_compose() {
        let mut rows = crate::fallback::fallback_screener_rows();
        rows[0].volume = Some(50_000);
        rows[1].volume = None;

        let query = ScreenerQuery {
            min_pe: Some(19.4),
            min_volume: Some(100_000),
            ..ScreenerQuery::default()
        };
        let kept = local_filter(&rows, &query);

        // The floor is inclusive, a thin row is dropped, and a row with
        // no reported volume cannot clear a volume floor.
        assert!(kept.iter().any(|row| (row.pe - 19.4).abs() < f64::EPSILON));
        assert!(kept.iter().all(|row| row.pe >= 19.4));
        assert!(kept.iter().all(|row| row.symbol != rows[0].symbol));
        assert!(kept.iter().all(|row| row.symbol != rows[1].symbol));
    }

    #[test]
    fn screener_body_carries_every_requested_bound() {
        let query = ScreenerQuery {
            cap: Some(CapBucket::Mid),
            sector: Some("IT".to_owned()),
            min_pe: Some(10.0),
            max_pe: Some(30.0),
            min_volume: Some(250_000),
            include_predictions: true,
        };
        let body = query.request_body();
        assert_eq!(body["market_cap_min"], 2.0e11);
        assert_eq!(body["market_cap_max"], 1.0e12);
        assert_eq!(body["sector"], "IT");
        assert_eq!(body["pe_min"], 10.0);
        assert_eq!(body["pe_max"], 30.0);
        assert_eq!(body["min_volume"], 250_000);
        assert_eq!(body["include_predictions"], true);
    }

    #[test]
    fn local_filter_treats_all_sector_as_unconstrained() {
        let rows = crate::fallback::fallback_screener_rows();
        let query = ScreenerQuery {
            sector: Some("All".to_owned()),
            ..ScreenerQuery::default()
        };
        assert_eq!(local_filter(&rows, &query).len(), rows.len());
    }

    #[tokio::test]
    async fn overview_failure_settles_failed_and_yields_fallback() {
        let coordinator = coordinator_with(vec![ScriptedExchange::reply(
            HttpResponse::with_status(503, "Service Unavailable"),
        )]);

        let sourced = coordinator.refresh_overview().await.expect("not silent");
        assert_eq!(sourced.origin, DataOrigin::Fallback);
        assert_eq!(sourced.value.metrics.len(), 4);
        assert!(matches!(
            coordinator.overview_state(),
            OperationState::Failed(_)
        ));
        // The fallback still reaches the store for rendering.
        assert!(coordinator.store().overview().await.is_some());
    }

    #[tokio::test]
    async fn overview_success_merges_sector_endpoint() {
        let overview_body = json!({
            "market_breadth": {"advances": 30, "declines": 18, "unchanged": 2},
            "top_gainers": [{"symbol": "INFY", "price": 1520.0, "change": 2.4}],
            "top_losers": [],
        });
        let sectors_body = json!({
            "sectors": {
                "IT": {"change_percent": 1.9},
                "Banking": {"change_percent": -0.4},
            },
            "timestamp": "2026-02-01T11:00:00Z",
        });
        let coordinator = coordinator_with(vec![
            ScriptedExchange::reply(HttpResponse::ok_json(overview_body.to_string())),
            ScriptedExchange::reply(HttpResponse::ok_json(sectors_body.to_string())),
        ]);

        let sourced = coordinator.refresh_overview().await.expect("not silent");
        assert!(sourced.is_live());
        assert_eq!(sourced.value.breakdown.len(), 2);
        assert!(sourced.value.breakdown.iter().any(|s| s.name == "IT"));
    }

    #[tokio::test]
    async fn unusable_sector_endpoint_keeps_overview_breakdown() {
        // The overview payload carries its own sector performance; a sector
        // response with no numeric entries must not overwrite it.
        let overview_body = json!({
            "market_breadth": {"advances": 30, "declines": 18, "unchanged": 2},
            "top_gainers": [],
            "top_losers": [],
            "sector_performance": {"Energy": 1.2, "FMCG": -0.3},
        });
        let sectors_body = json!({
            "sectors": {"IT": {"note": "no numbers here"}},
            "timestamp": "2026-02-01T11:00:00Z",
        });
        let coordinator = coordinator_with(vec![
            ScriptedExchange::reply(HttpResponse::ok_json(overview_body.to_string())),
            ScriptedExchange::reply(HttpResponse::ok_json(sectors_body.to_string())),
        ]);

        let sourced = coordinator.refresh_overview().await.expect("not silent");
        assert!(sourced.is_live());
        assert_eq!(sourced.value.breakdown.len(), 2);
        assert!(sourced.value.breakdown.iter().any(|s| s.name == "Energy"));
        assert!(sourced.value.breakdown.iter().all(|s| s.name != "Equity"));
    }

    #[tokio::test]
    async fn risk_failure_yields_fixed_five_metric_report() {
        let coordinator = coordinator_with(vec![ScriptedExchange::fail(
            crate::http_client::HttpError::new("connection refused"),
        )]);

        let sourced = coordinator.analyze_risk().await.expect("not silent");
        assert_eq!(sourced.origin, DataOrigin::Fallback);
        assert_eq!(sourced.value.metrics.len(), 5);
        assert_eq!(sourced.value.metrics[0].name, "Volatility");
        assert_eq!(sourced.value.metrics[0].score, 58);
        assert!(matches!(coordinator.risk_state(), OperationState::Failed(_)));
    }

    #[tokio::test]
    async fn slow_first_prediction_is_superseded_by_second() {
        let symbol = Symbol::parse("TCS").expect("valid symbol");
        let slow = json!({"predictions": [100.0], "current_price": 99.0});
        let fast = json!({"predictions": [200.0], "current_price": 199.0});
        let coordinator = Arc::new(coordinator_with(vec![
            ScriptedExchange::reply_after(80, HttpResponse::ok_json(slow.to_string())),
            ScriptedExchange::reply(HttpResponse::ok_json(fast.to_string())),
        ]));

        let first = {
            let coordinator = Arc::clone(&coordinator);
            let symbol = symbol.clone();
            tokio::spawn(async move { coordinator.predict(&symbol, 5).await })
        };
        // Let the first request begin before issuing the second.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = coordinator.predict(&symbol, 5).await.expect("not silent");
        assert!(second.is_live());
        assert_eq!(second.value.predicted_price, 200.0);

        let first = first.await.expect("join").expect_err("late completion is silent");
        assert_eq!(first, ApiError::Superseded);
        // The slot keeps the authoritative outcome.
        let state = coordinator.prediction_state(&symbol);
        assert_eq!(state.success().map(|p| p.predicted_price), Some(200.0));
    }

    #[tokio::test]
    async fn cancelled_prediction_stays_silent() {
        let symbol = Symbol::parse("INFY").expect("valid symbol");
        let body = json!({"predictions": [100.0], "current_price": 99.0});
        let coordinator = Arc::new(coordinator_with(vec![ScriptedExchange::reply_after(
            80,
            HttpResponse::ok_json(body.to_string()),
        )]));

        let pending = {
            let coordinator = Arc::clone(&coordinator);
            let symbol = symbol.clone();
            tokio::spawn(async move { coordinator.predict(&symbol, 3).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        coordinator.cancel_prediction(&symbol);

        let outcome = pending.await.expect("join").expect_err("cancelled is silent");
        assert_eq!(outcome, ApiError::Cancelled);
        assert_eq!(
            coordinator.prediction_state(&symbol),
            OperationState::Idle
        );
    }

    #[tokio::test]
    async fn predictions_for_different_symbols_run_independently() {
        let tcs = Symbol::parse("TCS").expect("valid symbol");
        let infy = Symbol::parse("INFY").expect("valid symbol");
        let coordinator = coordinator_with(vec![
            ScriptedExchange::reply(HttpResponse::ok_json(
                json!({"predictions": [10.0], "current_price": 9.0}).to_string(),
            )),
            ScriptedExchange::reply(HttpResponse::ok_json(
                json!({"predictions": [20.0], "current_price": 19.0}).to_string(),
            )),
        ]);

        let first = coordinator.predict(&tcs, 2).await.expect("not silent");
        let second = coordinator.predict(&infy, 2).await.expect("not silent");
        assert_eq!(first.value.predicted_price, 10.0);
        assert_eq!(second.value.predicted_price, 20.0);
        assert!(coordinator.prediction_state(&tcs).is_settled());
        assert!(coordinator.prediction_state(&infy).is_settled());
    }

    #[tokio::test]
    async fn advisor_failure_still_records_the_question() {
        let coordinator = coordinator_with(vec![ScriptedExchange::fail(
            crate::http_client::HttpError::new("connection refused"),
        )]);

        let sourced = coordinator
            .ask_advisor("Should I rebalance?")
            .await
            .expect("not silent");
        assert_eq!(sourced.origin, DataOrigin::Fallback);

        let messages = coordinator.chat().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].text, "Should I rebalance?");
        assert_eq!(messages[1].role, ChatRole::Advisor);
    }

    #[tokio::test]
    async fn screen_failure_filters_the_fallback_universe() {
        let coordinator = coordinator_with(vec![ScriptedExchange::reply(
            HttpResponse::with_status(500, "boom"),
        )]);
        let query = ScreenerQuery {
            max_pe: Some(25.0),
            ..ScreenerQuery::default()
        };

        let sourced = coordinator.screen(&query).await.expect("not silent");
        assert_eq!(sourced.origin, DataOrigin::Fallback);
        assert!(!sourced.value.is_empty());
        assert!(sourced.value.iter().all(|row| row.pe <= 25.0));
        assert_eq!(coordinator.store().screener().await, sourced.value);
    }

    #[tokio::test]
    async fn reset_clears_store_but_keeps_chat() {
        let coordinator = coordinator_with(vec![
            ScriptedExchange::fail(crate::http_client::HttpError::new("down")),
        ]);
        coordinator.ask_advisor("hello").await.expect("not silent");
        coordinator.store().set_overview(fallback_overview()).await;

        coordinator.reset().await;
        assert!(coordinator.store().overview().await.is_none());
        assert_eq!(coordinator.chat().len(), 2);
    }
}

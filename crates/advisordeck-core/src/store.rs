//! View model store: the merged, current-best snapshot of every feature,
//! plus the append-only chat log.
//!
//! The store is the single meeting point of the pull path (fetch →
//! normalize/fallback) and the push path (feed messages). Every update
//! replaces a whole feature record under one write lock, so readers never
//! observe a record half-written from two sources. The rendering layer is
//! read-only with respect to everything here.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{MarketOverview, Portfolio, ScreenerRow};
use crate::feed::FeedMessage;

#[derive(Debug, Default)]
struct StoreInner {
    overview: Option<MarketOverview>,
    portfolio: Portfolio,
    screener: Vec<ScreenerRow>,
    last_update: Option<String>,
}

/// Shared snapshot of all feature view models.
#[derive(Debug, Clone, Default)]
pub struct ViewModelStore {
    inner: Arc<tokio::sync::RwLock<StoreInner>>,
}

impl ViewModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn overview(&self) -> Option<MarketOverview> {
        self.inner.read().await.overview.clone()
    }

    pub async fn set_overview(&self, overview: MarketOverview) {
        let mut inner = self.inner.write().await;
        inner.overview = Some(overview);
    }

    pub async fn portfolio(&self) -> Portfolio {
        self.inner.read().await.portfolio.clone()
    }

    pub async fn set_portfolio(&self, portfolio: Portfolio) {
        self.inner.write().await.portfolio = portfolio;
    }

    pub async fn screener(&self) -> Vec<ScreenerRow> {
        self.inner.read().await.screener.clone()
    }

    pub async fn set_screener(&self, rows: Vec<ScreenerRow>) {
        self.inner.write().await.screener = rows;
    }

    pub async fn last_update(&self) -> Option<String> {
        self.inner.read().await.last_update.clone()
    }

    /// Merge one push message. Market updates rewrite the breadth metrics
    /// of the current overview in place, atomically; opaque messages only
    /// bump the update timestamp when they carry one. A push before the
    /// first fetch is dropped: records are created by the pull path.
    pub async fn apply_feed(&self, message: &FeedMessage) {
        let mut inner = self.inner.write().await;
        match message {
            FeedMessage::MarketUpdate { data, timestamp } => {
                if let Some(overview) = inner.overview.as_mut() {
                    merge_breadth(overview, data);
                }
                inner.last_update = timestamp.clone();
            }
            FeedMessage::Opaque { payload, .. } => {
                if let Some(timestamp) = payload.get("timestamp").and_then(Value::as_str) {
                    inner.last_update = Some(timestamp.to_owned());
                }
            }
        }
    }

    /// Tear the snapshot down to its empty state.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        *inner = StoreInner::default();
    }
}

fn merge_breadth(overview: &mut MarketOverview, data: &Value) {
    let fields = [("Advances", "advances"), ("Declines", "declines"), ("Unchanged", "unchanged")];
    for (label, key) in fields {
        let Some(value) = data.get(key).and_then(Value::as_f64) else {
            continue;
        };
        if let Some(metric) = overview.metrics.iter_mut().find(|m| m.label == label) {
            metric.value = if value.fract() == 0.0 {
                format!("{}", value as i64)
            } else {
                format!("{value}")
            };
        }
    }
}

/// Who authored a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Advisor,
}

/// One entry of the advisor conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: String,
}

/// Append-only conversation log, injected into consumers instead of being
/// reached as ambient global state. Messages are observable in arrival
/// order and never mutated after append.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, role: ChatRole, text: impl Into<String>, timestamp: impl Into<String>) {
        self.entries
            .lock()
            .expect("chat log lock is not poisoned")
            .push(ChatMessage {
                role,
                text: text.into(),
                timestamp: timestamp.into(),
            });
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.entries
            .lock()
            .expect("chat log lock is not poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("chat log lock is not poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

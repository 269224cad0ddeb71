//! Live feed subscriber.
//!
//! Maintains one websocket connection against the backend's `/ws` endpoint
//! and forwards parsed frames into the [`ViewModelStore`]. Frames that are
//! not valid JSON are dropped without surfacing an error; a market feed is
//! allowed to be noisy. Reconnection is opt-in and off by default, so a
//! deliberate [`FeedSubscriber::close`] always stays closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::BackendConfig;
use crate::store::ViewModelStore;

/// Connection lifecycle of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No connection attempt has been made, or a previous one ended.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open and frames are being dispatched.
    Open,
    /// The subscriber was closed on purpose.
    Closed,
    /// The connection failed or dropped.
    Errored,
}

/// Reconnect policy. Disabled unless asked for.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    /// Reconnect after a dropped or failed connection.
    pub reconnect: bool,
    /// First delay before a reconnect attempt.
    pub base_delay: Duration,
    /// Upper bound for the reconnect delay.
    pub max_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect: false,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl FeedConfig {
    /// Delay before reconnect `attempt` (0-based): exponential with
    /// +/- 50% jitter, capped at `max_delay`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let scale = 2.0_f64.powi(attempt.min(16) as i32);
        let seconds = self.base_delay.as_secs_f64() * scale;
        let capped = Duration::from_secs_f64(seconds.min(self.max_delay.as_secs_f64()));

        let jitter_ms = (capped.as_millis() as f64 * 0.5) as u64;
        let offset = fastrand::u64(0..=(jitter_ms * 2));
        let total_ms = capped.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
        Duration::from_millis(total_ms.max(0) as u64)
    }
}

/// One parsed feed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A `market_update` envelope carrying fresh breadth data.
    MarketUpdate {
        data: Value,
        timestamp: Option<String>,
    },
    /// Any other well-formed JSON frame. Kept for observability, ignored
    /// by the store merge.
    Opaque { kind: String, payload: Value },
}

impl FeedMessage {
    /// Classify a decoded JSON frame. Non-object frames are opaque with an
    /// empty kind rather than errors.
    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if kind == "market_update" {
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            let timestamp = value
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_owned);
            FeedMessage::MarketUpdate { data, timestamp }
        } else {
            FeedMessage::Opaque { kind, payload: value }
        }
    }
}

/// Parses raw frames and forwards them into the store, unless the
/// subscriber has been closed. Split out from the socket loop so the
/// closed-flag gating is testable without a network.
#[derive(Clone)]
pub(crate) struct FeedDispatcher {
    closed: Arc<AtomicBool>,
    store: ViewModelStore,
}

impl FeedDispatcher {
    pub(crate) fn new(closed: Arc<AtomicBool>, store: ViewModelStore) -> Self {
        Self { closed, store }
    }

    /// Returns `true` when the frame reached the store. Unparseable text
    /// and frames arriving after close are dropped.
    pub(crate) async fn dispatch(&self, raw: &str) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            tracing::debug!(target: "feed", len = raw.len(), "dropping unparseable frame");
            return false;
        };
        let message = FeedMessage::from_value(value);
        // Re-check after the await-free parse; close may race the read loop.
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.store.apply_feed(&message).await;
        true
    }
}

/// Owns the websocket task and its lifecycle state.
pub struct FeedSubscriber {
    url: String,
    feed_config: FeedConfig,
    store: ViewModelStore,
    state: Arc<Mutex<FeedState>>,
    closed: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSubscriber {
    pub fn new(config: &BackendConfig, feed_config: FeedConfig, store: ViewModelStore) -> Self {
        Self {
            url: config.feed_url(),
            feed_config,
            store,
            state: Arc::new(Mutex::new(FeedState::Disconnected)),
            closed: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> FeedState {
        *self.state.lock().expect("feed state lock is not poisoned")
    }

    /// Spawn the connection task. Calling connect on an already-running
    /// subscriber restarts it.
    pub fn connect(&self) {
        self.abort_task();
        self.closed.store(false, Ordering::SeqCst);
        set_state(&self.state, FeedState::Connecting);

        let url = self.url.clone();
        let feed_config = self.feed_config;
        let state = Arc::clone(&self.state);
        let closed = Arc::clone(&self.closed);
        let dispatcher = FeedDispatcher::new(Arc::clone(&self.closed), self.store.clone());

        let handle = tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                if closed.load(Ordering::SeqCst) {
                    return;
                }
                tracing::info!(target: "feed", %url, "connecting");
                match connect_async(url.as_str()).await {
                    Ok((mut stream, _)) => {
                        tracing::info!(target: "feed", "connected");
                        set_state(&state, FeedState::Open);
                        attempt = 0;
                        loop {
                            let Some(frame) = stream.next().await else {
                                break;
                            };
                            if closed.load(Ordering::SeqCst) {
                                return;
                            }
                            match frame {
                                Ok(Message::Text(text)) => {
                                    dispatcher.dispatch(text.as_str()).await;
                                }
                                Ok(Message::Ping(payload)) => {
                                    let _ = stream.send(Message::Pong(payload)).await;
                                }
                                Ok(Message::Close(_)) => break,
                                Ok(_) => {}
                                Err(error) => {
                                    tracing::warn!(target: "feed", %error, "socket error");
                                    break;
                                }
                            }
                        }
                        if closed.load(Ordering::SeqCst) {
                            return;
                        }
                        set_state(&state, FeedState::Errored);
                    }
                    Err(error) => {
                        tracing::warn!(target: "feed", %error, "connect failed");
                        set_state(&state, FeedState::Errored);
                    }
                }
                if !feed_config.reconnect {
                    return;
                }
                let delay = feed_config.reconnect_delay(attempt);
                attempt = attempt.saturating_add(1);
                tracing::info!(target: "feed", attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
                tokio::time::sleep(delay).await;
                set_state(&state, FeedState::Connecting);
            }
        });
        *self.task.lock().expect("feed task lock is not poisoned") = Some(handle);
    }

    /// Stop the feed for good. Late frames already in flight are dropped
    /// by the dispatcher; no reconnect follows.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.abort_task();
        set_state(&self.state, FeedState::Closed);
    }

    fn abort_task(&self) {
        if let Some(handle) = self
            .task
            .lock()
            .expect("feed task lock is not poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for FeedSubscriber {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.abort_task();
    }
}

fn set_state(state: &Arc<Mutex<FeedState>>, next: FeedState) {
    *state.lock().expect("feed state lock is not poisoned") = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_overview;
    use serde_json::json;

    #[test]
    fn market_update_envelope_is_classified() {
        let message = FeedMessage::from_value(json!({
            "type": "market_update",
            "data": {"advances": 12},
            "timestamp": "2026-02-01T09:30:00Z",
        }));
        match message {
            FeedMessage::MarketUpdate { data, timestamp } => {
                assert_eq!(data["advances"], 12);
                assert_eq!(timestamp.as_deref(), Some("2026-02-01T09:30:00Z"));
            }
            FeedMessage::Opaque { .. } => panic!("expected market update"),
        }
    }

    #[test]
    fn unknown_envelope_is_opaque_not_an_error() {
        let message = FeedMessage::from_value(json!({"type": "heartbeat", "seq": 9}));
        match message {
            FeedMessage::Opaque { kind, payload } => {
                assert_eq!(kind, "heartbeat");
                assert_eq!(payload["seq"], 9);
            }
            FeedMessage::MarketUpdate { .. } => panic!("expected opaque"),
        }
    }

    #[tokio::test]
    async fn unparseable_frame_is_silently_dropped() {
        let store = ViewModelStore::new();
        store.set_overview(fallback_overview()).await;
        let before = store.overview().await;

        let dispatcher = FeedDispatcher::new(Arc::new(AtomicBool::new(false)), store.clone());
        assert!(!dispatcher.dispatch("not json at all {").await);
        assert_eq!(store.overview().await, before);
    }

    #[tokio::test]
    async fn frames_after_close_never_reach_the_store() {
        let store = ViewModelStore::new();
        store.set_overview(fallback_overview()).await;
        let before = store.overview().await;

        let closed = Arc::new(AtomicBool::new(false));
        let dispatcher = FeedDispatcher::new(Arc::clone(&closed), store.clone());
        closed.store(true, Ordering::SeqCst);

        let frame = json!({
            "type": "market_update",
            "data": {"advances": 999, "declines": 0, "unchanged": 0},
        })
        .to_string();
        assert!(!dispatcher.dispatch(&frame).await);
        assert_eq!(store.overview().await, before);
    }

    #[test]
    fn reconnect_delay_is_capped_with_jitter() {
        let config = FeedConfig {
            reconnect: true,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        };
        for attempt in 0..12 {
            let delay = config.reconnect_delay(attempt);
            // +/- 50% jitter around the capped value.
            assert!(delay <= Duration::from_secs(6), "attempt {attempt}: {delay:?}");
        }
    }

    #[test]
    fn subscriber_starts_disconnected() {
        let config = BackendConfig::new("http://127.0.0.1:8000").expect("valid url");
        let subscriber = FeedSubscriber::new(&config, FeedConfig::default(), ViewModelStore::new());
        assert_eq!(subscriber.state(), FeedState::Disconnected);
    }
}

#![allow(dead_code)]

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use ripple_core::{Bot, PollParams, TransportError, TransportResult};

/// A bot that replays canned long-poll bodies.
///
/// Every call yields once so concurrent futures in a test get a turn.
#[derive(Default)]
pub struct MockBot {
    sessions: Mutex<VecDeque<Value>>,
    polls: Mutex<VecDeque<Value>>,
    pub acquisitions: Mutex<usize>,
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl MockBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(self, key: &str, server: &str, ts: &str) -> Self {
        self.sessions
            .lock()
            .push_back(json!({ "response": { "key": key, "server": server, "ts": ts } }));
        self
    }

    pub fn poll(self, body: Value) -> Self {
        self.polls.lock().push_back(body);
        self
    }

    /// Queues a successful poll carrying `updates`.
    pub fn batch(self, ts: &str, updates: Vec<Value>) -> Self {
        self.poll(json!({ "ts": ts, "updates": updates }))
    }
}

#[async_trait]
impl Bot for MockBot {
    fn id(&self) -> i64 {
        1
    }

    async fn call_api_raw(&self, method: &str, params: Value) -> TransportResult<Value> {
        tokio::task::yield_now().await;
        if method == "messages.send" {
            let peer = params["peer_id"].as_i64().unwrap_or_default();
            let text = params["message"].as_str().unwrap_or_default().to_string();
            self.sent.lock().push((peer, text));
        }
        Ok(json!({ "response": 1 }))
    }

    async fn acquire_long_poll_session(&self) -> TransportResult<Value> {
        tokio::task::yield_now().await;
        *self.acquisitions.lock() += 1;
        self.sessions
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::InvalidConfig("no session left".into()))
    }

    async fn poll_request(&self, _server: &str, _params: &PollParams) -> TransportResult<Value> {
        tokio::task::yield_now().await;
        self.polls
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::InvalidConfig("no poll left".into()))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A raw `message_new` update.
pub fn message(peer_id: i64, text: &str) -> Value {
    json!({
        "type": "message_new",
        "object": { "message": { "id": 1, "peer_id": peer_id, "from_id": peer_id, "text": text } },
        "group_id": 1,
    })
}

/// A raw update of an arbitrary non-message type.
pub fn update(event_type: &str, object: Value) -> Value {
    json!({ "type": event_type, "object": object, "group_id": 1 })
}

//! Bots for unit tests.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use ripple_core::{Bot, PollParams, TransportError, TransportResult};

/// A bot with no transport behind it.
pub struct NullBot;

#[async_trait]
impl Bot for NullBot {
    fn id(&self) -> i64 {
        0
    }

    async fn call_api_raw(&self, method: &str, _params: Value) -> TransportResult<Value> {
        Err(TransportError::InvalidConfig(format!(
            "no transport for {method}"
        )))
    }

    async fn acquire_long_poll_session(&self) -> TransportResult<Value> {
        Err(TransportError::InvalidConfig("no transport".into()))
    }

    async fn poll_request(&self, _server: &str, _params: &PollParams) -> TransportResult<Value> {
        Err(TransportError::InvalidConfig("no transport".into()))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A bot that replays scripted long-poll bodies and records requests.
#[derive(Default)]
pub struct ScriptedBot {
    sessions: Mutex<VecDeque<Value>>,
    polls: Mutex<VecDeque<Value>>,
    /// `ts` of every poll request, in order.
    pub polled_ts: Mutex<Vec<String>>,
    /// Number of session acquisitions.
    pub acquisitions: Mutex<usize>,
}

impl ScriptedBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(self, body: Value) -> Self {
        self.sessions.lock().push_back(body);
        self
    }

    pub fn poll(self, body: Value) -> Self {
        self.polls.lock().push_back(body);
        self
    }
}

/// A well-formed session body.
pub fn session_body(key: &str, server: &str, ts: Value) -> Value {
    json!({ "response": { "key": key, "server": server, "ts": ts } })
}

#[async_trait]
impl Bot for ScriptedBot {
    fn id(&self) -> i64 {
        1
    }

    async fn call_api_raw(&self, _method: &str, _params: Value) -> TransportResult<Value> {
        Ok(json!({ "response": 1 }))
    }

    async fn acquire_long_poll_session(&self) -> TransportResult<Value> {
        *self.acquisitions.lock() += 1;
        self.sessions
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::InvalidConfig("no scripted session".into()))
    }

    async fn poll_request(&self, _server: &str, params: &PollParams) -> TransportResult<Value> {
        self.polled_ts.lock().push(params.ts.clone());
        self.polls
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::InvalidConfig("no scripted poll".into()))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

//! Bot trait and related types.
//!
//! A [`Bot`] is the transport-capable collaborator the dispatcher polls
//! through. It knows how to call platform API methods, how to acquire a
//! long-poll session and how to issue the raw long-poll request against the
//! session's server URL. Everything above it (the long-poll state machine,
//! routing, state) depends only on this trait.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult, TransportResult};
use crate::event::PeerId;

/// Parameters of a single long-poll `check` request.
///
/// The request is sent as `act=check&key=..&ts=..&wait=..&mode=..&version=..`
/// directly to the session server, not to the general API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollParams {
    pub key: String,
    pub ts: String,
    /// Seconds the server may hold the request open.
    pub wait: u32,
    pub mode: u32,
    pub version: u32,
}

impl PollParams {
    /// Returns the request as ordered query pairs, `act=check` first.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("act", "check".to_string()),
            ("key", self.key.clone()),
            ("ts", self.ts.clone()),
            ("wait", self.wait.to_string()),
            ("mode", self.mode.to_string()),
            ("version", self.version.to_string()),
        ]
    }
}

/// The core Bot trait.
///
/// # API Design
///
/// - `call_api_raw`: issues a method call and returns the whole response body
/// - `call_api`: splits the body into its `response` member or an [`ApiError`]
/// - `acquire_long_poll_session`: the "create/refresh long-poll session" call,
///   returning the raw `{response: {key, server, ts}} | {error: ...}` body
/// - `poll_request`: the raw long-poll request
///
/// Implementations inject authentication and API version; callers never see
/// them.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's identifier (the community id for group bots).
    fn id(&self) -> i64;

    /// Calls an API method and returns the full decoded response body.
    async fn call_api_raw(&self, method: &str, params: Value) -> TransportResult<Value>;

    /// Calls an API method and returns its `response` member.
    async fn call_api(&self, method: &str, params: Value) -> ApiResult<Value> {
        let body = self.call_api_raw(method, params).await?;
        split_api_response(body)
    }

    /// Acquires (or refreshes) a long-poll session.
    ///
    /// The body is returned untouched; interpreting `error` and the session
    /// triple is the long-poll client's job.
    async fn acquire_long_poll_session(&self) -> TransportResult<Value>;

    /// Issues one long-poll request against `server`.
    async fn poll_request(&self, server: &str, params: &PollParams) -> TransportResult<Value>;

    /// Sends a text message to a peer and returns the new message id.
    async fn send_message(&self, peer_id: PeerId, text: &str) -> ApiResult<i64> {
        let response = self
            .call_api(
                "messages.send",
                json!({ "peer_id": peer_id, "message": text, "random_id": random_id() }),
            )
            .await?;
        response.as_i64().ok_or_else(|| {
            ApiError::MalformedResponse(format!("expected message id, got {response}"))
        })
    }

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Deduplication id for `messages.send`; varies from call to call.
fn random_id() -> i64 {
    static COUNTER: AtomicI64 = AtomicI64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::from(d.subsec_nanos()));
    (nanos + COUNTER.fetch_add(1, Ordering::Relaxed)) % i64::from(i32::MAX)
}

/// A boxed Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a [`BoxedBot`] to a concrete bot type.
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    bot.as_any().downcast::<T>().ok()
}

/// Splits a method-call body into its `response` member or an [`ApiError`].
pub fn split_api_response(mut body: Value) -> ApiResult<Value> {
    if let Some(error) = body.get("error") {
        let code = error.get("error_code").and_then(Value::as_i64).unwrap_or(-1);
        let message = error
            .get("error_msg")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ApiError::Api { code, message });
    }

    match body.get_mut("response") {
        Some(response) => Ok(response.take()),
        None => Err(ApiError::MalformedResponse(body.to_string())),
    }
}

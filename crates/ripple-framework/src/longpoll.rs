//! Long-poll client.
//!
//! The client owns the poll session (`key`, `server`, `ts`) and implements
//! the platform's recovery protocol for failed polls:
//!
//! | Response | Meaning | Recovery |
//! |----------|---------|----------|
//! | `{ts, updates}` | success | advance `ts`, return the batch |
//! | `{failed: 1, ts}` | events lost, session valid | adopt `ts` |
//! | `{failed: 2}` | key expired | refresh `key`/`server`, keep `ts` |
//! | `{failed: 3}` | session invalid | full refresh |
//!
//! Anything else is a [`LongPollError::Protocol`]. Transport errors are never
//! retried here.

use std::fmt;

use serde_json::Value;
use tracing::{debug, trace};

use ripple_core::{BoxedBot, PollParams};

use crate::error::{LongPollError, LongPollResult};

/// Seconds the server may hold a poll open.
pub const DEFAULT_WAIT: u32 = 25;
/// Default `mode` flags sent with every poll.
pub const DEFAULT_MODE: u32 = 2;
/// Long-poll protocol version.
pub const DEFAULT_VERSION: u32 = 3;

/// Tunables sent with every poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPollConfig {
    pub wait: u32,
    pub mode: u32,
    pub version: u32,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            wait: DEFAULT_WAIT,
            mode: DEFAULT_MODE,
            version: DEFAULT_VERSION,
        }
    }
}

/// The current poll session.
///
/// Empty until the first refresh. A full refresh sets all three of
/// `key`, `server` and `ts`; a partial one keeps `ts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSession {
    pub key: String,
    pub server: String,
    pub ts: String,
}

impl PollSession {
    /// Returns `true` once `key` and `server` are known.
    pub fn is_ready(&self) -> bool {
        !self.key.is_empty() && !self.server.is_empty()
    }
}

/// Outcome of one poll request.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A batch of raw updates, possibly empty.
    Batch(Vec<Value>),
    /// A failed code was recovered; poll again.
    Recovered(u8),
}

impl PollOutcome {
    /// Returns the batch, if any.
    pub fn into_batch(self) -> Option<Vec<Value>> {
        match self {
            Self::Batch(updates) => Some(updates),
            Self::Recovered(_) => None,
        }
    }
}

/// Pulls update batches through a [`Bot`](ripple_core::Bot).
pub struct LongPollClient {
    bot: BoxedBot,
    config: LongPollConfig,
    session: PollSession,
}

impl LongPollClient {
    pub fn new(bot: BoxedBot) -> Self {
        Self::with_config(bot, LongPollConfig::default())
    }

    pub fn with_config(bot: BoxedBot, config: LongPollConfig) -> Self {
        Self {
            bot,
            config,
            session: PollSession::default(),
        }
    }

    pub fn session(&self) -> &PollSession {
        &self.session
    }

    pub fn config(&self) -> &LongPollConfig {
        &self.config
    }

    /// Acquires a new session.
    ///
    /// `key` and `server` are always replaced; `ts` only when `keep_ts` is
    /// `false`.
    pub async fn refresh(&mut self, keep_ts: bool) -> LongPollResult<()> {
        let body = self.bot.acquire_long_poll_session().await?;

        if let Some(error) = body.get("error") {
            let detail = error
                .get("error_msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(LongPollError::SessionAcquisition(detail));
        }

        let response = body.get("response").ok_or_else(|| {
            LongPollError::Protocol(format!("session body without 'response': {body}"))
        })?;

        let key = required_str(response, "key")?;
        let server = required_str(response, "server")?;
        let ts = if keep_ts {
            None
        } else {
            Some(required_ts(response)?)
        };

        self.session.key = key;
        self.session.server = server;
        if let Some(ts) = ts {
            self.session.ts = ts;
        }

        debug!(
            server = %self.session.server,
            ts = %self.session.ts,
            keep_ts,
            "Refreshed long-poll session"
        );
        Ok(())
    }

    /// Issues one poll request and applies the recovery protocol.
    ///
    /// Refreshes the session first if it has never been acquired.
    pub async fn poll(&mut self) -> LongPollResult<PollOutcome> {
        if !self.session.is_ready() {
            self.refresh(false).await?;
        }

        let params = PollParams {
            key: self.session.key.clone(),
            ts: self.session.ts.clone(),
            wait: self.config.wait,
            mode: self.config.mode,
            version: self.config.version,
        };
        let body = self.bot.poll_request(&self.session.server, &params).await?;

        let Some(failed) = body.get("failed") else {
            let ts = required_ts(&body)?;
            let updates = match body.get("updates") {
                Some(Value::Array(updates)) => updates.clone(),
                _ => {
                    return Err(LongPollError::Protocol(format!(
                        "poll response without 'updates' array: {body}"
                    )));
                }
            };
            trace!(count = updates.len(), ts = %ts, "Received update batch");
            self.session.ts = ts;
            return Ok(PollOutcome::Batch(updates));
        };

        match failed.as_i64() {
            Some(1) => {
                let ts = required_ts(&body)?;
                debug!(old = %self.session.ts, new = %ts, "Events lost; resynchronised ts");
                self.session.ts = ts;
                Ok(PollOutcome::Recovered(1))
            }
            Some(2) => {
                debug!("Long-poll key expired; refreshing key");
                self.refresh(true).await?;
                Ok(PollOutcome::Recovered(2))
            }
            Some(3) => {
                debug!("Long-poll session lost; refreshing session");
                self.refresh(false).await?;
                Ok(PollOutcome::Recovered(3))
            }
            _ => Err(LongPollError::Protocol(format!(
                "unknown 'failed' value: {failed}"
            ))),
        }
    }
}

impl fmt::Debug for LongPollClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongPollClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn required_str(body: &Value, field: &str) -> LongPollResult<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LongPollError::Protocol(format!("missing '{field}' in {body}")))
}

/// `ts` arrives as a string or a number depending on the endpoint.
fn required_ts(body: &Value) -> LongPollResult<String> {
    match body.get("ts") {
        Some(Value::String(ts)) => Ok(ts.clone()),
        Some(Value::Number(ts)) => Ok(ts.to_string()),
        _ => Err(LongPollError::Protocol(format!("missing 'ts' in {body}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{ScriptedBot, session_body};
    use ripple_core::TransportError;
    use serde_json::json;
    use std::sync::Arc;

    async fn ready_client(bot: Arc<ScriptedBot>) -> LongPollClient {
        let mut client = LongPollClient::new(bot);
        client.refresh(false).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_first_poll_refreshes_and_advances_ts() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k1", "https://lp/1", json!("10")))
                .poll(json!({ "ts": "11", "updates": [{ "type": "group_join", "object": {} }] })),
        );
        let mut client = LongPollClient::new(bot.clone());

        let outcome = client.poll().await.unwrap();
        assert_eq!(outcome.into_batch().map(|b| b.len()), Some(1));
        assert_eq!(client.session().ts, "11");
        assert_eq!(*bot.acquisitions.lock(), 1);
        assert_eq!(*bot.polled_ts.lock(), vec!["10".to_string()]);
    }

    #[tokio::test]
    async fn test_numeric_ts_is_normalised() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k", "s", json!(5)))
                .poll(json!({ "ts": 6, "updates": [] })),
        );
        let mut client = ready_client(bot).await;
        assert_eq!(client.session().ts, "5");

        assert_eq!(client.poll().await.unwrap(), PollOutcome::Batch(vec![]));
        assert_eq!(client.session().ts, "6");
    }

    #[tokio::test]
    async fn test_failed_1_adopts_ts_only() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k1", "s1", json!("1")))
                .poll(json!({ "failed": 1, "ts": "100" })),
        );
        let mut client = ready_client(bot.clone()).await;

        assert_eq!(client.poll().await.unwrap(), PollOutcome::Recovered(1));
        assert_eq!(
            client.session(),
            &PollSession {
                key: "k1".into(),
                server: "s1".into(),
                ts: "100".into(),
            }
        );
        assert_eq!(*bot.acquisitions.lock(), 1);
    }

    #[tokio::test]
    async fn test_failed_2_refreshes_keeping_ts() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k1", "s1", json!("1")))
                .session(session_body("k2", "s2", json!("999")))
                .poll(json!({ "failed": 2 })),
        );
        let mut client = ready_client(bot).await;

        assert_eq!(client.poll().await.unwrap(), PollOutcome::Recovered(2));
        assert_eq!(
            client.session(),
            &PollSession {
                key: "k2".into(),
                server: "s2".into(),
                ts: "1".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_3_refreshes_everything() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k1", "s1", json!("1")))
                .session(session_body("k2", "s2", json!("999")))
                .poll(json!({ "failed": 3 })),
        );
        let mut client = ready_client(bot).await;

        assert_eq!(client.poll().await.unwrap(), PollOutcome::Recovered(3));
        assert_eq!(
            client.session(),
            &PollSession {
                key: "k2".into(),
                server: "s2".into(),
                ts: "999".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let bot = Arc::new(
            ScriptedBot::new()
                .session(session_body("k", "s", json!("1")))
                .poll(json!({ "failed": 4 }))
                .poll(json!({ "ts": "2" })),
        );
        let mut client = ready_client(bot).await;

        assert!(matches!(client.poll().await, Err(LongPollError::Protocol(_))));
        assert!(matches!(client.poll().await, Err(LongPollError::Protocol(_))));
        assert_eq!(client.session().ts, "1");
    }

    #[tokio::test]
    async fn test_session_acquisition_error() {
        let bot = Arc::new(ScriptedBot::new().session(json!({
            "error": { "error_code": 5, "error_msg": "User authorization failed" }
        })));
        let mut client = LongPollClient::new(bot);

        match client.poll().await {
            Err(LongPollError::SessionAcquisition(msg)) => {
                assert_eq!(msg, "User authorization failed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!client.session().is_ready());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let bot = Arc::new(ScriptedBot::new().session(session_body("k", "s", json!("1"))));
        let mut client = ready_client(bot).await;

        assert!(matches!(
            client.poll().await,
            Err(LongPollError::Transport(TransportError::InvalidConfig(_)))
        ));
    }
}

//! `reqwest`-backed [`Bot`] implementation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Url};
use serde_json::{Value, json};
use tracing::{debug, trace};

use ripple_core::{Bot, PollParams, TransportError, TransportResult};

/// Base URL of the platform's method endpoint.
pub const DEFAULT_API_URL: &str = "https://api.vk.com/method";
/// API version sent as `v` with every call.
pub const DEFAULT_API_VERSION: &str = "5.199";
/// HTTP timeout; must exceed the long-poll `wait`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(35);

/// Connection settings for an [`HttpBot`].
#[derive(Clone, PartialEq, Eq)]
pub struct HttpBotConfig {
    pub api_url: String,
    pub access_token: String,
    pub api_version: String,
    /// The community the bot acts for.
    pub group_id: i64,
    pub timeout: Duration,
}

impl HttpBotConfig {
    pub fn new(access_token: impl Into<String>, group_id: i64) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            group_id,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for HttpBotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBotConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("group_id", &self.group_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A group bot talking to the platform over HTTP.
#[derive(Clone)]
pub struct HttpBot {
    client: Client,
    config: HttpBotConfig,
}

impl HttpBot {
    pub fn new(config: HttpBotConfig) -> TransportResult<Self> {
        if config.access_token.is_empty() {
            return Err(TransportError::InvalidConfig(
                "access token must not be empty".into(),
            ));
        }
        if config.group_id <= 0 {
            return Err(TransportError::InvalidConfig(format!(
                "group id must be positive, got {}",
                config.group_id
            )));
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpBotConfig {
        &self.config
    }

    /// Builds the URL for a method call. The token travels in the
    /// `Authorization` header, never in the URL.
    fn method_url(&self, method: &str, params: Value) -> TransportResult<Url> {
        let base = format!("{}/{}", self.config.api_url.trim_end_matches('/'), method);
        let mut pairs = flatten_params(params)?;
        pairs.push(("v".into(), self.config.api_version.clone()));

        Url::parse_with_params(&base, &pairs)
            .map_err(|e| TransportError::InvalidConfig(format!("bad API URL '{base}': {e}")))
    }

    async fn send(request: RequestBuilder) -> TransportResult<Value> {
        let resp = request
            .send()
            .await
            .map_err(|e| TransportError::Io(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| TransportError::Decode(e.without_url().to_string()))
    }
}

/// Builds the long-poll URL for `server`.
///
/// Older API versions return the server without a scheme.
fn poll_url(server: &str, params: &PollParams) -> TransportResult<Url> {
    let base = if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{server}")
    };
    Url::parse_with_params(&base, params.to_query())
        .map_err(|e| TransportError::InvalidConfig(format!("bad long-poll server '{base}': {e}")))
}

/// Flattens method parameters into query pairs.
///
/// Strings pass through, numbers and booleans are formatted, arrays are
/// joined with commas, nested objects are sent as JSON and nulls are
/// dropped.
pub fn flatten_params(params: Value) -> TransportResult<Vec<(String, String)>> {
    let map = match params {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(TransportError::InvalidConfig(format!(
                "method parameters must be an object, got {other}"
            )));
        }
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| scalar(&value).map(|v| (key, v)))
        .collect())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

#[async_trait]
impl Bot for HttpBot {
    fn id(&self) -> i64 {
        self.config.group_id
    }

    async fn call_api_raw(&self, method: &str, params: Value) -> TransportResult<Value> {
        trace!(method, "Calling API method");
        let url = self.method_url(method, params)?;
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token);
        Self::send(request).await
    }

    async fn acquire_long_poll_session(&self) -> TransportResult<Value> {
        debug!(group_id = self.config.group_id, "Requesting long-poll server");
        self.call_api_raw(
            "groups.getLongPollServer",
            json!({ "group_id": self.config.group_id }),
        )
        .await
    }

    async fn poll_request(&self, server: &str, params: &PollParams) -> TransportResult<Value> {
        let url = poll_url(server, params)?;
        trace!(ts = %params.ts, wait = params.wait, "Polling");
        Self::send(self.client.get(url)).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for HttpBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBot")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> HttpBot {
        HttpBot::new(HttpBotConfig::new("secret", 77).api_url("https://api.example/method/"))
            .unwrap()
    }

    #[test]
    fn test_flatten_params() {
        let mut pairs = flatten_params(json!({
            "peer_id": 42,
            "message": "hi there",
            "user_ids": [1, 2, "three"],
            "keyboard": { "one_time": true },
            "disable_mentions": true,
            "skipped": null,
        }))
        .unwrap();
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("disable_mentions".to_string(), "1".to_string()),
                ("keyboard".to_string(), r#"{"one_time":true}"#.to_string()),
                ("message".to_string(), "hi there".to_string()),
                ("peer_id".to_string(), "42".to_string()),
                ("user_ids".to_string(), "1,2,three".to_string()),
            ]
        );
        assert!(flatten_params(Value::Null).unwrap().is_empty());
        assert!(flatten_params(json!([1, 2])).is_err());
    }

    #[test]
    fn test_method_url_keeps_token_out() {
        let url = bot()
            .method_url("messages.send", json!({ "peer_id": 1 }))
            .unwrap();
        assert_eq!(url.path(), "/method/messages.send");

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("peer_id".into(), "1".into())));
        assert!(query.contains(&("v".into(), DEFAULT_API_VERSION.into())));
        assert!(!url.as_str().contains("secret"));
    }

    #[tokio::test]
    async fn test_connection_error_does_not_leak_token() {
        // Nothing listens on the discard port.
        let bot = HttpBot::new(
            HttpBotConfig::new("SUPERSECRET", 1).api_url("http://127.0.0.1:9/method"),
        )
        .unwrap();

        let err = bot.acquire_long_poll_session().await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.to_string().contains("SUPERSECRET"));

        let params = PollParams {
            key: "SESSIONKEY".into(),
            ts: "1".into(),
            wait: 1,
            mode: 2,
            version: 3,
        };
        let err = bot
            .poll_request("http://127.0.0.1:9/lp", &params)
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("SESSIONKEY"));
    }

    #[test]
    fn test_poll_url() {
        let params = PollParams {
            key: "abc".into(),
            ts: "10".into(),
            wait: 25,
            mode: 2,
            version: 3,
        };

        let url = poll_url("https://lp.example/wh1", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://lp.example/wh1?act=check&key=abc&ts=10&wait=25&mode=2&version=3"
        );

        let bare = poll_url("lp.example/wh1", &params).unwrap();
        assert_eq!(bare.scheme(), "https");
    }

    #[test]
    fn test_config_validation() {
        assert!(HttpBot::new(HttpBotConfig::new("", 1)).is_err());
        assert!(HttpBot::new(HttpBotConfig::new("t", 0)).is_err());
        assert_eq!(bot().id(), 77);
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", bot());
        assert!(!debug.contains("secret"));
    }
}

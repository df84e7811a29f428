//! The runtime that wires configuration, transport and dispatcher together.
//!
//! ```rust,ignore
//! use ripple_runtime::RippleRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = RippleRuntime::builder().config_file("ripple.toml").build()?;
//!     runtime
//!         .dispatcher_mut()
//!         .on_message()
//!         .text_startswith("/ping")
//!         .handler(|| async {})?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use ripple_core::BoxedBot;
use ripple_framework::Dispatcher;
use ripple_transport::HttpBot;

use crate::config::{ConfigLoader, RippleConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the configured [`Dispatcher`] and drives it until shutdown.
#[derive(Debug)]
pub struct RippleRuntime {
    config: RippleConfig,
    dispatcher: Dispatcher,
}

impl RippleRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config`, initializes logging and connects an [`HttpBot`].
    pub fn from_config(config: RippleConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        let bot = HttpBot::new(config.bot.to_http_config())?;
        info!(group_id = config.bot.group_id, "Ripple runtime initialized");
        Ok(Self::with_bot(config, Arc::new(bot)))
    }

    /// Builds a runtime around an existing bot. No validation or logging
    /// setup is performed.
    pub fn with_bot(config: RippleConfig, bot: BoxedBot) -> Self {
        let dispatcher = Dispatcher::new(bot, config.storage.enabled)
            .long_poll_config(config.longpoll.to_long_poll_config());
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Mutable access for registering handlers and filter types.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Polls until Ctrl+C (or SIGTERM on Unix), then closes the dispatcher.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Polling for events. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Polls until `shutdown` resolves or the loop fails.
    ///
    /// Shutdown is cooperative: the poll in flight and its batch are
    /// processed before the loop exits.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let polling = self.dispatcher.start_polling();
        tokio::pin!(polling);
        tokio::pin!(shutdown);

        let result = tokio::select! {
            biased;
            result = &mut polling => result,
            () = &mut shutdown => {
                info!("Shutdown requested; finishing the current poll cycle");
                self.dispatcher.stop_polling();
                polling.await
            }
        };

        let closed = self.dispatcher.close().await;
        if let Err(err) = &result {
            error!(error = %err, "Polling loop failed");
        }
        result?;
        closed?;
        info!("Ripple runtime stopped");
        Ok(())
    }
}

/// Builder for [`RippleRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads this file instead of searching for `ripple.toml`.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader = self.loader.search_path(path.into());
        self
    }

    /// Ignores `RIPPLE_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Applies programmatic overrides with the highest priority.
    pub fn merge<T: Serialize>(mut self, overrides: T) -> Self {
        self.loader = self.loader.merge(overrides);
        self
    }

    pub fn build(self) -> RuntimeResult<RippleRuntime> {
        let config = self.loader.load()?;
        RippleRuntime::from_config(config)
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(err) => {
            // Without a signal source, polling runs until stopped another way.
            warn!(error = %err, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ripple_core::{Bot, PollParams, TransportError, TransportResult};
    use ripple_framework::DispatchError;
    use serde_json::{Value, json};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::RuntimeError;

    /// Hands out a session, then empty batches forever.
    #[derive(Default)]
    struct IdleBot {
        polls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Bot for IdleBot {
        fn id(&self) -> i64 {
            1
        }

        async fn call_api_raw(&self, _method: &str, _params: Value) -> TransportResult<Value> {
            Ok(json!({ "response": 1 }))
        }

        async fn acquire_long_poll_session(&self) -> TransportResult<Value> {
            Ok(json!({ "response": { "key": "k", "server": "https://lp", "ts": "1" } }))
        }

        async fn poll_request(&self, _server: &str, params: &PollParams) -> TransportResult<Value> {
            tokio::task::yield_now().await;
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransportError::Io("connection reset".into()));
            }
            Ok(json!({ "ts": params.ts, "updates": [] }))
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn config() -> RippleConfig {
        let mut config = RippleConfig::default();
        config.bot.access_token = "token".into();
        config.bot.group_id = 1;
        config
    }

    #[tokio::test]
    async fn test_shutdown_finishes_current_cycle() {
        let bot = Arc::new(IdleBot::default());
        let runtime = RippleRuntime::with_bot(config(), bot.clone());

        runtime.run_until(async {}).await.unwrap();
        assert_eq!(bot.polls.load(Ordering::SeqCst), 1);
        assert!(!runtime.dispatcher().is_polling());
    }

    #[tokio::test]
    async fn test_loop_error_is_returned() {
        let bot = Arc::new(IdleBot {
            fail: true,
            ..Default::default()
        });
        let runtime = RippleRuntime::with_bot(config(), bot);

        let err = runtime
            .run_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Dispatch(DispatchError::LongPoll(_))));
    }

    #[tokio::test]
    async fn test_storage_setting_reaches_dispatcher() {
        let mut config = config();
        config.storage.enabled = false;
        let runtime = RippleRuntime::with_bot(config, Arc::new(IdleBot::default()));
        assert!(!runtime.dispatcher().storage().is_enabled());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = RippleRuntime::builder()
            .without_env()
            .config_file("/no/such/ripple.toml")
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}

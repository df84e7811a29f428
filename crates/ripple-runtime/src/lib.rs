//! # Ripple Runtime
//!
//! Orchestration for Ripple bots: layered configuration, logging setup and
//! a [`RippleRuntime`] that owns the dispatcher and drives it until Ctrl+C.
//!
//! ```rust,ignore
//! use ripple_runtime::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = RippleRuntime::builder().build()?;
//!     runtime
//!         .dispatcher_mut()
//!         .on_message()
//!         .text("ping")
//!         .handler(|msg: Message, bot: BoxedBot| async move {
//!             bot.send_message(msg.peer_id, "pong").await.map(|_| ())
//!         })?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, RippleConfig, load_config};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{RippleRuntime, RuntimeBuilder};

/// Commonly used types for building a bot.
pub mod prelude {
    pub use crate::config::RippleConfig;
    pub use crate::runtime::{RippleRuntime, RuntimeBuilder};
    pub use ripple_core::{Bot, BoxedBot, Event, EventType, Message, PeerId, StateContext};
    pub use ripple_framework::{
        Dispatcher, Extra, FilterArgs, FilterOutcome, PollControl, RegistryKind, filter_fn,
    };
}

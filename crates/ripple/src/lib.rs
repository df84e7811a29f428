//! # Ripple
//!
//! A long-poll bot framework with declarative filter routing and per-peer
//! conversation state.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌────────────┐   ┌──────────────────────┐
//! │ HttpBot  │──▶│ LongPollClient │──▶│ Dispatcher │──▶│ message registry     │──▶ handlers
//! │          │   │ (ts, recovery) │   │  decode    │──▶│ event registry       │──▶ handlers
//! └──────────┘   └────────────────┘   └────────────┘   └──────────────────────┘
//!                                                         filters ◀──▶ StateStore
//! ```
//!
//! - **Transport**: an HTTP [`Bot`](core::Bot) for the platform API
//! - **Long-poll client**: session acquisition and the `failed` recovery protocol
//! - **Registries**: ordered handlers, each guarded by a filter chain; the
//!   first accepting handler wins
//! - **Filters**: declarative (`state`, `text`, `event_type`) or custom
//! - **State**: per-peer `(state, data)` records in memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ripple::prelude::*;
//!
//! async fn start(msg: Message, state: StateContext, bot: BoxedBot) -> anyhow::Result<()> {
//!     state.set_state("asked_name").await?;
//!     bot.send_message(msg.peer_id, "What is your name?").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = RippleRuntime::builder().config_file("ripple.toml").build()?;
//!     runtime
//!         .dispatcher_mut()
//!         .on_message()
//!         .text("/start")
//!         .state("*")
//!         .handler(start)?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `ripple.toml` files (default)
//! - `json-log`: JSON log output

pub use ripple_core as core;
pub use ripple_framework as framework;
pub use ripple_runtime as runtime;
pub use ripple_transport as transport;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use ripple::prelude::*;
/// ```
pub mod prelude {
    pub use ripple_runtime::{RippleConfig, RippleRuntime, RuntimeBuilder};

    // Registration
    pub use ripple_framework::{Dispatcher, FilterArgs, HandlerBuilder, RegistryKind};

    // Custom filters
    pub use ripple_framework::{
        Extra, ExtraValue, Filter, FilterOutcome, FilterType, STATE_KEY, filter_fn,
    };

    // Handler parameters
    pub use ripple_core::{BoxedBot, Event, EventType, Message, PeerId, StateContext};
    pub use ripple_framework::{FromContext, HandlerContext, PollControl};

    pub use ripple_core::Bot;
    pub use ripple_transport::{HttpBot, HttpBotConfig};
}

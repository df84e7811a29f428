//! # Ripple Core
//!
//! The foundation layer of the Ripple bot framework.
//!
//! This crate provides the types every other layer builds on:
//!
//! - **Errors**: transport, API, decoding and storage failures ([`error`])
//! - **Bot**: the transport capability the long-poll client talks through ([`Bot`])
//! - **Events**: decoding raw long-poll updates into typed [`Event`]s
//! - **Storage**: per-peer `(state, data)` records behind [`StateStore`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌───────────────────┐
//! │  Bot (HTTP)  │────▶│ Long-poll  │────▶│ Dispatcher        │
//! │  transport   │     │ client     │     │ filters/handlers  │──▶ StateStore
//! └──────────────┘     └────────────┘     └───────────────────┘
//! ```

pub mod bot;
pub mod error;
pub mod event;
pub mod storage;

pub use bot::{BoxedBot, Bot, PollParams, downcast_bot, split_api_response};
pub use error::{
    ApiError, ApiResult, DecodeError, DecodeResult, StorageError, StorageResult, TransportError,
    TransportResult,
};
pub use event::{Event, EventType, Message, PeerId};
pub use storage::{
    BoxedStore, DEFAULT_STATE, DisabledStorage, MemoryStorage, PeerState, StateContext, StateData,
    StateStore,
};

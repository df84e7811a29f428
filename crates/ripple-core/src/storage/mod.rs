//! Per-peer conversation state.
//!
//! A [`StateStore`] owns one `(state, data)` record per peer. Two
//! implementations ship with the core:
//!
//! | Store | Behaviour |
//! |-------|-----------|
//! | [`MemoryStorage`] | process-lifetime hash map, records created on first touch |
//! | [`DisabledStorage`] | every operation fails with [`StorageError::Disabled`] |
//!
//! Handlers normally reach the store through a [`StateContext`], a facade
//! bound to a single peer.
//!
//! [`StorageError::Disabled`]: crate::error::StorageError::Disabled

mod context;
mod disabled;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageResult;
use crate::event::PeerId;

pub use context::StateContext;
pub use disabled::DisabledStorage;
pub use memory::MemoryStorage;

/// The reserved state meaning "no active conversation state".
pub const DEFAULT_STATE: &str = "*";

/// The data half of a peer record.
pub type StateData = Map<String, Value>;

/// One peer's record.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerState {
    pub state: String,
    pub data: StateData,
}

impl Default for PeerState {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE.to_string(),
            data: StateData::new(),
        }
    }
}

/// Capability interface for per-peer state storage.
///
/// `state` and `data` are independent: changing one never touches the other.
/// [`update_data`](StateStore::update_data) is a shallow merge, not a replace.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Returns the peer's current state, [`DEFAULT_STATE`] if never set.
    async fn get_state(&self, peer: PeerId) -> StorageResult<String>;

    async fn set_state(&self, peer: PeerId, state: &str) -> StorageResult<()>;

    /// Returns a copy of the peer's data.
    async fn get_data(&self, peer: PeerId) -> StorageResult<StateData>;

    /// Shallow-merges `partial` into the peer's data; later keys win.
    async fn update_data(&self, peer: PeerId, partial: StateData) -> StorageResult<()>;

    /// Releases every record held by the store.
    async fn close(&self) -> StorageResult<()>;

    /// Returns `false` for stores that reject every operation.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A shared state store trait object.
pub type BoxedStore = Arc<dyn StateStore>;

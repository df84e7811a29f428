use async_trait::async_trait;

use super::{StateData, StateStore};
use crate::error::{StorageError, StorageResult};
use crate::event::PeerId;

/// A [`StateStore`] that rejects every operation.
///
/// Installed when a dispatcher is built without persistence, so a handler
/// that touches per-peer state fails with [`StorageError::Disabled`] instead
/// of silently losing writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

#[async_trait]
impl StateStore for DisabledStorage {
    async fn get_state(&self, _peer: PeerId) -> StorageResult<String> {
        Err(StorageError::Disabled)
    }

    async fn set_state(&self, _peer: PeerId, _state: &str) -> StorageResult<()> {
        Err(StorageError::Disabled)
    }

    async fn get_data(&self, _peer: PeerId) -> StorageResult<StateData> {
        Err(StorageError::Disabled)
    }

    async fn update_data(&self, _peer: PeerId, _partial: StateData) -> StorageResult<()> {
        Err(StorageError::Disabled)
    }

    async fn close(&self) -> StorageResult<()> {
        Err(StorageError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

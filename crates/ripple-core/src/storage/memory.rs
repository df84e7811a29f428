use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::{PeerState, StateData, StateStore};
use crate::error::StorageResult;
use crate::event::PeerId;

/// In-memory [`StateStore`].
///
/// Records are created lazily on first access with state `"*"` and empty
/// data. The map sits behind a mutex so one store can be shared by several
/// dispatch loops; callers still serialise logical read-modify-write
/// sequences for a peer themselves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<PeerId, PeerState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of peers with a record.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn with_record<R>(&self, peer: PeerId, f: impl FnOnce(&mut PeerState) -> R) -> R {
        let mut records = self.records.lock();
        let record = records.entry(peer).or_insert_with(|| {
            trace!(peer, "Creating state record");
            PeerState::default()
        });
        f(record)
    }
}

#[async_trait]
impl StateStore for MemoryStorage {
    async fn get_state(&self, peer: PeerId) -> StorageResult<String> {
        Ok(self.with_record(peer, |r| r.state.clone()))
    }

    async fn set_state(&self, peer: PeerId, state: &str) -> StorageResult<()> {
        self.with_record(peer, |r| r.state = state.to_string());
        Ok(())
    }

    async fn get_data(&self, peer: PeerId) -> StorageResult<StateData> {
        Ok(self.with_record(peer, |r| r.data.clone()))
    }

    async fn update_data(&self, peer: PeerId, partial: StateData) -> StorageResult<()> {
        self.with_record(peer, |r| r.data.extend(partial));
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.records.lock().clear();
        Ok(())
    }
}

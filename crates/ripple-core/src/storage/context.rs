use std::fmt;

use super::{BoxedStore, DEFAULT_STATE, StateData};
use crate::error::StorageResult;
use crate::event::PeerId;

/// A [`StateStore`](super::StateStore) bound to one peer.
///
/// Cheap to clone; every clone talks to the same store.
///
/// ```rust,ignore
/// async fn ask_age(state: StateContext, bot: BoxedBot) -> anyhow::Result<()> {
///     state.update_data(json!({ "name": "Ann" }).as_object().cloned().unwrap()).await?;
///     state.set_state("asking_age").await?;
///     bot.send_message(state.peer(), "How old are you?").await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct StateContext {
    store: BoxedStore,
    peer: PeerId,
}

impl StateContext {
    pub fn new(store: BoxedStore, peer: PeerId) -> Self {
        Self { store, peer }
    }

    /// Returns the peer this context is bound to.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub async fn get_state(&self) -> StorageResult<String> {
        self.store.get_state(self.peer).await
    }

    pub async fn set_state(&self, state: &str) -> StorageResult<()> {
        self.store.set_state(self.peer, state).await
    }

    pub async fn get_data(&self) -> StorageResult<StateData> {
        self.store.get_data(self.peer).await
    }

    /// Shallow-merges `partial` into the peer's data.
    pub async fn update_data(&self, partial: StateData) -> StorageResult<()> {
        self.store.update_data(self.peer, partial).await
    }

    /// Resets the peer to the `"*"` no-state sentinel. Data is kept.
    pub async fn finish(&self) -> StorageResult<()> {
        self.store.set_state(self.peer, DEFAULT_STATE).await
    }
}

impl fmt::Debug for StateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateContext")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{DisabledStorage, MemoryStorage};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_context_is_peer_scoped() {
        let store: BoxedStore = Arc::new(MemoryStorage::new());
        let alice = StateContext::new(store.clone(), 1);
        let bob = StateContext::new(store.clone(), 2);

        alice.set_state("greeting").await.unwrap();
        assert_eq!(alice.get_state().await.unwrap(), "greeting");
        assert_eq!(bob.get_state().await.unwrap(), DEFAULT_STATE);
        assert_eq!(store.get_state(1).await.unwrap(), "greeting");
    }

    #[tokio::test]
    async fn test_finish_resets_state_only() {
        let store: BoxedStore = Arc::new(MemoryStorage::new());
        let ctx = StateContext::new(store, 9);

        ctx.set_state("asking").await.unwrap();
        ctx.update_data(json!({ "k": "v" }).as_object().cloned().unwrap())
            .await
            .unwrap();
        ctx.finish().await.unwrap();

        assert_eq!(ctx.get_state().await.unwrap(), DEFAULT_STATE);
        assert_eq!(ctx.get_data().await.unwrap()["k"], json!("v"));
    }

    #[tokio::test]
    async fn test_disabled_store_surfaces_error() {
        let ctx = StateContext::new(Arc::new(DisabledStorage), 1);
        assert_eq!(ctx.finish().await, Err(StorageError::Disabled));
    }
}

//! Per-dispatch context handed to handlers.
//!
//! One [`HandlerContext`] is built for every event that a handler accepts.
//! It carries the event, the extra data the filter chain produced, and the
//! dispatcher's shared resources. Handlers never see it directly; they ask
//! for pieces of it through [`FromContext`](crate::extractor::FromContext).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ripple_core::{BoxedBot, BoxedStore, Event, StateContext, StorageError, StorageResult};

use crate::filter::Extra;

// =============================================================================
// PollControl
// =============================================================================

/// Shared run flag of the polling loop.
///
/// Cloning yields a handle to the same flag, so a handler or a signal task can
/// stop a loop running elsewhere. The loop notices the change after the
/// current poll cycle completes.
#[derive(Debug, Clone, Default)]
pub struct PollControl {
    running: Arc<AtomicBool>,
}

impl PollControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Asks the loop to stop after its current cycle. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// HandlerContext
// =============================================================================

/// Everything a handler may draw its parameters from.
pub struct HandlerContext {
    event: Arc<Event>,
    extra: Extra,
    bot: BoxedBot,
    storage: BoxedStore,
    control: PollControl,
}

impl HandlerContext {
    pub fn new(
        event: Arc<Event>,
        extra: Extra,
        bot: BoxedBot,
        storage: BoxedStore,
        control: PollControl,
    ) -> Self {
        Self {
            event,
            extra,
            bot,
            storage,
            control,
        }
    }

    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    /// Returns the extra data that survived parameter filtering.
    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    pub fn storage(&self) -> &BoxedStore {
        &self.storage
    }

    pub fn control(&self) -> &PollControl {
        &self.control
    }

    /// Returns a [`StateContext`] for the event's peer.
    ///
    /// Fails when storage is disabled or the event has no peer.
    pub fn current_state(&self) -> StorageResult<StateContext> {
        if !self.storage.is_enabled() {
            return Err(StorageError::Disabled);
        }
        let peer = self.event.peer_id().ok_or(StorageError::NoPeer)?;
        Ok(StateContext::new(self.storage.clone(), peer))
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("event", &self.event)
            .field("extra", &self.extra)
            .field("running", &self.control.is_running())
            .finish_non_exhaustive()
    }
}

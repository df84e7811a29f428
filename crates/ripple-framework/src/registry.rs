//! Ordered handler registries.
//!
//! A [`HandlerRegistry`] is an ordered list of handlers, each guarded by a
//! [`FilterChain`]. Registration order is dispatch priority: on
//! [`notify`](HandlerRegistry::notify) the first handler whose chain accepts
//! the event runs, and no later handler is consulted.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use ripple_core::{BoxedBot, BoxedStore, Event};

use crate::context::{HandlerContext, PollControl};
use crate::error::DispatchResult;
use crate::factory::RegistryKind;
use crate::filter::{ChainResult, FilterChain};
use crate::handler::BoxedHandler;

/// Dispatcher resources passed into every handler invocation.
#[derive(Clone)]
pub struct DispatchScope {
    pub bot: BoxedBot,
    pub storage: BoxedStore,
    pub control: PollControl,
}

impl fmt::Debug for DispatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchScope")
            .field("bot_id", &self.bot.id())
            .field("storage_enabled", &self.storage.is_enabled())
            .finish_non_exhaustive()
    }
}

/// A registered handler with its filter chain.
#[derive(Clone)]
pub struct HandlerRecord {
    handler: BoxedHandler,
    params: HashSet<String>,
    chain: FilterChain,
    name: String,
}

impl HandlerRecord {
    pub fn new(
        handler: BoxedHandler,
        params: HashSet<String>,
        chain: FilterChain,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            params,
            chain,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extra-data keys this handler receives.
    pub fn params(&self) -> &HashSet<String> {
        &self.params
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }
}

impl fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("chain", &self.chain)
            .finish()
    }
}

/// An ordered list of handlers for one kind of event.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    kind: RegistryKind,
    records: Vec<HandlerRecord>,
}

impl HandlerRegistry {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Appends a handler; it runs only if every earlier one declines.
    pub fn register(&mut self, record: HandlerRecord) {
        trace!(
            registry = ?self.kind,
            handler = %record.name,
            position = self.records.len(),
            "Registered handler"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[HandlerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Runs the first handler whose chain accepts `event`.
    ///
    /// Returns `Ok(true)` if a handler ran. An event no handler accepts is
    /// dropped without error.
    pub async fn notify(&self, event: Arc<Event>, scope: &DispatchScope) -> DispatchResult<bool> {
        for record in &self.records {
            let mut extra = match record.chain.evaluate(&event).await? {
                ChainResult::Rejected => continue,
                ChainResult::Accepted(extra) => extra,
            };
            extra.retain(|key| record.params.contains(key));

            trace!(handler = %record.name, "Handler matched");
            let ctx = HandlerContext::new(
                event,
                extra,
                scope.bot.clone(),
                scope.storage.clone(),
                scope.control.clone(),
            );
            record.handler.call(Arc::new(ctx)).await?;
            return Ok(true);
        }

        trace!(registry = ?self.kind, "No handler matched");
        Ok(false)
    }
}

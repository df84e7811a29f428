//! The dispatcher: poll, decode, route.
//!
//! A [`Dispatcher`] owns the long-poll client, the filter factory, the state
//! store and two handler registries: one for message events and one for
//! everything else. Each decoded event goes to exactly one registry, where
//! at most one handler runs.
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new(bot, true);
//!
//! dispatcher
//!     .on_message()
//!     .text_startswith("/start")
//!     .ignore_case()
//!     .handler(start)?;
//!
//! dispatcher.on_message().state("asking_name").handler(save_name)?;
//! dispatcher.on_event().event_type("group_join").handler(welcome)?;
//!
//! dispatcher.start_polling().await?;
//! ```
//!
//! Events that no handler accepts are dropped. Registration rejects unknown
//! filter arguments, but a handler whose filters are each valid can still
//! never match; enable `trace` logging for `ripple_framework` to see
//! unmatched events.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, debug_span};

use ripple_core::{
    BoxedBot, BoxedStore, DisabledStorage, Event, MemoryStorage, PeerId, StateContext,
    StorageError, StorageResult,
};

use crate::context::PollControl;
use crate::error::{DispatchError, DispatchResult, FilterResult};
use crate::factory::{FilterArgs, FilterDeps, FilterFactory, FilterType, RegistryKind};
use crate::filter::BoxedFilter;
use crate::handler::{Handler, into_handler};
use crate::longpoll::{LongPollClient, LongPollConfig};
use crate::registry::{DispatchScope, HandlerRecord, HandlerRegistry};

/// Routes long-poll events to filtered handlers.
pub struct Dispatcher {
    scope: DispatchScope,
    factory: FilterFactory,
    message_handlers: HandlerRegistry,
    event_handlers: HandlerRegistry,
    long_poll: Mutex<LongPollClient>,
    polling: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher with the built-in filters bound.
    ///
    /// With `use_storage` the dispatcher keeps per-peer state in memory;
    /// without it every state operation fails with
    /// [`StorageError::Disabled`].
    pub fn new(bot: BoxedBot, use_storage: bool) -> Self {
        let storage: BoxedStore = if use_storage {
            Arc::new(MemoryStorage::new())
        } else {
            Arc::new(DisabledStorage)
        };
        Self::with_storage(bot, storage)
    }

    /// Creates a dispatcher backed by a custom store.
    pub fn with_storage(bot: BoxedBot, storage: BoxedStore) -> Self {
        Self {
            long_poll: Mutex::new(LongPollClient::new(bot.clone())),
            scope: DispatchScope {
                bot,
                storage,
                control: PollControl::new(),
            },
            factory: FilterFactory::with_builtins(),
            message_handlers: HandlerRegistry::new(RegistryKind::Message),
            event_handlers: HandlerRegistry::new(RegistryKind::Event),
            polling: AtomicBool::new(false),
        }
    }

    /// Replaces the long-poll tunables (builder pattern).
    pub fn long_poll_config(mut self, config: LongPollConfig) -> Self {
        self.long_poll = Mutex::new(LongPollClient::with_config(
            self.scope.bot.clone(),
            config,
        ));
        self
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.scope.bot
    }

    pub fn storage(&self) -> &BoxedStore {
        &self.scope.storage
    }

    /// Returns a handle that can stop the polling loop from elsewhere.
    pub fn control(&self) -> PollControl {
        self.scope.control.clone()
    }

    pub fn factory(&self) -> &FilterFactory {
        &self.factory
    }

    pub fn registry(&self, kind: RegistryKind) -> &HandlerRegistry {
        match kind {
            RegistryKind::Message => &self.message_handlers,
            RegistryKind::Event => &self.event_handlers,
        }
    }

    fn registry_mut(&mut self, kind: RegistryKind) -> &mut HandlerRegistry {
        match kind {
            RegistryKind::Message => &mut self.message_handlers,
            RegistryKind::Event => &mut self.event_handlers,
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Binds a declarative filter type to the given registries.
    pub fn bind_filter(
        &mut self,
        filter_type: impl FilterType,
        registries: impl IntoIterator<Item = RegistryKind>,
    ) {
        self.factory.bind(filter_type, registries);
    }

    /// Registers `handler` on the `kind` registry.
    ///
    /// Declarative `args` are resolved through the filter factory before
    /// `filters`; an argument no bound filter type claims fails here with
    /// [`FilterError::UnknownArgument`](crate::FilterError::UnknownArgument).
    pub fn register_handler<H, T>(
        &mut self,
        kind: RegistryKind,
        handler: H,
        args: FilterArgs,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> FilterResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register_with(
            kind,
            handler,
            args,
            filters.into_iter().collect(),
            HashSet::new(),
            None,
        )
    }

    /// Registers a handler for message events.
    pub fn message_handler<H, T>(
        &mut self,
        handler: H,
        args: FilterArgs,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> FilterResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register_handler(RegistryKind::Message, handler, args, filters)
    }

    /// Registers a handler for non-message events.
    pub fn event_handler<H, T>(
        &mut self,
        handler: H,
        args: FilterArgs,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> FilterResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register_handler(RegistryKind::Event, handler, args, filters)
    }

    /// Starts a registration on the message registry.
    pub fn on_message(&mut self) -> HandlerBuilder<'_> {
        HandlerBuilder::new(self, RegistryKind::Message)
    }

    /// Starts a registration on the event registry.
    pub fn on_event(&mut self) -> HandlerBuilder<'_> {
        HandlerBuilder::new(self, RegistryKind::Event)
    }

    fn register_with<H, T>(
        &mut self,
        kind: RegistryKind,
        handler: H,
        args: FilterArgs,
        filters: Vec<BoxedFilter>,
        extra_params: HashSet<String>,
        name: Option<String>,
    ) -> FilterResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        let deps = FilterDeps::new(self.scope.bot.clone(), self.scope.storage.clone());
        let chain = self.factory.resolve(kind, args, filters, &deps)?;

        let mut params: HashSet<String> = H::declared_params()
            .into_iter()
            .map(str::to_string)
            .collect();
        params.extend(extra_params);

        let name = name.unwrap_or_else(|| std::any::type_name::<H>().to_string());
        self.registry_mut(kind)
            .register(HandlerRecord::new(into_handler(handler), params, chain, name));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Returns a [`StateContext`] for `peer`.
    ///
    /// Fails with [`StorageError::Disabled`] when storage is off.
    pub fn current_state(&self, peer: PeerId) -> StorageResult<StateContext> {
        if !self.scope.storage.is_enabled() {
            return Err(StorageError::Disabled);
        }
        Ok(StateContext::new(self.scope.storage.clone(), peer))
    }

    // ------------------------------------------------------------------------
    // Routing and polling
    // ------------------------------------------------------------------------

    /// Routes one event to the registry for its category.
    ///
    /// Returns `Ok(true)` if a handler ran.
    pub async fn route(&self, event: Event) -> DispatchResult<bool> {
        let kind = if event.is_message() {
            RegistryKind::Message
        } else {
            RegistryKind::Event
        };
        let span = debug_span!(
            "dispatch",
            event_type = %event.event_type(),
            peer_id = ?event.peer_id(),
        );

        self.registry(kind)
            .notify(Arc::new(event), &self.scope)
            .instrument(span)
            .await
    }

    /// Runs the poll → decode → route loop until stopped.
    ///
    /// The run flag is checked once per poll cycle; a poll in flight and the
    /// batch it returns are always processed to completion. Any error ends
    /// the loop and is returned.
    pub async fn start_polling(&self) -> DispatchResult<()> {
        if self.polling.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::AlreadyPolling);
        }
        let _guard = PollingGuard {
            polling: &self.polling,
            control: &self.scope.control,
        };
        self.scope.control.start();
        debug!("Polling started");

        let mut client = self.long_poll.lock().await;
        while self.scope.control.is_running() {
            let Some(batch) = client.poll().await?.into_batch() else {
                continue;
            };
            for raw in batch {
                self.route(Event::from_value(raw)?).await?;
            }
        }

        debug!("Polling stopped");
        Ok(())
    }

    /// Asks the loop to stop after its current cycle. Idempotent.
    pub fn stop_polling(&self) {
        self.scope.control.stop();
    }

    /// Returns `true` while [`start_polling`](Self::start_polling) is running.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Stops polling and releases the store.
    pub async fn close(&self) -> StorageResult<()> {
        self.stop_polling();
        if self.scope.storage.is_enabled() {
            self.scope.storage.close().await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("message_handlers", &self.message_handlers.len())
            .field("event_handlers", &self.event_handlers.len())
            .field("storage_enabled", &self.scope.storage.is_enabled())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

/// Clears the polling flags when the loop exits or its future is dropped.
struct PollingGuard<'a> {
    polling: &'a AtomicBool,
    control: &'a PollControl,
}

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.control.stop();
        self.polling.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// HandlerBuilder
// ============================================================================

/// Fluent handler registration.
///
/// Declarative arguments go through the filter factory exactly as with
/// [`Dispatcher::register_handler`].
#[must_use = "a registration does nothing until `handler` is called"]
pub struct HandlerBuilder<'a> {
    dispatcher: &'a mut Dispatcher,
    kind: RegistryKind,
    args: FilterArgs,
    filters: Vec<BoxedFilter>,
    params: HashSet<String>,
    name: Option<String>,
}

impl<'a> HandlerBuilder<'a> {
    fn new(dispatcher: &'a mut Dispatcher, kind: RegistryKind) -> Self {
        Self {
            dispatcher,
            kind,
            args: FilterArgs::new(),
            filters: Vec::new(),
            params: HashSet::new(),
            name: None,
        }
    }

    /// Adds a declarative argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Matches peers in the given state (or list of states).
    pub fn state(self, state: impl Into<Value>) -> Self {
        self.arg("state", state)
    }

    pub fn text(self, text: impl Into<Value>) -> Self {
        self.arg("text", text)
    }

    pub fn text_startswith(self, prefix: impl Into<Value>) -> Self {
        self.arg("text_startswith", prefix)
    }

    pub fn text_endswith(self, suffix: impl Into<Value>) -> Self {
        self.arg("text_endswith", suffix)
    }

    pub fn ignore_case(self) -> Self {
        self.arg("ignore_case", true)
    }

    pub fn event_type(self, event_type: impl Into<Value>) -> Self {
        self.arg("event_type", event_type)
    }

    /// Appends a custom filter after the declarative ones.
    pub fn filter(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Passes extra-data keys through to the handler's [`Extra`](crate::Extra).
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Names the handler in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Finishes the registration.
    pub fn handler<H, T>(self, handler: H) -> FilterResult<()>
    where
        H: Handler<T>,
        T: 'static,
    {
        self.dispatcher.register_with(
            self.kind,
            handler,
            self.args,
            self.filters,
            self.params,
            self.name,
        )
    }
}

//! # Ripple Framework
//!
//! The event pipeline of the Ripple bot framework.
//!
//! This layer provides:
//! - [`LongPollClient`]: the poll session and its failure-recovery protocol
//! - Filters: [`Filter`], [`FilterChain`] and the built-in state, text and
//!   event-type filters
//! - [`FilterFactory`]: declarative filter arguments resolved at registration
//! - Handlers: Axum-style async functions with [`FromContext`] parameters
//! - [`Dispatcher`]: the poll → decode → route loop
//!
//! Everything runs in one cooperative task. A batch is fully dispatched,
//! handlers included, before the next poll is issued.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod factory;
pub mod filter;
pub mod handler;
pub mod longpoll;
pub mod registry;

#[cfg(test)]
mod test_util;

pub use context::{HandlerContext, PollControl};
pub use dispatcher::{Dispatcher, HandlerBuilder};
pub use error::{
    BoxError, DispatchError, DispatchResult, ExtractError, ExtractResult, FilterError,
    FilterResult, LongPollError, LongPollResult,
};
pub use extractor::FromContext;
pub use factory::{FilterArgs, FilterDeps, FilterFactory, FilterRecord, FilterType, RegistryKind};
pub use filter::{
    BoxedFilter, ChainResult, EventTypeFilter, EventTypeFilterType, Extra, ExtraValue, Filter,
    FilterChain, FilterOutcome, FnFilter, STATE_KEY, StateFilter, StateFilterType, TextFilter,
    TextFilterType, TextMatch, filter_fn,
};
pub use handler::{
    BoxedHandler, ErasedHandler, Handler, HandlerFn, HandlerResult, IntoHandlerResult,
    into_handler,
};
pub use longpoll::{
    DEFAULT_MODE, DEFAULT_VERSION, DEFAULT_WAIT, LongPollClient, LongPollConfig, PollOutcome,
    PollSession,
};
pub use registry::{DispatchScope, HandlerRecord, HandlerRegistry};

//! Extractor system for the Ripple framework.
//!
//! This module provides the [`FromContext`] trait, which defines how types
//! can be extracted from a [`HandlerContext`] for use as handler parameters.
//!
//! An extractor may also declare the key of the filter extra data it reads.
//! Those keys are collected once at registration time; on dispatch, extra
//! data is narrowed to the declared set before the handler sees it.

use std::sync::Arc;

use ripple_core::{BoxedBot, Event, Message, StateContext};

use crate::context::{HandlerContext, PollControl};
use crate::error::{ExtractError, ExtractResult};
use crate::filter::{Extra, STATE_KEY};

/// A type that can be extracted from a [`HandlerContext`].
///
/// # Example
///
/// ```rust,ignore
/// struct Text(String);
///
/// impl FromContext for Text {
///     fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
///         ctx.event()
///             .text()
///             .map(|t| Text(t.to_string()))
///             .ok_or_else(|| ExtractError::custom("event has no text"))
///     }
/// }
/// ```
pub trait FromContext: Sized {
    /// The extra-data key this extractor reads, if any.
    fn declared_key() -> Option<&'static str> {
        None
    }

    /// Attempts to extract this type from the given context.
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self>;
}

impl FromContext for Arc<Event> {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.event().clone())
    }
}

/// The decoded message of a message-category event.
impl FromContext for Message {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        ctx.event()
            .message()
            .cloned()
            .ok_or_else(|| ExtractError::NotAMessage(ctx.event().event_type().to_string()))
    }
}

/// The peer's state, as attached by the state filter.
///
/// Falls back to binding the dispatcher's store to the event's peer when
/// the handler was registered without a state filter.
impl FromContext for StateContext {
    fn declared_key() -> Option<&'static str> {
        Some(STATE_KEY)
    }

    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        match ctx.extra().get_state(STATE_KEY) {
            Some(state) => Ok(state.clone()),
            None => Ok(ctx.current_state()?),
        }
    }
}

/// The filter extra data that survived parameter narrowing.
impl FromContext for Extra {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.extra().clone())
    }
}

impl FromContext for BoxedBot {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.bot().clone())
    }
}

impl FromContext for PollControl {
    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.control().clone())
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn declared_key() -> Option<&'static str> {
        T::declared_key()
    }

    fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::NullBot;
    use ripple_core::{BoxedStore, DisabledStorage, MemoryStorage, StorageError};
    use serde_json::json;

    fn context(event: Event, extra: Extra, storage: BoxedStore) -> HandlerContext {
        HandlerContext::new(
            Arc::new(event),
            extra,
            Arc::new(NullBot),
            storage,
            PollControl::new(),
        )
    }

    #[test]
    fn test_message_extraction() {
        let ctx = context(
            Event::message_new(7, "yo"),
            Extra::new(),
            Arc::new(MemoryStorage::new()),
        );
        let message = Message::from_context(&ctx).unwrap();
        assert_eq!(message.peer_id, 7);
        assert_eq!(message.text, "yo");

        let join = context(
            Event::from_parts("group_join".into(), json!({})).unwrap(),
            Extra::new(),
            Arc::new(MemoryStorage::new()),
        );
        assert!(matches!(
            Message::from_context(&join),
            Err(ExtractError::NotAMessage(t)) if t == "group_join"
        ));
        assert!(Option::<Message>::from_context(&join).unwrap().is_none());
    }

    #[test]
    fn test_state_prefers_filter_data() {
        let store: BoxedStore = Arc::new(MemoryStorage::new());
        let attached = StateContext::new(store.clone(), 99);
        let ctx = context(
            Event::message_new(1, "x"),
            Extra::new().with(STATE_KEY, attached),
            store,
        );
        assert_eq!(StateContext::from_context(&ctx).unwrap().peer(), 99);
    }

    #[test]
    fn test_state_falls_back_to_event_peer() {
        let ctx = context(
            Event::message_new(5, "x"),
            Extra::new(),
            Arc::new(MemoryStorage::new()),
        );
        assert_eq!(StateContext::from_context(&ctx).unwrap().peer(), 5);

        let disabled = context(Event::message_new(5, "x"), Extra::new(), Arc::new(DisabledStorage));
        assert!(matches!(
            StateContext::from_context(&disabled),
            Err(ExtractError::Storage(StorageError::Disabled))
        ));
    }

    #[test]
    fn test_declared_keys() {
        assert_eq!(StateContext::declared_key(), Some("state"));
        assert_eq!(Option::<StateContext>::declared_key(), Some("state"));
        assert_eq!(Extra::declared_key(), None);
        assert_eq!(Message::declared_key(), None);
    }
}

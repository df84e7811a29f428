//! Filter system for the Ripple framework.
//!
//! A [`Filter`] is a single async predicate over an [`Event`]. Its answer is a
//! [`FilterOutcome`]: reject, accept, or accept and contribute named values
//! ([`Extra`]) that handlers can receive as parameters.
//!
//! Bare functions are lifted into the same interface with [`filter_fn`], so
//! the chain evaluator never needs to know which kind it is running:
//!
//! ```rust,ignore
//! use ripple_framework::filter::{filter_fn, FilterChain};
//!
//! let chain = FilterChain::new()
//!     .with(filter_fn(|event: &Event| event.text().is_some_and(|t| t.len() < 200)))
//!     .with(TextFilter::starts_with(["/"]));
//! ```

mod chain;
mod event_type;
mod state;
mod text;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ripple_core::{Event, StateContext};

use crate::error::FilterResult;

pub use chain::{ChainResult, FilterChain};
pub use event_type::{EventTypeFilter, EventTypeFilterType};
pub use state::{STATE_KEY, StateFilter, StateFilterType};
pub use text::{TextFilter, TextFilterType, TextMatch};

// ============================================================================
// Extra data
// ============================================================================

/// A value contributed by a filter on acceptance.
#[derive(Clone)]
pub enum ExtraValue {
    Json(Value),
    State(StateContext),
    Any(Arc<dyn Any + Send + Sync>),
}

impl ExtraValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&StateContext> {
        match self {
            Self::State(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for ExtraValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::State(ctx) => f.debug_tuple("State").field(ctx).finish(),
            Self::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl From<Value> for ExtraValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<StateContext> for ExtraValue {
    fn from(ctx: StateContext) -> Self {
        Self::State(ctx)
    }
}

/// Named values accumulated while a filter chain accepts an event.
#[derive(Debug, Clone, Default)]
pub struct Extra {
    values: HashMap<String, ExtraValue>,
}

impl Extra {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.values.get(key)
    }

    /// Returns a JSON value stored under `key`.
    pub fn get_json(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(ExtraValue::as_json)
    }

    /// Returns the [`StateContext`] stored under `key`.
    pub fn get_state(&self, key: &str) -> Option<&StateContext> {
        self.get(key).and_then(ExtraValue::as_state)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Merges `other` into `self`; keys in `other` overwrite existing ones.
    pub fn merge(&mut self, other: Extra) {
        self.values.extend(other.values);
    }

    /// Keeps only the entries whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.values.retain(|k, _| keep(k));
    }
}

impl<K: Into<String>, V: Into<ExtraValue>> FromIterator<(K, V)> for Extra {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// Filter trait
// ============================================================================

/// The result of a single filter check.
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    /// The event does not match; the chain stops here.
    Reject,
    /// The event matches and contributes nothing.
    Accept,
    /// The event matches and contributes named values.
    AcceptWith(Extra),
}

impl FilterOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Reject)
    }
}

impl From<bool> for FilterOutcome {
    fn from(matched: bool) -> Self {
        if matched { Self::Accept } else { Self::Reject }
    }
}

impl From<Extra> for FilterOutcome {
    fn from(extra: Extra) -> Self {
        Self::AcceptWith(extra)
    }
}

impl From<Option<Extra>> for FilterOutcome {
    fn from(extra: Option<Extra>) -> Self {
        extra.map_or(Self::Reject, Self::AcceptWith)
    }
}

/// A single async predicate over an event.
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    /// Checks the event.
    async fn check(&self, event: &Event) -> FilterResult<FilterOutcome>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A shared filter trait object.
pub type BoxedFilter = Arc<dyn Filter>;

/// Adapter lifting a synchronous function into a [`Filter`].
pub struct FnFilter<F> {
    f: F,
}

#[async_trait]
impl<F, O> Filter for FnFilter<F>
where
    F: Fn(&Event) -> O + Send + Sync + 'static,
    O: Into<FilterOutcome> + Send + 'static,
{
    async fn check(&self, event: &Event) -> FilterResult<FilterOutcome> {
        Ok((self.f)(event).into())
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Wraps a bare predicate so it can sit in a [`FilterChain`].
///
/// The function may return `bool`, [`Extra`], `Option<Extra>` or a
/// [`FilterOutcome`].
pub fn filter_fn<F, O>(f: F) -> BoxedFilter
where
    F: Fn(&Event) -> O + Send + Sync + 'static,
    O: Into<FilterOutcome> + Send + 'static,
{
    Arc::new(FnFilter { f })
}

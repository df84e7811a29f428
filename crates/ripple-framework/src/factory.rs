//! Declarative filter resolution.
//!
//! Handlers are registered with keyword-style [`FilterArgs`] such as
//! `state = "greeting"` or `text_startswith = ["/start"]`. The
//! [`FilterFactory`] turns those arguments into a [`FilterChain`]:
//!
//! 1. Every bound [`FilterType`] applicable to the target registry is asked,
//!    in bind order, which of the remaining arguments it claims.
//! 2. Claimed arguments are removed and handed to the type's `build`.
//! 3. Custom filters supplied by the caller are appended unvalidated.
//! 4. Anything left unclaimed fails with [`FilterError::UnknownArgument`],
//!    so a typo in a registration never turns into a silently-ignored filter.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use ripple_core::{BoxedBot, BoxedStore};

use crate::error::{FilterError, FilterResult};
use crate::filter::{
    BoxedFilter, EventTypeFilterType, FilterChain, StateFilterType, TextFilterType,
};

/// Identifies one of the dispatcher's handler registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    /// Handlers for message-category events.
    Message,
    /// Handlers for every other event type.
    Event,
}

// ============================================================================
// FilterArgs
// ============================================================================

/// Keyword arguments for declarative filters.
///
/// ```rust,ignore
/// let args = FilterArgs::new()
///     .arg("state", "greeting")
///     .arg("text", json!(["hi", "hello"]))
///     .arg("ignore_case", true);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    args: BTreeMap<String, Value>,
}

impl FilterArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument (builder pattern).
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.args.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.args.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns the argument names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    /// Moves the given keys out into a new argument set.
    pub fn take(&mut self, keys: &BTreeSet<String>) -> FilterArgs {
        let args = keys
            .iter()
            .filter_map(|k| self.args.remove_entry(k))
            .collect();
        FilterArgs { args }
    }

    /// Returns the subset of `names` present in these arguments, or `None`
    /// if none are.
    pub fn claim(&self, names: &[&str]) -> Option<BTreeSet<String>> {
        let claimed: BTreeSet<String> = names
            .iter()
            .filter(|name| self.contains_key(name))
            .map(|name| name.to_string())
            .collect();
        (!claimed.is_empty()).then_some(claimed)
    }
}

/// Reads a string or a list of strings.
pub(crate) fn string_values(
    filter: &'static str,
    key: &str,
    value: &Value,
) -> FilterResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    FilterError::invalid(filter, format!("'{key}' entries must be strings"))
                })
            })
            .collect(),
        other => Err(FilterError::invalid(
            filter,
            format!("'{key}' must be a string or a list of strings, got {other}"),
        )),
    }
}

// ============================================================================
// FilterType
// ============================================================================

/// Dependencies a filter type may need when it is instantiated.
#[derive(Clone)]
pub struct FilterDeps {
    bot: BoxedBot,
    storage: BoxedStore,
}

impl FilterDeps {
    pub fn new(bot: BoxedBot, storage: BoxedStore) -> Self {
        Self { bot, storage }
    }

    /// Returns the bot the dispatcher serves.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns the dispatcher's state store.
    pub fn storage(&self) -> &BoxedStore {
        &self.storage
    }
}

/// A declarative filter kind.
pub trait FilterType: Send + Sync + 'static {
    /// Name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Returns the argument names this type claims, or `None`.
    fn validate(&self, args: &FilterArgs) -> Option<BTreeSet<String>>;

    /// Builds a filter from the claimed arguments.
    fn build(&self, args: FilterArgs, deps: &FilterDeps) -> FilterResult<BoxedFilter>;
}

/// A bound filter type and the registries it may attach to.
#[derive(Clone)]
pub struct FilterRecord {
    filter_type: Arc<dyn FilterType>,
    registries: HashSet<RegistryKind>,
}

impl FilterRecord {
    pub fn filter_type(&self) -> &Arc<dyn FilterType> {
        &self.filter_type
    }

    pub fn applies_to(&self, kind: RegistryKind) -> bool {
        self.registries.contains(&kind)
    }
}

impl fmt::Debug for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRecord")
            .field("filter_type", &self.filter_type.name())
            .field("registries", &self.registries)
            .finish()
    }
}

// ============================================================================
// FilterFactory
// ============================================================================

/// Turns declarative arguments plus custom filters into a [`FilterChain`].
#[derive(Debug, Clone, Default)]
pub struct FilterFactory {
    records: Vec<FilterRecord>,
}

impl FilterFactory {
    /// Creates a factory with no bound filter types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with the built-in filter types bound:
    ///
    /// | Type | Arguments | Registries |
    /// |------|-----------|------------|
    /// | state | `state` | message |
    /// | text | `text`, `text_startswith`, `text_endswith`, `ignore_case` | message |
    /// | event type | `event_type` | event |
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.bind(StateFilterType, [RegistryKind::Message]);
        factory.bind(TextFilterType, [RegistryKind::Message]);
        factory.bind(EventTypeFilterType, [RegistryKind::Event]);
        factory
    }

    /// Binds a filter type to the given registries.
    pub fn bind(
        &mut self,
        filter_type: impl FilterType,
        registries: impl IntoIterator<Item = RegistryKind>,
    ) {
        self.records.push(FilterRecord {
            filter_type: Arc::new(filter_type),
            registries: registries.into_iter().collect(),
        });
    }

    pub fn records(&self) -> &[FilterRecord] {
        &self.records
    }

    /// Resolves a filter chain for a handler on `target`.
    ///
    /// Declarative filters come first, in bind order, followed by `custom`
    /// filters in the order given.
    pub fn resolve(
        &self,
        target: RegistryKind,
        mut args: FilterArgs,
        custom: impl IntoIterator<Item = BoxedFilter>,
        deps: &FilterDeps,
    ) -> FilterResult<FilterChain> {
        let mut chain = FilterChain::new();

        for record in self.records.iter().filter(|r| r.applies_to(target)) {
            let Some(claimed) = record.filter_type.validate(&args) else {
                continue;
            };
            let claimed: BTreeSet<String> = claimed
                .into_iter()
                .filter(|k| args.contains_key(k))
                .collect();
            if claimed.is_empty() {
                continue;
            }

            debug!(
                filter = record.filter_type.name(),
                args = ?claimed,
                "Resolved declarative filter"
            );
            let own = args.take(&claimed);
            chain.push(record.filter_type.build(own, deps)?);
        }

        for filter in custom {
            chain.push(filter);
        }

        if !args.is_empty() {
            return Err(FilterError::UnknownArgument {
                registry: target,
                keys: args.keys().map(str::to_string).collect(),
            });
        }

        Ok(chain)
    }
}

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use ripple_core::{BoxedStore, DEFAULT_STATE, Event, PeerId, StateContext};

use super::{BoxedFilter, Extra, Filter, FilterOutcome};
use crate::error::{FilterError, FilterResult};
use crate::factory::{FilterArgs, FilterDeps, FilterType, string_values};

/// Key under which the per-peer [`StateContext`] is attached on acceptance.
pub const STATE_KEY: &str = "state";

/// Matches events whose peer is in one of the configured states.
///
/// The `"*"` state matches every peer regardless of what is stored. Either
/// way an accepted event carries a [`StateContext`] bound to its peer.
/// Events without a peer are rejected.
pub struct StateFilter {
    states: HashSet<String>,
    store: BoxedStore,
}

impl StateFilter {
    pub fn new<I, S>(states: I, store: BoxedStore) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: states.into_iter().map(Into::into).collect(),
            store,
        }
    }

    pub fn states(&self) -> &HashSet<String> {
        &self.states
    }

    fn accept(&self, peer: PeerId) -> FilterOutcome {
        let ctx = StateContext::new(self.store.clone(), peer);
        FilterOutcome::AcceptWith(Extra::new().with(STATE_KEY, ctx))
    }
}

#[async_trait]
impl Filter for StateFilter {
    async fn check(&self, event: &Event) -> FilterResult<FilterOutcome> {
        let Some(peer) = event.peer_id() else {
            return Ok(FilterOutcome::Reject);
        };

        if self.states.contains(DEFAULT_STATE) {
            return Ok(self.accept(peer));
        }

        let current = self.store.get_state(peer).await?;
        if self.states.contains(&current) {
            Ok(self.accept(peer))
        } else {
            Ok(FilterOutcome::Reject)
        }
    }

    fn name(&self) -> &str {
        "state"
    }
}

/// Declarative form of [`StateFilter`], claiming the `state` argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateFilterType;

impl FilterType for StateFilterType {
    fn name(&self) -> &'static str {
        "state"
    }

    fn validate(&self, args: &FilterArgs) -> Option<BTreeSet<String>> {
        args.claim(&["state"])
    }

    fn build(&self, args: FilterArgs, deps: &FilterDeps) -> FilterResult<BoxedFilter> {
        let value = args
            .get("state")
            .ok_or_else(|| FilterError::invalid("state", "missing 'state'"))?;
        let states = string_values("state", "state", value)?;
        if states.is_empty() {
            return Err(FilterError::invalid("state", "at least one state is required"));
        }
        Ok(Arc::new(StateFilter::new(states, deps.storage().clone())))
    }
}

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use ripple_core::{Event, EventType};

use super::{BoxedFilter, Filter, FilterOutcome};
use crate::error::{FilterError, FilterResult};
use crate::factory::{FilterArgs, FilterDeps, FilterType, string_values};

/// Matches events of the given types.
#[derive(Debug, Clone)]
pub struct EventTypeFilter {
    types: HashSet<EventType>,
}

impl EventTypeFilter {
    pub fn new<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EventType>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Filter for EventTypeFilter {
    async fn check(&self, event: &Event) -> FilterResult<FilterOutcome> {
        Ok(self.types.contains(event.event_type()).into())
    }

    fn name(&self) -> &str {
        "event_type"
    }
}

/// Declarative form of [`EventTypeFilter`], claiming `event_type`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTypeFilterType;

impl FilterType for EventTypeFilterType {
    fn name(&self) -> &'static str {
        "event_type"
    }

    fn validate(&self, args: &FilterArgs) -> Option<BTreeSet<String>> {
        args.claim(&["event_type"])
    }

    fn build(&self, args: FilterArgs, _deps: &FilterDeps) -> FilterResult<BoxedFilter> {
        let value = args
            .get("event_type")
            .ok_or_else(|| FilterError::invalid("event_type", "missing 'event_type'"))?;
        let types = string_values("event_type", "event_type", value)?;
        Ok(Arc::new(EventTypeFilter::new(
            types.iter().map(String::as_str),
        )))
    }
}

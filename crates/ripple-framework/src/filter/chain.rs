use std::fmt;

use tracing::trace;

use ripple_core::Event;

use super::{BoxedFilter, Extra, FilterOutcome};
use crate::error::FilterResult;

/// The verdict of a whole [`FilterChain`].
#[derive(Debug, Clone)]
pub enum ChainResult {
    Rejected,
    /// Every filter accepted; carries the merged extra data.
    Accepted(Extra),
}

impl ChainResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// An ordered list of filters that must all accept an event.
///
/// Evaluation short-circuits on the first rejection. Extra data from
/// accepting filters is merged in order, later keys overwriting earlier
/// ones. An empty chain accepts everything.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<BoxedFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter (builder pattern).
    pub fn with(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: BoxedFilter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxedFilter> {
        self.filters.iter()
    }

    /// Runs the chain against `event`.
    pub async fn evaluate(&self, event: &Event) -> FilterResult<ChainResult> {
        let mut extra = Extra::new();

        for filter in &self.filters {
            match filter.check(event).await? {
                FilterOutcome::Reject => {
                    trace!(filter = filter.name(), "Filter rejected event");
                    return Ok(ChainResult::Rejected);
                }
                FilterOutcome::Accept => {}
                FilterOutcome::AcceptWith(data) => extra.merge(data),
            }
        }

        Ok(ChainResult::Accepted(extra))
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

impl FromIterator<BoxedFilter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = BoxedFilter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ripple_core::Event;

use super::{BoxedFilter, Filter, FilterOutcome};
use crate::error::{FilterError, FilterResult};
use crate::factory::{FilterArgs, FilterDeps, FilterType, string_values};

const MODE_KEYS: [(&str, TextMatch); 3] = [
    ("text", TextMatch::Equals),
    ("text_startswith", TextMatch::StartsWith),
    ("text_endswith", TextMatch::EndsWith),
];

/// How a [`TextFilter`] compares the message text to its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// The text equals one of the values.
    Equals,
    /// The text starts with any of the values.
    StartsWith,
    /// The text ends with any of the values.
    EndsWith,
}

/// Matches message text against a set of values.
///
/// ```rust,ignore
/// let filter = TextFilter::starts_with(["/cmd"]).ignore_case();
/// ```
#[derive(Debug, Clone)]
pub struct TextFilter {
    mode: TextMatch,
    values: Vec<String>,
    ignore_case: bool,
}

impl TextFilter {
    pub fn new<I, S>(mode: TextMatch, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            values: values.into_iter().map(Into::into).collect(),
            ignore_case: false,
        }
    }

    pub fn equals<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(TextMatch::Equals, values)
    }

    pub fn starts_with<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(TextMatch::StartsWith, values)
    }

    pub fn ends_with<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(TextMatch::EndsWith, values)
    }

    /// Compares case-insensitively (builder pattern).
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        for value in &mut self.values {
            *value = value.to_lowercase();
        }
        self
    }

    pub fn mode(&self) -> TextMatch {
        self.mode
    }

    /// Returns `true` if `text` matches.
    pub fn matches(&self, text: &str) -> bool {
        let text = if self.ignore_case {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        match self.mode {
            TextMatch::Equals => self.values.iter().any(|v| *v == text),
            TextMatch::StartsWith => self.values.iter().any(|v| text.starts_with(v.as_str())),
            TextMatch::EndsWith => self.values.iter().any(|v| text.ends_with(v.as_str())),
        }
    }
}

#[async_trait]
impl Filter for TextFilter {
    async fn check(&self, event: &Event) -> FilterResult<FilterOutcome> {
        Ok(event.text().is_some_and(|text| self.matches(text)).into())
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Declarative form of [`TextFilter`].
///
/// Claims `text`, `text_startswith`, `text_endswith` and `ignore_case`.
/// Exactly one of the first three must be given.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFilterType;

impl FilterType for TextFilterType {
    fn name(&self) -> &'static str {
        "text"
    }

    fn validate(&self, args: &FilterArgs) -> Option<BTreeSet<String>> {
        args.claim(&["text", "text_startswith", "text_endswith", "ignore_case"])
    }

    fn build(&self, args: FilterArgs, _deps: &FilterDeps) -> FilterResult<BoxedFilter> {
        let modes: Vec<(&str, TextMatch)> = MODE_KEYS
            .into_iter()
            .filter(|(key, _)| args.contains_key(key))
            .collect();

        let (key, mode) = match modes.as_slice() {
            [single] => *single,
            [] => {
                return Err(FilterError::invalid(
                    "text",
                    "one of 'text', 'text_startswith' or 'text_endswith' is required",
                ));
            }
            _ => {
                return Err(FilterError::invalid(
                    "text",
                    "'text', 'text_startswith' and 'text_endswith' are mutually exclusive",
                ));
            }
        };

        let values = args
            .get(key)
            .map(|value| string_values("text", key, value))
            .transpose()?
            .unwrap_or_default();

        let ignore_case = match args.get("ignore_case") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(FilterError::invalid(
                    "text",
                    format!("'ignore_case' must be a boolean, got {other}"),
                ));
            }
        };

        let filter = TextFilter::new(mode, values);
        let filter = if ignore_case { filter.ignore_case() } else { filter };
        Ok(Arc::new(filter))
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection of tests to run by key, name, category, tag or ticket.
//!
//! Filters are written as `kind:pattern`, where the pattern is a case-insensitive glob. A filter
//! without a recognized kind prefix matches any of a test's attributes.

use crate::{errors::FilterParseError, listener::TestDescription, metadata::ResolvedMetadata};
use globset::{GlobBuilder, GlobMatcher};
use std::{fmt, str::FromStr};
use tracing::debug;

/// The attribute a [`FilterDefinition`] matches against.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FilterKind {
    /// Any of the attributes below, or the test's technical name.
    Any,

    /// The test's explicit key.
    Key,

    /// The test's display name.
    Name,

    /// The test's category.
    Category,

    /// One of the test's tags.
    Tag,

    /// One of the test's tickets.
    Ticket,
}

impl FilterKind {
    /// Returns the string forms accepted for each kind.
    pub fn variants() -> &'static [&'static str] {
        &["*", "key", "name", "category", "tag", "ticket"]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Any => "*",
            Self::Key => "key",
            Self::Name => "name",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Ticket => "ticket",
        }
    }
}

impl FromStr for FilterKind {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "*" | "any" => Self::Any,
            "key" => Self::Key,
            "name" => Self::Name,
            "category" => Self::Category,
            "tag" => Self::Tag,
            "ticket" => Self::Ticket,
            _ => {
                return Err(FilterParseError::UnknownKind {
                    input: s.to_owned(),
                });
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed filter.
#[derive(Clone, Debug)]
pub struct FilterDefinition {
    kind: FilterKind,
    pattern: String,
    matcher: GlobMatcher,
}

impl FilterDefinition {
    /// Parses a filter of the form `kind:pattern` or `pattern`.
    ///
    /// Text before the first `:` that is not a known kind is treated as part of the pattern.
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let (kind, pattern) = match input.split_once(':') {
            Some((prefix, rest)) => match prefix.parse::<FilterKind>() {
                Ok(kind) => (kind, rest),
                Err(_) => (FilterKind::Any, input),
            },
            None => (FilterKind::Any, input),
        };
        Self::new(kind, pattern)
    }

    /// Creates a filter of the given kind.
    pub fn new(kind: FilterKind, pattern: &str) -> Result<Self, FilterParseError> {
        let pattern = pattern.trim();
        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(false)
            .build()
            .map_err(|error| FilterParseError::InvalidPattern {
                pattern: pattern.to_owned(),
                error,
            })?
            .compile_matcher();
        Ok(Self {
            kind,
            pattern: pattern.to_owned(),
            matcher,
        })
    }

    /// Returns the kind of this filter.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Returns the glob pattern of this filter.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the test matches this filter.
    pub fn matches(&self, description: &TestDescription, metadata: &ResolvedMetadata) -> bool {
        let is_match = |value: &str| self.matcher.is_match(value);
        match self.kind {
            FilterKind::Any => {
                metadata.key.as_deref().is_some_and(is_match)
                    || is_match(&metadata.name)
                    || is_match(&metadata.category)
                    || metadata.tags.iter().any(|tag| is_match(tag))
                    || metadata.tickets.iter().any(|ticket| is_match(ticket))
                    || is_match(&description.identity.technical_name())
            }
            FilterKind::Key => metadata.key.as_deref().is_some_and(is_match),
            FilterKind::Name => is_match(&metadata.name),
            FilterKind::Category => is_match(&metadata.category),
            FilterKind::Tag => metadata.tags.iter().any(|tag| is_match(tag)),
            FilterKind::Ticket => metadata.tickets.iter().any(|ticket| is_match(ticket)),
        }
    }

    fn same_as(&self, other: &Self) -> bool {
        self.kind == other.kind && self.pattern.eq_ignore_ascii_case(&other.pattern)
    }
}

impl fmt::Display for FilterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.pattern)
    }
}

/// A set of filters deciding which tests run.
///
/// Containers always run. A test runs if there are no filters, or if any filter matches it.
#[derive(Clone, Debug, Default)]
pub struct TestFilter {
    filters: Vec<FilterDefinition>,
}

impl TestFilter {
    /// Creates a filter that lets every test run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and adds filters, ignoring any that duplicate an existing filter.
    pub fn add_filters<I, S>(&mut self, inputs: I) -> Result<&mut Self, FilterParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for input in inputs {
            self.add_filter(FilterDefinition::parse(input.as_ref())?);
        }
        Ok(self)
    }

    /// Adds a filter, ignoring it if it duplicates an existing one.
    ///
    /// Filters are compared by kind and case-insensitive pattern.
    pub fn add_filter(&mut self, filter: FilterDefinition) -> &mut Self {
        if self.filters.iter().any(|existing| existing.same_as(&filter)) {
            debug!("ignoring duplicate filter `{filter}`");
        } else {
            self.filters.push(filter);
        }
        self
    }

    /// Returns the filters in this set.
    pub fn filters(&self) -> &[FilterDefinition] {
        &self.filters
    }

    /// Returns true if the given node should run.
    pub fn should_run(&self, description: &TestDescription, metadata: &ResolvedMetadata) -> bool {
        if !description.is_test() || self.filters.is_empty() {
            return true;
        }
        self.filters
            .iter()
            .any(|filter| filter.matches(description, metadata))
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::human_name;
use crate::config::ListenerConfig;
use std::collections::BTreeSet;
use testdock_metadata::{MetadataOverride, TestIdentity};

/// The category used when no other level supplies one.
pub const DEFAULT_CATEGORY: &str = "unit";

/// The tag added to every test when `implicit-unit-tag` is enabled.
pub const UNIT_TAG: &str = "unit";

/// The effective metadata for one test, after precedence has been applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedMetadata {
    /// The explicit key from the method override.
    pub key: Option<String>,

    /// The display name.
    pub name: String,

    /// The category.
    pub category: String,

    /// Tags: the union of configuration, class and method tags.
    pub tags: BTreeSet<String>,

    /// Tickets: the union of configuration, class and method tickets.
    pub tickets: BTreeSet<String>,

    /// Contributors: the union of class and method contributors.
    pub contributors: BTreeSet<String>,

    /// The method's explicit active flag. `None` means no override; callers treat it as active.
    pub active: Option<bool>,
}

/// Resolves effective metadata for tests.
///
/// Each field is resolved independently. For scalar fields the first level that supplies a value
/// wins, in the order method override, class override, configuration, listener fallback, built-in
/// default. Set-valued fields are unions across levels.
#[derive(Clone, Copy, Debug)]
pub struct MetadataResolver<'cfg> {
    config: &'cfg ListenerConfig,
    fallback_category: Option<&'cfg str>,
}

impl<'cfg> MetadataResolver<'cfg> {
    /// Creates a new resolver.
    ///
    /// `fallback_category` is the listener-level category, consulted after the configuration.
    pub fn new(config: &'cfg ListenerConfig, fallback_category: Option<&'cfg str>) -> Self {
        Self {
            config,
            fallback_category,
        }
    }

    /// Resolves metadata for a test given its optional method and class overrides.
    pub fn resolve(
        &self,
        identity: &TestIdentity,
        method: Option<&MetadataOverride>,
        class: Option<&MetadataOverride>,
    ) -> ResolvedMetadata {
        ResolvedMetadata {
            key: method.and_then(|m| m.key()).map(str::to_owned),
            name: self.name(identity, method),
            category: self.category(method, class).to_owned(),
            tags: self.tags(method, class),
            tickets: self.tickets(method, class),
            contributors: contributors(method, class),
            active: method.and_then(|m| m.active),
        }
    }

    fn name(&self, identity: &TestIdentity, method: Option<&MetadataOverride>) -> String {
        match method.and_then(|m| m.name()) {
            Some(name) => name.to_owned(),
            None => human_name(identity),
        }
    }

    fn category<'a>(
        &'a self,
        method: Option<&'a MetadataOverride>,
        class: Option<&'a MetadataOverride>,
    ) -> &'a str {
        method
            .and_then(|m| m.category())
            .or_else(|| class.and_then(|c| c.category()))
            .or_else(|| self.config.category())
            .or(self.fallback_category)
            .unwrap_or(DEFAULT_CATEGORY)
    }

    fn tags(
        &self,
        method: Option<&MetadataOverride>,
        class: Option<&MetadataOverride>,
    ) -> BTreeSet<String> {
        let mut tags = union(self.config.tags(), class.map(|c| &c.tags), method.map(|m| &m.tags));
        if self.config.implicit_unit_tag() {
            tags.insert(UNIT_TAG.to_owned());
        }
        tags
    }

    fn tickets(
        &self,
        method: Option<&MetadataOverride>,
        class: Option<&MetadataOverride>,
    ) -> BTreeSet<String> {
        union(
            self.config.tickets(),
            class.map(|c| &c.tickets),
            method.map(|m| &m.tickets),
        )
    }
}

fn contributors(
    method: Option<&MetadataOverride>,
    class: Option<&MetadataOverride>,
) -> BTreeSet<String> {
    union(
        &BTreeSet::new(),
        class.map(|c| &c.contributors),
        method.map(|m| &m.contributors),
    )
}

fn union(
    global: &BTreeSet<String>,
    class: Option<&BTreeSet<String>>,
    method: Option<&BTreeSet<String>>,
) -> BTreeSet<String> {
    global
        .iter()
        .chain(class.into_iter().flatten())
        .chain(method.into_iter().flatten())
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}

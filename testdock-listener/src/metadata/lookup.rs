// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use testdock_metadata::{MetadataOverride, TestIdentity};

/// Retrieves declarative metadata attached to tests.
///
/// A lookup that finds nothing returns `None`; that is an expected outcome at both levels and is
/// treated exactly like "no override present".
pub trait MetadataLookup: Send {
    /// Returns the override attached to the test method, if any.
    ///
    /// Implementations should ignore any parameter suffix on the method name (see
    /// [`TestIdentity::base_method_name`]) so that every instance of a parameterized test shares
    /// its method's metadata.
    fn method_override(&self, identity: &TestIdentity) -> Option<MetadataOverride>;

    /// Returns the override attached to the type declaring the test, if any.
    fn class_override(&self, identity: &TestIdentity) -> Option<MetadataOverride>;
}

/// A lookup that never finds any metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMetadata;

impl MetadataLookup for NoMetadata {
    fn method_override(&self, _identity: &TestIdentity) -> Option<MetadataOverride> {
        None
    }

    fn class_override(&self, _identity: &TestIdentity) -> Option<MetadataOverride> {
        None
    }
}

/// A lookup backed by metadata registered up front, keyed by type and method name.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataLookup {
    classes: HashMap<String, MetadataOverride>,
    methods: HashMap<(String, String), MetadataOverride>,
}

impl StaticMetadataLookup {
    /// Creates an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an override for every test declared by the given type.
    pub fn add_class(
        &mut self,
        type_name: impl Into<String>,
        metadata: MetadataOverride,
    ) -> &mut Self {
        self.classes.insert(type_name.into(), metadata);
        self
    }

    /// Registers an override for a single test method.
    pub fn add_method(
        &mut self,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
        metadata: MetadataOverride,
    ) -> &mut Self {
        self.methods
            .insert((type_name.into(), method_name.into()), metadata);
        self
    }
}

impl MetadataLookup for StaticMetadataLookup {
    fn method_override(&self, identity: &TestIdentity) -> Option<MetadataOverride> {
        let key = (
            identity.type_name.clone(),
            identity.base_method_name().into_owned(),
        );
        self.methods.get(&key).cloned()
    }

    fn class_override(&self, identity: &TestIdentity) -> Option<MetadataOverride> {
        self.classes.get(&identity.type_name).cloned()
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::listener::TestDescription;
use indexmap::IndexMap;

/// A pluggable source of extra key-value metadata for test results.
///
/// Extractors are registered on a listener and called in registration order. `before` runs when a
/// test starts and `after` when it completes; `extract` is called when the test's result is
/// assembled, and its pairs are merged into the result's data (later extractors win on key
/// collisions).
pub trait MetadataExtractor: Send {
    /// Called when a test starts.
    fn before(&mut self, _description: &TestDescription) {}

    /// Called when a test finishes or fails.
    fn after(&mut self, _description: &TestDescription) {}

    /// Returns the key-value pairs to attach to the test's result.
    fn extract(&self, description: &TestDescription) -> IndexMap<String, String>;
}

/// Records where a test is declared: its namespace, type and method.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardMetadataExtractor;

impl MetadataExtractor for StandardMetadataExtractor {
    fn extract(&self, description: &TestDescription) -> IndexMap<String, String> {
        let identity = &description.identity;
        IndexMap::from([
            ("test.namespace".to_owned(), identity.namespace.clone()),
            ("test.type".to_owned(), identity.type_name.clone()),
            ("test.method".to_owned(), identity.method_name.clone()),
        ])
    }
}

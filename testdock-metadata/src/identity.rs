// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// The structural identity of a single test: where it lives and what it is called.
///
/// Identities are produced by the host test framework for each event. Every component is treated
/// as an opaque string.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestIdentity {
    /// The enclosing namespace, e.g. a crate or module path.
    pub namespace: String,

    /// The fully qualified name of the type (or module) declaring the test.
    pub type_name: String,

    /// The name of the test method or function.
    pub method_name: String,
}

impl TestIdentity {
    /// Creates a new identity from its three components.
    pub fn new(
        namespace: impl Into<String>,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            type_name: type_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Returns the last segment of the declaring type name.
    ///
    /// Both `::` and `.` are recognized as path separators.
    pub fn simple_type_name(&self) -> &str {
        let last = self
            .type_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.type_name);
        last.rsplit('.').next().unwrap_or(last)
    }

    /// Returns the method name with any bracketed parameter suffix removed.
    ///
    /// Parameterized tests are reported as `name[params]`; declarative metadata is attached to
    /// `name`, so lookups use this form.
    pub fn base_method_name(&self) -> Cow<'_, str> {
        let name = self.method_name.as_str();
        match (name.find('['), name.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                let mut base = String::with_capacity(name.len());
                base.push_str(&name[..start]);
                base.push_str(&name[end + 1..]);
                Cow::Owned(base)
            }
            _ => Cow::Borrowed(name),
        }
    }

    /// Returns the technical name of the test, in the form `type.method`.
    pub fn technical_name(&self) -> String {
        format!("{}.{}", self.type_name, self.method_name)
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method_name)
    }
}

/// A stable identity string for a test.
///
/// Fingerprints join a test's start and completion events within a run, and join local results
/// with previously published history across runs. They must never change for an unchanged test.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-computed fingerprint string.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }

    /// Returns the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::FailureDetail;
use chrono::{DateTime, FixedOffset, Local};
use testdock_metadata::TestIdentity;

/// A node in the host framework's test tree, as reported with each event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestDescription {
    /// The identity of the node.
    pub identity: TestIdentity,

    /// Whether the node is an executable test or a container of tests.
    pub kind: DescriptionKind,
}

impl TestDescription {
    /// Creates a description of an executable (leaf) test.
    pub fn test(identity: TestIdentity) -> Self {
        Self {
            identity,
            kind: DescriptionKind::Test,
        }
    }

    /// Creates a description of a suite or other container node.
    pub fn suite(identity: TestIdentity) -> Self {
        Self {
            identity,
            kind: DescriptionKind::Suite,
        }
    }

    /// Returns true if this node is an executable test.
    pub fn is_test(&self) -> bool {
        self.kind == DescriptionKind::Test
    }

    /// Returns the header used when logging about this test, in the form `method(type)`.
    pub fn header(&self) -> String {
        format!(
            "{}({})",
            self.identity.method_name, self.identity.type_name
        )
    }
}

/// The kind of node a [`TestDescription`] refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptionKind {
    /// An executable test.
    Test,

    /// A suite or other container. Events for containers are ignored.
    Suite,
}

/// An event delivered by the host test framework.
///
/// For one run, `RunStarted` comes first and `RunFinished` last; everything else arrives in
/// between, serially.
#[derive(Clone, Debug)]
pub struct ListenerEvent {
    /// The time at which the event was generated.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of event.
    pub kind: ListenerEventKind,
}

impl ListenerEvent {
    /// Creates an event of the given kind, timestamped now.
    pub fn now(kind: ListenerEventKind) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }

    /// Creates an event of the given kind with an explicit timestamp.
    pub fn at(timestamp: DateTime<FixedOffset>, kind: ListenerEventKind) -> Self {
        Self { timestamp, kind }
    }
}

/// The kind of a [`ListenerEvent`].
#[derive(Clone, Debug)]
pub enum ListenerEventKind {
    /// The run started.
    RunStarted,

    /// A test started executing.
    TestStarted {
        /// The test that started.
        description: TestDescription,
    },

    /// A test finished executing. This is also delivered for failed tests and for tests whose
    /// assumptions failed.
    TestFinished {
        /// The test that finished.
        description: TestDescription,
    },

    /// A test failed.
    TestFailed {
        /// The test that failed.
        description: TestDescription,

        /// What went wrong.
        failure: FailureDetail,
    },

    /// A test's assumption did not hold. The test is reported as an inactive pass when it
    /// finishes.
    TestAssumptionFailed {
        /// The test whose assumption failed.
        description: TestDescription,
    },

    /// A test was skipped before execution.
    ///
    /// The host never starts or finishes such tests, so no result is ever recorded for them.
    TestIgnored {
        /// The test that was skipped.
        description: TestDescription,
    },

    /// The run finished.
    RunFinished,
}

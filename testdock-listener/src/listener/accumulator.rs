// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciles the event stream for one run into a list of results.
//!
//! The host framework's events are irregular:
//!
//! * a failing test produces a failure event *and* a finished event;
//! * a test whose assumption failed starts and finishes normally, and must be reported inactive;
//! * a skipped test never starts or finishes.
//!
//! The accumulator tracks per-test state keyed by fingerprint so that each test yields at most
//! one result, and a failure always wins over a finish for the same test.

use super::TestDescription;
use crate::{config::ListenerConfig, errors::RunInconsistency, metadata::ResolvedMetadata};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::{collections::HashMap, time::Duration};
use testdock_metadata::{Fingerprint, ReporterInfo, RunContext, TestResult, TestRun};
use tracing::{debug, warn};

/// Everything known about a test at the time one of its events is handled.
#[derive(Clone, Debug)]
pub struct TestInfo {
    /// The test's fingerprint.
    pub fingerprint: Fingerprint,

    /// The node the event was reported for.
    pub description: TestDescription,

    /// The test's resolved metadata.
    pub metadata: ResolvedMetadata,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TestState {
    NotStarted,
    Running,
    RecordedPass,
    RecordedFail,
}

#[derive(Clone, Debug)]
struct TestEntry {
    state: TestState,
    started_at: Option<DateTime<FixedOffset>>,
    // Set by assumption failures and skips; demotes the eventual result to inactive.
    ignored: bool,
}

impl TestEntry {
    fn new() -> Self {
        Self {
            state: TestState::NotStarted,
            started_at: None,
            ignored: false,
        }
    }
}

/// Per-run reconciliation state.
///
/// One accumulator is created per run and consumed by [`finish`](Self::finish). It is a
/// single-writer structure; see [`SharedListener`](crate::listener::SharedListener) for hosts
/// that deliver events from several threads.
#[derive(Debug)]
pub struct RunAccumulator {
    started_at: DateTime<FixedOffset>,
    tests: HashMap<Fingerprint, TestEntry>,
    results: IndexMap<Fingerprint, TestResult>,
    inconsistencies: Vec<RunInconsistency>,
}

impl RunAccumulator {
    /// Creates an accumulator for a run that started at the given time.
    pub fn new(started_at: DateTime<FixedOffset>) -> Self {
        Self {
            started_at,
            tests: HashMap::new(),
            results: IndexMap::new(),
            inconsistencies: Vec::new(),
        }
    }

    /// Returns the time the run started.
    pub fn started_at(&self) -> DateTime<FixedOffset> {
        self.started_at
    }

    /// Returns the results recorded so far, in insertion order.
    pub fn results(&self) -> impl ExactSizeIterator<Item = &TestResult> {
        self.results.values()
    }

    /// Returns the internal inconsistencies noticed so far.
    pub fn inconsistencies(&self) -> &[RunInconsistency] {
        &self.inconsistencies
    }

    /// Handles a test starting.
    ///
    /// Containers are ignored.
    pub fn test_started(&mut self, test: &TestInfo, timestamp: DateTime<FixedOffset>) {
        if !test.description.is_test() {
            return;
        }

        let entry = self.entry(&test.fingerprint);
        if entry.state != TestState::NotStarted {
            debug!(
                "test {} ({}) started again in state {:?}",
                test.description.identity, test.fingerprint, entry.state,
            );
        }
        entry.started_at = Some(timestamp);
        if entry.state == TestState::NotStarted {
            entry.state = TestState::Running;
        }
    }

    /// Handles a test finishing.
    ///
    /// Records a pass unless a result was already recorded for the test. Containers are ignored.
    pub fn test_finished(
        &mut self,
        test: &TestInfo,
        data: IndexMap<String, String>,
        timestamp: DateTime<FixedOffset>,
    ) {
        if !test.description.is_test() {
            return;
        }

        let state = self.entry(&test.fingerprint).state;
        match state {
            TestState::RecordedFail => {
                debug!(
                    "test {} already failed, not recording a pass",
                    test.description.identity
                );
            }
            TestState::RecordedPass => {
                debug!(
                    "test {} already recorded, ignoring duplicate finish",
                    test.description.identity
                );
            }
            TestState::NotStarted | TestState::Running => {
                let result = self.assemble(test, true, None, data, timestamp);
                self.results.insert(test.fingerprint.clone(), result);
                self.entry(&test.fingerprint).state = TestState::RecordedPass;
            }
        }
    }

    /// Handles a test failing.
    ///
    /// Records a failure, replacing a pass if one was already recorded for the test. Containers
    /// are ignored.
    pub fn test_failed(
        &mut self,
        test: &TestInfo,
        message: String,
        data: IndexMap<String, String>,
        timestamp: DateTime<FixedOffset>,
    ) {
        if !test.description.is_test() {
            return;
        }

        let state = self.entry(&test.fingerprint).state;
        if state == TestState::RecordedFail {
            debug!(
                "test {} already failed, ignoring duplicate failure",
                test.description.identity
            );
            return;
        }

        let result = self.assemble(test, false, Some(message), data, timestamp);
        // Replacing keeps the original position for a test that was recorded as a pass first.
        self.results.insert(test.fingerprint.clone(), result);
        self.entry(&test.fingerprint).state = TestState::RecordedFail;
    }

    /// Handles a test's assumption failing.
    ///
    /// No result is recorded here: the finish event that follows records it, demoted to inactive.
    pub fn assumption_failed(&mut self, fingerprint: &Fingerprint) {
        self.entry(fingerprint).ignored = true;
    }

    /// Handles a test being skipped.
    ///
    /// The host never starts or finishes skipped tests, so no result is ever recorded for them.
    pub fn test_ignored(&mut self, fingerprint: &Fingerprint) {
        self.entry(fingerprint).ignored = true;
    }

    /// Finishes the run, assembling the recorded results into a [`TestRun`].
    ///
    /// Returns `None` if no results were recorded. Tests that started but never completed are
    /// dropped.
    pub fn finish(self, config: &ListenerConfig, ended_at: DateTime<FixedOffset>) -> Option<TestRun> {
        let incomplete: Vec<_> = self
            .tests
            .iter()
            .filter(|(_, entry)| entry.state == TestState::Running)
            .map(|(fingerprint, _)| fingerprint.as_str())
            .collect();
        if !incomplete.is_empty() {
            warn!(
                "{} test(s) started but never completed, dropping: {}",
                incomplete.len(),
                incomplete.join(", "),
            );
        }

        if self.results.is_empty() {
            debug!("no test results recorded, nothing to report");
            return None;
        }

        let mut properties = IndexMap::new();
        properties.insert("os".to_owned(), std::env::consts::OS.to_owned());
        properties.insert("arch".to_owned(), std::env::consts::ARCH.to_owned());

        Some(TestRun {
            project_api_id: config.project().api_id().map(str::to_owned),
            project_version: config.project().version().map(str::to_owned),
            pipeline: config.pipeline().map(str::to_owned),
            stage: config.stage().map(str::to_owned),
            duration: (ended_at - self.started_at).to_std().unwrap_or_default(),
            results: self.results.into_values().collect(),
            context: RunContext {
                started_at: self.started_at,
                ended_at,
                reporter: ReporterInfo {
                    name: env!("CARGO_PKG_NAME").to_owned(),
                    version: env!("CARGO_PKG_VERSION").to_owned(),
                },
                properties,
            },
        })
    }

    // ---
    // Helper methods
    // ---

    fn entry(&mut self, fingerprint: &Fingerprint) -> &mut TestEntry {
        self.tests
            .entry(fingerprint.clone())
            .or_insert_with(TestEntry::new)
    }

    fn assemble(
        &mut self,
        test: &TestInfo,
        passed: bool,
        message: Option<String>,
        data: IndexMap<String, String>,
        timestamp: DateTime<FixedOffset>,
    ) -> TestResult {
        let entry = self.entry(&test.fingerprint).clone();
        let duration = self.duration(test, entry.started_at, timestamp);
        let metadata = &test.metadata;

        TestResult {
            key: metadata.key.clone(),
            fingerprint: test.fingerprint.clone(),
            name: metadata.name.clone(),
            category: metadata.category.clone(),
            duration,
            passed,
            active: metadata.active.unwrap_or(true) && !entry.ignored,
            message,
            tags: metadata.tags.clone(),
            tickets: metadata.tickets.clone(),
            contributors: metadata.contributors.clone(),
            data,
        }
    }

    fn duration(
        &mut self,
        test: &TestInfo,
        started_at: Option<DateTime<FixedOffset>>,
        timestamp: DateTime<FixedOffset>,
    ) -> Duration {
        let inconsistency = match started_at {
            Some(started_at) => match (timestamp - started_at).to_std() {
                Ok(duration) => return duration,
                Err(_) => RunInconsistency::NegativeDuration {
                    fingerprint: test.fingerprint.clone(),
                    identity: test.description.identity.clone(),
                    elapsed: started_at - timestamp,
                },
            },
            None => RunInconsistency::MissingStartTime {
                fingerprint: test.fingerprint.clone(),
                identity: test.description.identity.clone(),
            },
        };

        warn!("{inconsistency}; reporting a duration of zero");
        self.inconsistencies.push(inconsistency);
        Duration::ZERO
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Fingerprint, serde_helpers::duration_millis};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, time::Duration};

/// The finalized record for one test in one run.
///
/// A result is created exactly once per test per run and is not modified afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult {
    /// The explicit key declared for the test, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// The stable identity of the test.
    pub fingerprint: Fingerprint,

    /// The display name of the test.
    pub name: String,

    /// The category of the test.
    pub category: String,

    /// How long the test took. Serialized as milliseconds.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// True if the test passed.
    pub passed: bool,

    /// False if the test is inactive, e.g. because an assumption did not hold.
    pub active: bool,

    /// The rendered failure, for failed tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Tags associated with the test.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Tickets associated with the test.
    #[serde(default)]
    pub tickets: BTreeSet<String>,

    /// Contributors associated with the test.
    #[serde(default)]
    pub contributors: BTreeSet<String>,

    /// Extra metadata, in the order it was extracted.
    #[serde(default)]
    pub data: IndexMap<String, String>,
}

/// An assembled test run, ready to be saved or published.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestRun {
    /// The identifier of the project the run belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_api_id: Option<String>,

    /// The version of the project under test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_version: Option<String>,

    /// The pipeline label for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,

    /// The stage label for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// The wall-clock duration of the whole run. Serialized as milliseconds.
    #[serde(with = "duration_millis")]
    pub duration: Duration,

    /// The results, in the order they were recorded.
    pub results: Vec<TestResult>,

    /// Information about the environment the run happened in.
    pub context: RunContext,
}

impl TestRun {
    /// Returns the number of passing results.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|result| result.passed).count()
    }

    /// Returns the number of failing results.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|result| !result.passed).count()
    }

    /// Returns the number of inactive results.
    pub fn inactive_count(&self) -> usize {
        self.results.iter().filter(|result| !result.active).count()
    }
}

/// Information about the environment a run happened in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunContext {
    /// The time at which the run started.
    pub started_at: DateTime<FixedOffset>,

    /// The time at which the run finished.
    pub ended_at: DateTime<FixedOffset>,

    /// The reporter that produced the run.
    pub reporter: ReporterInfo,

    /// Other properties of the environment, such as the host OS.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// The name and version of the reporter that produced a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterInfo {
    /// The reporter name.
    pub name: String,

    /// The reporter version.
    pub version: String,
}

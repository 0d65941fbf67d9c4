// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testdock.
//!
//! None of these are ever propagated into the host test framework: the listener logs them and
//! carries on.

use camino::Utf8PathBuf;
use chrono::TimeDelta;
use config::ConfigError;
use std::{error, fmt};
use testdock_metadata::{Fingerprint, TestIdentity};
use thiserror::Error;

/// An error that occurred while reading the listener configuration.
#[derive(Debug, Error)]
#[error("failed to read testdock config from `{source_name}`")]
#[non_exhaustive]
pub struct ConfigReadError {
    source_name: String,
    #[source]
    err: ConfigError,
}

impl ConfigReadError {
    pub(crate) fn new(source_name: impl Into<String>, err: ConfigError) -> Self {
        Self {
            source_name: source_name.into(),
            err,
        }
    }

    /// Returns the name of the source (usually a file path) that failed to be read.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

/// An error that occurred while parsing a test filter.
#[derive(Debug, Error)]
pub enum FilterParseError {
    /// The filter kind was not recognized.
    #[error(
        "unrecognized filter kind `{input}`\n(known kinds: {})",
        crate::filter::FilterKind::variants().join(", "),
    )]
    UnknownKind {
        /// The kind that was provided.
        input: String,
    },

    /// The filter pattern is not a valid glob.
    #[error("invalid filter pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern that was provided.
        pattern: String,

        /// The underlying error.
        #[source]
        error: globset::Error,
    },
}

/// Which sink an outcome or error refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SinkKind {
    /// Saving the run to local storage.
    Save,

    /// Publishing the run over the network.
    Publish,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

/// The configuration is inconsistent with an enabled sink, so that sink was skipped.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SinkConfigError {
    /// The sink needs a project API identifier but none was configured.
    #[error("{sink} is enabled but `project.api-id` is not set")]
    MissingProjectApiId {
        /// The sink that was skipped.
        sink: SinkKind,
    },

    /// The sink is enabled but no implementation for it was provided.
    #[error("{sink} is enabled but no {sink} sink is configured")]
    NotConfigured {
        /// The sink that was skipped.
        sink: SinkKind,
    },
}

/// An error that occurred while saving a test run to local storage.
#[derive(Debug, Error)]
pub enum SaveRunError {
    /// Error creating the directory the run is saved to.
    #[error("failed to create directory `{path}`")]
    CreateDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// Error serializing the run.
    #[error("failed to serialize test run for `{path}`")]
    Serialize {
        /// The path the run was going to be written to.
        path: Utf8PathBuf,

        /// The underlying serialization error.
        #[source]
        error: serde_json::Error,
    },

    /// Error writing the run to disk.
    #[error("failed to write test run to `{path}`")]
    Write {
        /// The path that failed to be written.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while publishing a test run.
#[derive(Debug, Error)]
pub enum PublishRunError {
    /// Error serializing the run.
    #[error("failed to serialize test run")]
    Serialize(#[source] serde_json::Error),

    /// The request could not be completed.
    #[error("failed to send test run to `{url}`")]
    Request {
        /// The URL the run was sent to.
        url: String,

        /// The underlying transport error.
        #[source]
        error: Box<ureq::Error>,
    },

    /// The server rejected the run.
    #[error("server at `{url}` rejected test run with status {status}")]
    Status {
        /// The URL the run was sent to.
        url: String,

        /// The HTTP status code returned.
        status: u16,
    },
}

/// An internal inconsistency noticed while reconciling events.
///
/// Inconsistencies never abort a run: the affected result is still produced, and the inconsistency
/// is logged and kept for inspection.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunInconsistency {
    /// A test completed without a recorded start time. Its duration was reported as zero.
    #[error("test `{identity}` ({fingerprint}) completed without a recorded start time")]
    MissingStartTime {
        /// The fingerprint of the test.
        fingerprint: Fingerprint,

        /// The identity of the test.
        identity: TestIdentity,
    },

    /// A test completed before it started. Its duration was reported as zero.
    #[error("test `{identity}` ({fingerprint}) completed {elapsed} before it started")]
    NegativeDuration {
        /// The fingerprint of the test.
        fingerprint: Fingerprint,

        /// The identity of the test.
        identity: TestIdentity,

        /// How long before the start time the completion was observed.
        elapsed: TimeDelta,
    },
}

/// Displays an error along with the chain of errors that caused it.
pub struct DisplayErrorChain<E> {
    error: E,
    initial_indent: usize,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain` for the given error.
    pub fn new(error: E) -> Self {
        Self {
            error,
            initial_indent: 0,
        }
    }

    /// Creates a new `DisplayErrorChain` with the given initial indent.
    pub fn new_with_initial_indent(initial_indent: usize, error: E) -> Self {
        Self {
            error,
            initial_indent,
        }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = " ".repeat(self.initial_indent);
        write!(f, "{indent}{}", self.error)?;

        let mut source = self.error.source();
        if source.is_none() {
            return Ok(());
        }

        write!(f, "\n{indent}  caused by:")?;
        while let Some(err) = source {
            write!(f, "\n{indent}  - {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

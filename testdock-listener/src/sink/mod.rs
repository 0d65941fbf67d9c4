// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destinations for finished test runs.
//!
//! A run can be saved to local storage and published to a remote server. The two are independent:
//! either, both or neither may be enabled, and a failure in one never prevents the other.

mod dispatcher;
mod file_store;
mod publisher;

pub use dispatcher::*;
pub use file_store::*;
pub use publisher::*;

use crate::errors::{PublishRunError, SaveRunError};
use testdock_metadata::TestRun;

/// Saves finished runs to local storage.
pub trait RunStore: Send {
    /// Saves a run.
    fn save(&mut self, run: &TestRun) -> Result<(), SaveRunError>;
}

/// Publishes finished runs to a remote server.
pub trait RunPublisher: Send {
    /// Sends a run.
    fn send(&mut self, run: &TestRun) -> Result<(), PublishRunError>;
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Serializable data model for test runs collected by
//! [testdock-listener](https://docs.rs/testdock-listener).
//!
//! The types here are what a listener hands to its sinks: one [`TestRun`] per completed run,
//! containing one [`TestResult`] per reported test. The model carries no logic
//! about how results are derived from test events.

mod identity;
mod overrides;
mod run;
mod serde_helpers;

pub use identity::*;
pub use overrides::*;
pub use run::*;

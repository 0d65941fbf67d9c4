// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! A test-run listener for testdock.
//!
//! The listener sits inside a host test framework, receives lifecycle events for every test, and
//! turns each run into a deduplicated list of results with resolved metadata. Finished runs are
//! handed to the configured sinks: saved to local storage, published to a server, or both.
//!
//! For the basic flow, see [`listener::ListenerBuilder`] and [`sink::SinkDispatcher`].

pub mod config;
pub mod errors;
pub mod filter;
pub mod fingerprint;
pub mod listener;
pub mod metadata;
pub mod sink;

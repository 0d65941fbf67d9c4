// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The listener: receives lifecycle events from the host test framework and turns each run into
//! a [`TestRun`](testdock_metadata::TestRun).
//!
//! The entry point is [`ListenerBuilder`]. The built [`ResultListener`] handles one event at a
//! time; wrap it in a [`SharedListener`] if the host delivers events from several threads.

mod accumulator;
mod events;
mod failure;
mod imp;

pub use accumulator::*;
pub use events::*;
pub use failure::*;
pub use imp::*;

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative test metadata: looking it up, resolving it against the configuration, and
//! extracting extra key-value data for results.

mod extractor;
mod inflector;
mod lookup;
mod resolver;

pub use extractor::*;
pub use inflector::human_name;
pub use lookup::*;
pub use resolver::*;

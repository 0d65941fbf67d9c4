// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of test failures into the text stored on failed results.

use super::TestDescription;
use std::fmt;
use swrite::{SWrite, swrite, swriteln};
use tracing::info;

/// What went wrong in a failed test, as reported by the host framework.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FailureDetail {
    /// A short failure message.
    pub message: Option<String>,

    /// The error that caused the failure, if any.
    pub error: Option<ErrorDetail>,
}

impl FailureDetail {
    /// Creates a failure with only a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error: None,
        }
    }
}

/// An error, its stack frames, and the error that caused it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorDetail {
    /// The qualified name of the error's type.
    pub type_name: String,

    /// The error message.
    pub message: Option<String>,

    /// Stack frames, innermost first.
    pub frames: Vec<StackFrame>,

    /// The error that caused this one.
    pub cause: Option<Box<ErrorDetail>>,
}

/// A single stack frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackFrame {
    /// The qualified name of the type (or module) declaring the function.
    pub type_name: String,

    /// The function or method name.
    pub method: String,

    /// The source file, if known.
    pub file: Option<String>,

    /// The line number, if known.
    pub line: Option<u32>,
}

impl StackFrame {
    /// Creates a new stack frame.
    pub fn new(
        type_name: impl Into<String>,
        method: impl Into<String>,
        file: Option<&str>,
        line: Option<u32>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
            file: file.map(str::to_owned),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}",
            self.type_name,
            self.method,
            self.file.as_deref().unwrap_or("Unknown Source")
        )?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ")")
    }
}

/// Renders failures into deterministic multi-line text.
#[derive(Clone, Copy, Debug)]
pub struct FailureRenderer {
    full_stack_traces: bool,
}

impl FailureRenderer {
    /// Creates a new renderer.
    ///
    /// With `full_stack_traces` off, frames stop at the first frame belonging to the failing
    /// test's own type, and causes are omitted.
    pub fn new(full_stack_traces: bool) -> Self {
        Self { full_stack_traces }
    }

    /// Renders the failure, logging the result along with the test header.
    pub fn render(&self, description: &TestDescription, failure: &FailureDetail) -> String {
        let mut out = String::new();

        if let Some(message) = failure.message.as_deref().filter(|m| !m.is_empty()) {
            swrite!(out, "Failure message: {message}");
        }

        if let Some(error) = &failure.error {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            let message = error
                .message
                .as_deref()
                .or(failure.message.as_deref())
                .unwrap_or_default();
            swriteln!(out, "{}: {}", error.type_name, message);

            for frame in &error.frames {
                swriteln!(out, "\tat {frame}");
                if !self.full_stack_traces && frame.type_name == description.identity.type_name {
                    out.push_str("\t...\n");
                    break;
                }
            }

            if self.full_stack_traces {
                if let Some(cause) = &error.cause {
                    swriteln!(out, "Cause: {}", cause.message.as_deref().unwrap_or_default());
                    for frame in &cause.frames {
                        swriteln!(out, "\tat {frame}");
                    }
                }
            }
        }

        if !out.is_empty() {
            info!("\n{}\n{}", description.header(), out);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use testdock_metadata::TestIdentity;

    const TEST_TYPE: &str = "calc::tests::CalculatorTest";

    fn description() -> TestDescription {
        TestDescription::test(TestIdentity::new("calc", TEST_TYPE, "adds"))
    }

    fn failure() -> FailureDetail {
        FailureDetail {
            message: Some("expected true".to_owned()),
            error: Some(ErrorDetail {
                type_name: "core::panicking::AssertionError".to_owned(),
                message: Some("expected true".to_owned()),
                frames: vec![
                    StackFrame::new("core::panicking", "panic", Some("panicking.rs"), Some(72)),
                    StackFrame::new(TEST_TYPE, "adds", Some("calc.rs"), Some(10)),
                    StackFrame::new("test::runner", "run_test", None, None),
                ],
                cause: Some(Box::new(ErrorDetail {
                    type_name: "std::io::Error".to_owned(),
                    message: Some("connection reset".to_owned()),
                    frames: vec![StackFrame::new("std::net", "read", Some("net.rs"), Some(5))],
                    cause: None,
                })),
            }),
        }
    }

    #[test]
    fn render_full() {
        let rendered = FailureRenderer::new(true).render(&description(), &failure());
        assert_eq!(
            rendered,
            indoc! {"
                Failure message: expected true

                core::panicking::AssertionError: expected true
                \tat core::panicking.panic(panicking.rs:72)
                \tat calc::tests::CalculatorTest.adds(calc.rs:10)
                \tat test::runner.run_test(Unknown Source)
                Cause: connection reset
                \tat std::net.read(net.rs:5)
            "}
        );
    }

    #[test]
    fn render_truncated() {
        let rendered = FailureRenderer::new(false).render(&description(), &failure());
        assert_eq!(
            rendered,
            indoc! {"
                Failure message: expected true

                core::panicking::AssertionError: expected true
                \tat core::panicking.panic(panicking.rs:72)
                \tat calc::tests::CalculatorTest.adds(calc.rs:10)
                \t...
            "}
        );
    }

    #[test]
    fn render_message_only() {
        let rendered = FailureRenderer::new(true)
            .render(&description(), &FailureDetail::with_message("expected true"));
        assert_eq!(rendered, "Failure message: expected true");
    }

    #[test]
    fn render_error_without_message() {
        let mut failure = failure();
        failure.message = None;
        if let Some(error) = &mut failure.error {
            error.frames.truncate(1);
            error.cause = None;
        }
        let rendered = FailureRenderer::new(true).render(&description(), &failure);
        assert_eq!(
            rendered,
            "core::panicking::AssertionError: expected true\n\
             \tat core::panicking.panic(panicking.rs:72)\n"
        );
    }

    #[test]
    fn render_empty() {
        let rendered = FailureRenderer::new(true).render(&description(), &FailureDetail::default());
        assert_eq!(rendered, "");
    }

    #[test]
    fn render_is_deterministic() {
        let renderer = FailureRenderer::new(true);
        assert_eq!(
            renderer.render(&description(), &failure()),
            renderer.render(&description(), &failure())
        );
    }
}

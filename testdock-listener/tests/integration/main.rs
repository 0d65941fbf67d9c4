// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: events in, runs out through the real file store.

use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use chrono::{DateTime, FixedOffset, TimeDelta};
use indoc::formatdoc;
use pretty_assertions::assert_eq;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use testdock_listener::{
    config::ListenerConfig,
    errors::PublishRunError,
    listener::{
        ErrorDetail, FailureDetail, ListenerBuilder, ListenerEvent, ListenerEventKind,
        StackFrame, TestDescription,
    },
    metadata::{NoMetadata, StaticMetadataLookup},
    sink::{RunPublisher, SinkDispatcher, SinkOutcome},
};
use testdock_metadata::{MetadataOverride, TestIdentity, TestRun};

const TEST_TYPE: &str = "calc::CalculatorTest";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn at(millis: i64) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-05-01T10:00:00+02:00").unwrap() + TimeDelta::milliseconds(millis)
}

fn test(method: &str) -> TestDescription {
    TestDescription::test(TestIdentity::new("calc", TEST_TYPE, method))
}

fn event(millis: i64, kind: ListenerEventKind) -> ListenerEvent {
    ListenerEvent::at(at(millis), kind)
}

fn config_file(dir: &Utf8Path) -> ListenerConfig {
    let path = dir.join("testdock.toml");
    std::fs::write(
        &path,
        formatdoc! {r#"
            save = true
            publish = true
            full-stack-traces = false

            [project]
            api-id = "calc"
            version = "1.2.0"

            [store]
            dir = "{store}"
        "#, store = dir.join("runs")},
    )
    .unwrap();
    ListenerConfig::from_sources(Some(path.as_path()), dir).unwrap()
}

#[derive(Clone, Default)]
struct CapturingPublisher(Arc<Mutex<Vec<TestRun>>>);

impl RunPublisher for CapturingPublisher {
    fn send(&mut self, run: &TestRun) -> Result<(), PublishRunError> {
        self.0.lock().unwrap().push(run.clone());
        Ok(())
    }
}

#[test]
fn pass_fail_and_ignored() {
    init_tracing();
    let dir = Utf8TempDir::new().unwrap();
    let config = config_file(dir.path());
    let published = CapturingPublisher::default();

    let mut dispatcher = SinkDispatcher::from_config(&config);
    dispatcher.set_publisher(published.clone());
    let mut listener = ListenerBuilder::new().build(&config, Box::new(NoMetadata), dispatcher);

    let failure = FailureDetail {
        message: Some("expected true".to_owned()),
        error: Some(ErrorDetail {
            type_name: "calc::AssertionError".to_owned(),
            message: None,
            frames: vec![
                StackFrame::new("calc::assert", "check", Some("assert.rs"), Some(3)),
                StackFrame::new(TEST_TYPE, "b", Some("calc.rs"), Some(20)),
                StackFrame::new("test::runner", "run", None, None),
            ],
            cause: None,
        }),
    };

    for event in [
        event(0, ListenerEventKind::RunStarted),
        event(0, ListenerEventKind::TestStarted { description: test("a") }),
        event(50, ListenerEventKind::TestFinished { description: test("a") }),
        event(50, ListenerEventKind::TestStarted { description: test("b") }),
        event(
            60,
            ListenerEventKind::TestFailed {
                description: test("b"),
                failure,
            },
        ),
        event(60, ListenerEventKind::TestFinished { description: test("b") }),
        event(60, ListenerEventKind::TestIgnored { description: test("c") }),
        event(70, ListenerEventKind::RunFinished),
    ] {
        listener.handle_event(event);
    }

    let report = listener.last_report().expect("run was dispatched");
    assert!(report.save.is_success(), "{:?}", report.save);
    assert!(report.publish.is_success(), "{:?}", report.publish);

    let runs = published.0.lock().unwrap().clone();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.project_api_id.as_deref(), Some("calc"));
    assert_eq!(run.project_version.as_deref(), Some("1.2.0"));
    assert_eq!(run.duration, Duration::from_millis(70));

    let [a, b] = &run.results[..] else {
        panic!("expected two results, got {:?}", run.results);
    };
    assert_eq!(a.name, "Calculator Test: A");
    assert!(a.passed && a.active);
    assert_eq!(a.category, "unit");
    assert_eq!(a.duration, Duration::from_millis(50));

    assert!(!b.passed && b.active);
    assert_eq!(b.duration, Duration::from_millis(10));
    assert_eq!(
        b.message.as_deref(),
        Some(
            "Failure message: expected true\n\n\
             calc::AssertionError: expected true\n\
             \tat calc::assert.check(assert.rs:3)\n\
             \tat calc::CalculatorTest.b(calc.rs:20)\n\
             \t...\n"
        )
    );

    // The saved copy matches what was published.
    let saved_path = dir
        .path()
        .join("runs/calc/run-20240501T100000.000+0200.json");
    let saved: TestRun =
        serde_json::from_str(&std::fs::read_to_string(&saved_path).unwrap()).unwrap();
    assert_eq!(&saved, run);
}

#[test]
fn metadata_flows_into_results() {
    init_tracing();
    let dir = Utf8TempDir::new().unwrap();
    let mut config = config_file(dir.path());
    config.set_publish(false).set_save(false).add_tags(["nightly"]);

    let mut lookup = StaticMetadataLookup::new();
    let mut class = MetadataOverride::new();
    class.set_category("integration").add_tags(["db"]);
    lookup.add_class(TEST_TYPE, class);
    let mut method = MetadataOverride::new();
    method
        .set_key("calc-div")
        .set_name("Division by zero is rejected")
        .add_tickets(["CALC-7"])
        .set_active(false);
    lookup.add_method(TEST_TYPE, "divides", method);

    let mut listener =
        ListenerBuilder::new().build(&config, Box::new(lookup), SinkDispatcher::new(&config));

    // Every parameterized instance shares the method's metadata.
    let resolved = listener.resolve_metadata(&test("divides[0, 1]"));
    assert_eq!(resolved.key.as_deref(), Some("calc-div"));
    assert_eq!(resolved.name, "Division by zero is rejected");
    assert_eq!(resolved.category, "integration");
    assert_eq!(
        resolved.tags.iter().map(String::as_str).collect::<Vec<_>>(),
        ["db", "nightly"]
    );
    assert_eq!(resolved.active, Some(false));

    listener.handle_event(event(0, ListenerEventKind::RunStarted));
    listener.handle_event(event(0, ListenerEventKind::TestStarted {
        description: test("divides"),
    }));
    listener.handle_event(event(5, ListenerEventKind::TestFinished {
        description: test("divides"),
    }));

    let result = listener
        .accumulator()
        .expect("run in progress")
        .results()
        .next()
        .expect("one result")
        .clone();
    assert!(result.passed);
    assert!(!result.active, "method override marks the test inactive");

    listener.handle_event(event(6, ListenerEventKind::RunFinished));
    let report = listener.last_report().expect("run was dispatched");
    assert!(matches!(report.save, SinkOutcome::Disabled));
    assert!(matches!(report.publish, SinkOutcome::Disabled));
}

#[test]
fn assumption_failure_and_incomplete_tests() {
    init_tracing();
    let dir = Utf8TempDir::new().unwrap();
    let config = config_file(dir.path());
    let published = CapturingPublisher::default();
    let mut dispatcher = SinkDispatcher::new(&config);
    dispatcher.set_publisher(published.clone());
    let mut listener = ListenerBuilder::new().build(&config, Box::new(NoMetadata), dispatcher);

    listener.handle_event(event(0, ListenerEventKind::RunStarted));
    listener.handle_event(event(0, ListenerEventKind::TestStarted { description: test("d") }));
    listener.handle_event(event(1, ListenerEventKind::TestAssumptionFailed {
        description: test("d"),
    }));
    listener.handle_event(event(2, ListenerEventKind::TestFinished { description: test("d") }));
    listener.handle_event(event(2, ListenerEventKind::TestStarted { description: test("e") }));
    listener.handle_event(event(9, ListenerEventKind::RunFinished));

    let runs = published.0.lock().unwrap().clone();
    let [d] = &runs[0].results[..] else {
        panic!("expected one result, got {:?}", runs[0].results);
    };
    assert!(d.passed);
    assert!(!d.active);

    // No store was attached even though saving is enabled.
    let report = listener.last_report().expect("run was dispatched");
    assert!(matches!(report.save, SinkOutcome::Skipped(_)));
    assert!(report.publish.is_success());
}

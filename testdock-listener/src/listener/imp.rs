// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    FailureRenderer, ListenerEvent, ListenerEventKind, RunAccumulator, TestDescription, TestInfo,
};
use crate::{
    config::ListenerConfig,
    fingerprint::fingerprint,
    metadata::{
        MetadataExtractor, MetadataLookup, MetadataResolver, ResolvedMetadata,
        StandardMetadataExtractor,
    },
    sink::{DispatchReport, SinkDispatcher},
};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Builds a [`ResultListener`].
pub struct ListenerBuilder<'cfg> {
    fallback_category: Option<&'cfg str>,
    full_stack_traces: Option<bool>,
    extractors: Vec<Box<dyn MetadataExtractor + 'cfg>>,
}

impl<'cfg> ListenerBuilder<'cfg> {
    /// Creates a new builder with the standard metadata extractor registered.
    pub fn new() -> Self {
        Self {
            fallback_category: None,
            full_stack_traces: None,
            extractors: vec![Box::new(StandardMetadataExtractor)],
        }
    }

    /// Sets the category used when neither overrides nor the configuration supply one.
    pub fn set_fallback_category(&mut self, category: &'cfg str) -> &mut Self {
        self.fallback_category = Some(category);
        self
    }

    /// Overrides the configured `full-stack-traces` setting.
    pub fn set_full_stack_traces(&mut self, full_stack_traces: bool) -> &mut Self {
        self.full_stack_traces = Some(full_stack_traces);
        self
    }

    /// Registers an additional metadata extractor. Extractors run in registration order.
    pub fn add_extractor(&mut self, extractor: impl MetadataExtractor + 'cfg) -> &mut Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Creates the listener.
    pub fn build(
        self,
        config: &'cfg ListenerConfig,
        lookup: Box<dyn MetadataLookup + 'cfg>,
        dispatcher: SinkDispatcher<'cfg>,
    ) -> ResultListener<'cfg> {
        let full_stack_traces = self
            .full_stack_traces
            .unwrap_or_else(|| config.full_stack_traces());
        ResultListener {
            config,
            resolver: MetadataResolver::new(config, self.fallback_category),
            renderer: FailureRenderer::new(full_stack_traces),
            lookup,
            extractors: self.extractors,
            dispatcher,
            accumulator: None,
            last_report: None,
        }
    }
}

impl Default for ListenerBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives events from the host framework and reports one run per `RunStarted`/`RunFinished`
/// pair.
///
/// Event handling never fails: unexpected sequences are tolerated, and sink errors are logged.
pub struct ResultListener<'cfg> {
    config: &'cfg ListenerConfig,
    resolver: MetadataResolver<'cfg>,
    renderer: FailureRenderer,
    lookup: Box<dyn MetadataLookup + 'cfg>,
    extractors: Vec<Box<dyn MetadataExtractor + 'cfg>>,
    dispatcher: SinkDispatcher<'cfg>,
    accumulator: Option<RunAccumulator>,
    last_report: Option<DispatchReport>,
}

impl<'cfg> ResultListener<'cfg> {
    /// Handles an event from the host framework.
    pub fn handle_event(&mut self, event: ListenerEvent) {
        if self.config.disabled() {
            return;
        }

        let timestamp = event.timestamp;
        match event.kind {
            ListenerEventKind::RunStarted => {
                if self.accumulator.is_some() {
                    warn!("run started while another run was in progress, discarding it");
                }
                self.accumulator = Some(RunAccumulator::new(timestamp));
            }
            ListenerEventKind::TestStarted { description } => {
                let test = self.test_info(description);
                for extractor in &mut self.extractors {
                    extractor.before(&test.description);
                }
                self.accumulator_mut(timestamp)
                    .test_started(&test, timestamp);
            }
            ListenerEventKind::TestFinished { description } => {
                let test = self.test_info(description);
                let data = self.after(&test.description);
                self.accumulator_mut(timestamp)
                    .test_finished(&test, data, timestamp);
            }
            ListenerEventKind::TestFailed {
                description,
                failure,
            } => {
                let test = self.test_info(description);
                let message = self.renderer.render(&test.description, &failure);
                let data = self.after(&test.description);
                self.accumulator_mut(timestamp)
                    .test_failed(&test, message, data, timestamp);
            }
            ListenerEventKind::TestAssumptionFailed { description } => {
                let test = self.test_info(description);
                self.accumulator_mut(timestamp)
                    .assumption_failed(&test.fingerprint);
            }
            ListenerEventKind::TestIgnored { description } => {
                let test = self.test_info(description);
                self.accumulator_mut(timestamp).test_ignored(&test.fingerprint);
            }
            ListenerEventKind::RunFinished => {
                let Some(accumulator) = self.accumulator.take() else {
                    warn!("run finished without a matching run start, ignoring");
                    return;
                };
                match accumulator.finish(self.config, timestamp) {
                    Some(run) => {
                        debug!(
                            "run finished: {} passed, {} failed, {} inactive",
                            run.passed_count(),
                            run.failed_count(),
                            run.inactive_count(),
                        );
                        self.last_report = Some(self.dispatcher.dispatch(&run));
                    }
                    None => {
                        self.last_report = None;
                    }
                }
            }
        }
    }

    /// Sets whether failure messages include full stack traces.
    pub fn set_full_stack_traces(&mut self, full_stack_traces: bool) -> &mut Self {
        self.renderer = FailureRenderer::new(full_stack_traces);
        self
    }

    /// Resolves the effective metadata for a test, as it would appear on its result.
    pub fn resolve_metadata(&self, description: &TestDescription) -> ResolvedMetadata {
        let identity = &description.identity;
        let method = self.lookup.method_override(identity);
        let class = self.lookup.class_override(identity);
        self.resolver
            .resolve(identity, method.as_ref(), class.as_ref())
    }

    /// Returns the accumulator for the run in progress, if any.
    pub fn accumulator(&self) -> Option<&RunAccumulator> {
        self.accumulator.as_ref()
    }

    /// Returns the sink outcomes for the most recently finished run, if it produced any results.
    pub fn last_report(&self) -> Option<&DispatchReport> {
        self.last_report.as_ref()
    }

    // ---
    // Helper methods
    // ---

    fn test_info(&self, description: TestDescription) -> TestInfo {
        let metadata = self.resolve_metadata(&description);
        TestInfo {
            fingerprint: fingerprint(&description.identity, metadata.key.as_deref()),
            description,
            metadata,
        }
    }

    fn after(&mut self, description: &TestDescription) -> IndexMap<String, String> {
        let mut data = IndexMap::new();
        for extractor in &mut self.extractors {
            extractor.after(description);
            data.extend(extractor.extract(description));
        }
        data
    }

    fn accumulator_mut(&mut self, timestamp: DateTime<FixedOffset>) -> &mut RunAccumulator {
        self.accumulator.get_or_insert_with(|| {
            warn!("test event received outside a run, starting one implicitly");
            RunAccumulator::new(timestamp)
        })
    }
}

/// A [`ResultListener`] that may be shared between threads.
///
/// Hosts that deliver events from several threads must route them through this wrapper: every
/// event is handled under a single lock, so per-test state is never updated concurrently.
pub struct SharedListener<'cfg> {
    inner: Mutex<ResultListener<'cfg>>,
}

impl<'cfg> SharedListener<'cfg> {
    /// Wraps a listener.
    pub fn new(listener: ResultListener<'cfg>) -> Self {
        Self {
            inner: Mutex::new(listener),
        }
    }

    /// Handles an event from the host framework.
    pub fn handle_event(&self, event: ListenerEvent) {
        // A panic in a previous handler leaves the state usable; keep going.
        let mut listener = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listener.handle_event(event);
    }

    /// Returns the wrapped listener.
    pub fn into_inner(self) -> ResultListener<'cfg> {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::{PublishRunError, SaveRunError},
        listener::FailureDetail,
        metadata::{NoMetadata, StaticMetadataLookup},
        sink::{RunPublisher, RunStore, SinkOutcome},
    };
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex as StdMutex};
    use testdock_metadata::{MetadataOverride, TestIdentity, TestRun};

    #[derive(Clone, Default)]
    struct Captured(Arc<StdMutex<Vec<TestRun>>>);

    impl Captured {
        fn runs(&self) -> Vec<TestRun> {
            self.0.lock().unwrap().clone()
        }
    }

    impl RunStore for Captured {
        fn save(&mut self, run: &TestRun) -> Result<(), SaveRunError> {
            self.0.lock().unwrap().push(run.clone());
            Ok(())
        }
    }

    impl RunPublisher for Captured {
        fn send(&mut self, run: &TestRun) -> Result<(), PublishRunError> {
            self.0.lock().unwrap().push(run.clone());
            Ok(())
        }
    }

    fn config() -> ListenerConfig {
        let mut config = ListenerConfig::default();
        config.set_save(true).set_project_api_id("p1");
        config
    }

    fn at(millis: i64) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap() + TimeDelta::milliseconds(millis)
    }

    fn test(method: &str) -> TestDescription {
        TestDescription::test(TestIdentity::new("calc", "calc::CalculatorTest", method))
    }

    fn listener<'cfg>(
        config: &'cfg ListenerConfig,
        lookup: Box<dyn MetadataLookup + 'cfg>,
        captured: &Captured,
    ) -> ResultListener<'cfg> {
        let mut dispatcher = SinkDispatcher::new(config);
        dispatcher.set_store(captured.clone());
        ListenerBuilder::new().build(config, lookup, dispatcher)
    }

    fn event(millis: i64, kind: ListenerEventKind) -> ListenerEvent {
        ListenerEvent::at(at(millis), kind)
    }

    #[test]
    fn failed_test_carries_rendered_message_and_data() {
        let config = config();
        let captured = Captured::default();
        let mut listener = listener(&config, Box::new(NoMetadata), &captured);

        listener.handle_event(event(0, ListenerEventKind::RunStarted));
        listener.handle_event(event(0, ListenerEventKind::TestStarted { description: test("b") }));
        listener.handle_event(event(
            10,
            ListenerEventKind::TestFailed {
                description: test("b"),
                failure: FailureDetail::with_message("expected true"),
            },
        ));
        listener.handle_event(event(10, ListenerEventKind::TestFinished { description: test("b") }));
        listener.handle_event(event(20, ListenerEventKind::RunFinished));

        let runs = captured.runs();
        assert_eq!(runs.len(), 1);
        let result = &runs[0].results[0];
        assert!(!result.passed);
        assert_eq!(result.message.as_deref(), Some("Failure message: expected true"));
        assert_eq!(result.data["test.method"], "b");
        assert!(listener.accumulator().is_none());
        assert!(matches!(
            listener.last_report().map(|r| &r.save),
            Some(SinkOutcome::Succeeded)
        ));
    }

    #[test]
    fn method_key_drives_fingerprint() {
        let config = config();
        let captured = Captured::default();
        let mut lookup = StaticMetadataLookup::new();
        let mut keyed = MetadataOverride::new();
        keyed.set_key("calc-001");
        lookup.add_method("calc::CalculatorTest", "a", keyed);
        let mut listener = listener(&config, Box::new(lookup), &captured);

        listener.handle_event(event(0, ListenerEventKind::RunStarted));
        listener.handle_event(event(0, ListenerEventKind::TestStarted { description: test("a") }));
        listener.handle_event(event(5, ListenerEventKind::TestFinished { description: test("a") }));
        listener.handle_event(event(6, ListenerEventKind::RunFinished));

        let result = &captured.runs()[0].results[0];
        assert_eq!(result.key.as_deref(), Some("calc-001"));
        assert_eq!(
            result.fingerprint,
            fingerprint(&TestIdentity::new("other", "other::Type", "other"), Some("calc-001"))
        );
    }

    #[test]
    fn disabled_listener_is_a_no_op() {
        let mut config = config();
        config.set_disabled(true);
        let captured = Captured::default();
        let mut listener = listener(&config, Box::new(NoMetadata), &captured);

        listener.handle_event(event(0, ListenerEventKind::RunStarted));
        listener.handle_event(event(0, ListenerEventKind::TestStarted { description: test("a") }));
        listener.handle_event(event(5, ListenerEventKind::TestFinished { description: test("a") }));
        assert!(listener.accumulator().is_none());
        listener.handle_event(event(6, ListenerEventKind::RunFinished));
        assert!(captured.runs().is_empty());
        assert!(listener.last_report().is_none());
    }

    #[test]
    fn empty_run_is_not_dispatched() {
        let config = config();
        let captured = Captured::default();
        let mut listener = listener(&config, Box::new(NoMetadata), &captured);

        listener.handle_event(event(0, ListenerEventKind::RunStarted));
        listener.handle_event(event(1, ListenerEventKind::TestIgnored { description: test("c") }));
        listener.handle_event(event(2, ListenerEventKind::RunFinished));
        assert!(captured.runs().is_empty());
        assert!(listener.last_report().is_none());
    }

    #[derive(Default)]
    struct Counting {
        before: usize,
        after: usize,
    }

    impl MetadataExtractor for Counting {
        fn before(&mut self, _description: &TestDescription) {
            self.before += 1;
        }

        fn after(&mut self, _description: &TestDescription) {
            self.after += 1;
        }

        fn extract(&self, _description: &TestDescription) -> IndexMap<String, String> {
            IndexMap::from([
                ("calls".to_owned(), format!("{}/{}", self.before, self.after)),
                ("test.method".to_owned(), "overridden".to_owned()),
            ])
        }
    }

    #[test]
    fn extractors_run_in_order() {
        let config = config();
        let captured = Captured::default();
        let mut dispatcher = SinkDispatcher::new(&config);
        dispatcher.set_store(captured.clone());
        let mut builder = ListenerBuilder::new();
        builder.add_extractor(Counting::default());
        let mut listener = builder.build(&config, Box::new(NoMetadata), dispatcher);

        listener.handle_event(event(0, ListenerEventKind::RunStarted));
        listener.handle_event(event(0, ListenerEventKind::TestStarted { description: test("a") }));
        listener.handle_event(event(5, ListenerEventKind::TestFinished { description: test("a") }));
        listener.handle_event(event(6, ListenerEventKind::RunFinished));

        let data = &captured.runs()[0].results[0].data;
        assert_eq!(data["calls"], "1/1");
        // Later extractors win on collisions.
        assert_eq!(data["test.method"], "overridden");
        assert_eq!(data["test.type"], "calc::CalculatorTest");
    }

    #[test]
    fn fallback_category_applies() {
        let config = config();
        let mut builder = ListenerBuilder::new();
        builder.set_fallback_category("integration");
        let listener = builder.build(&config, Box::new(NoMetadata), SinkDispatcher::new(&config));
        assert_eq!(listener.resolve_metadata(&test("a")).category, "integration");
    }

    #[test]
    fn shared_listener_from_threads() {
        let config = config();
        let captured = Captured::default();
        let shared = SharedListener::new(listener(&config, Box::new(NoMetadata), &captured));

        shared.handle_event(event(0, ListenerEventKind::RunStarted));
        std::thread::scope(|scope| {
            for n in 0..8 {
                let shared = &shared;
                scope.spawn(move || {
                    let description = test(&format!("t{n}"));
                    shared.handle_event(event(0, ListenerEventKind::TestStarted {
                        description: description.clone(),
                    }));
                    shared.handle_event(event(n, ListenerEventKind::TestFinished { description }));
                });
            }
        });
        shared.handle_event(event(100, ListenerEventKind::RunFinished));

        let runs = captured.runs();
        assert_eq!(runs[0].results.len(), 8);
        assert!(shared.into_inner().accumulator().is_none());
    }
}

// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FileStore, HttpPublisher, RunPublisher, RunStore};
use crate::{
    config::ListenerConfig,
    errors::{DisplayErrorChain, PublishRunError, SaveRunError, SinkConfigError, SinkKind},
};
use testdock_metadata::TestRun;
use tracing::{debug, warn};

/// What happened when a run was handed to one sink.
#[derive(Debug)]
pub enum SinkOutcome<E> {
    /// The sink is not enabled in the configuration.
    Disabled,

    /// The sink is enabled, but the configuration does not allow it to run.
    Skipped(SinkConfigError),

    /// The run was handed off successfully.
    Succeeded,

    /// The sink failed. The error has been logged.
    Failed(E),
}

impl<E> SinkOutcome<E> {
    /// Returns true if the sink succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// The outcomes of dispatching one run.
#[derive(Debug)]
pub struct DispatchReport {
    /// The outcome of saving the run.
    pub save: SinkOutcome<SaveRunError>,

    /// The outcome of publishing the run.
    pub publish: SinkOutcome<PublishRunError>,
}

/// Hands finished runs to the enabled sinks.
///
/// Sinks are attempted in a fixed order (save, then publish), independently of each other.
/// Errors are logged and reported, never returned.
pub struct SinkDispatcher<'cfg> {
    config: &'cfg ListenerConfig,
    store: Option<Box<dyn RunStore + 'cfg>>,
    publisher: Option<Box<dyn RunPublisher + 'cfg>>,
}

impl<'cfg> SinkDispatcher<'cfg> {
    /// Creates a dispatcher with no sinks attached.
    pub fn new(config: &'cfg ListenerConfig) -> Self {
        Self {
            config,
            store: None,
            publisher: None,
        }
    }

    /// Creates a dispatcher with the sinks described by the configuration: a [`FileStore`] under
    /// `store.dir`, and an [`HttpPublisher`] if `server.url` is set.
    pub fn from_config(config: &'cfg ListenerConfig) -> Self {
        let mut dispatcher = Self::new(config);
        dispatcher.set_store(FileStore::new(config.store().dir()));
        if let Some(url) = config.server().url() {
            dispatcher.set_publisher(HttpPublisher::new(
                url,
                config.server().api_token(),
                config.server().timeout(),
            ));
        }
        dispatcher
    }

    /// Sets the store used for saving runs.
    pub fn set_store(&mut self, store: impl RunStore + 'cfg) -> &mut Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Sets the publisher used for sending runs.
    pub fn set_publisher(&mut self, publisher: impl RunPublisher + 'cfg) -> &mut Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    /// Hands a run to every enabled sink.
    pub fn dispatch(&mut self, run: &TestRun) -> DispatchReport {
        let save = if self.config.save() {
            match self.check(SinkKind::Save, self.store.is_some()) {
                Ok(()) => self.save(run),
                Err(error) => skipped(error),
            }
        } else {
            debug!("saving is disabled");
            SinkOutcome::Disabled
        };

        let publish = if self.config.publish() {
            match self.check(SinkKind::Publish, self.publisher.is_some()) {
                Ok(()) => self.publish(run),
                Err(error) => skipped(error),
            }
        } else {
            debug!("publishing is disabled");
            SinkOutcome::Disabled
        };

        DispatchReport { save, publish }
    }

    // ---
    // Helper methods
    // ---

    fn check(&self, sink: SinkKind, attached: bool) -> Result<(), SinkConfigError> {
        if self.config.project().api_id().is_none() {
            return Err(SinkConfigError::MissingProjectApiId { sink });
        }
        if !attached {
            return Err(SinkConfigError::NotConfigured { sink });
        }
        Ok(())
    }

    fn save(&mut self, run: &TestRun) -> SinkOutcome<SaveRunError> {
        let Some(store) = &mut self.store else {
            return skipped(SinkConfigError::NotConfigured {
                sink: SinkKind::Save,
            });
        };
        match store.save(run) {
            Ok(()) => SinkOutcome::Succeeded,
            Err(error) => {
                warn!("{}", DisplayErrorChain::new(&error));
                SinkOutcome::Failed(error)
            }
        }
    }

    fn publish(&mut self, run: &TestRun) -> SinkOutcome<PublishRunError> {
        let Some(publisher) = &mut self.publisher else {
            return skipped(SinkConfigError::NotConfigured {
                sink: SinkKind::Publish,
            });
        };
        match publisher.send(run) {
            Ok(()) => SinkOutcome::Succeeded,
            Err(error) => {
                warn!("{}", DisplayErrorChain::new(&error));
                SinkOutcome::Failed(error)
            }
        }
    }
}

fn skipped<E>(error: SinkConfigError) -> SinkOutcome<E> {
    warn!("{error}, skipping");
    SinkOutcome::Skipped(error)
}

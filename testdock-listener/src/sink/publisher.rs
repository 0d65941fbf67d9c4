// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunPublisher;
use crate::errors::PublishRunError;
use std::time::Duration;
use testdock_metadata::TestRun;
use tracing::{debug, info};
use ureq::Agent;

/// Publishes runs by POSTing them as JSON to a server.
pub struct HttpPublisher {
    agent: Agent,
    url: String,
    api_token: Option<String>,
}

impl HttpPublisher {
    /// Creates a publisher sending runs to `url`, giving up on a request after `timeout`.
    pub fn new(url: impl Into<String>, api_token: Option<&str>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(true)
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
            api_token: api_token.map(str::to_owned),
        }
    }

    /// Returns the URL runs are sent to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RunPublisher for HttpPublisher {
    fn send(&mut self, run: &TestRun) -> Result<(), PublishRunError> {
        let body = serde_json::to_vec(run).map_err(PublishRunError::Serialize)?;
        debug!("publishing {} bytes to `{}`", body.len(), self.url);

        let mut request = self
            .agent
            .post(self.url.as_str())
            .header("Content-Type", "application/json");
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        match request.send(&body[..]) {
            Ok(_) => {
                info!("published test run with {} results to `{}`", run.results.len(), self.url);
                Ok(())
            }
            Err(ureq::Error::StatusCode(status)) => Err(PublishRunError::Status {
                url: self.url.clone(),
                status,
            }),
            Err(error) => Err(PublishRunError::Request {
                url: self.url.clone(),
                error: Box::new(error),
            }),
        }
    }
}

impl std::fmt::Debug for HttpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPublisher")
            .field("url", &self.url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

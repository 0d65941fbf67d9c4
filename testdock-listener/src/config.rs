// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the listener.
//!
//! The configuration is read once, before a run starts, and is immutable afterwards. Components
//! receive it by reference; nothing reads it through global state.

use crate::errors::ConfigReadError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Process-wide listener configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListenerConfig {
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    publish: bool,
    #[serde(default)]
    save: bool,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    tickets: BTreeSet<String>,
    #[serde(default)]
    implicit_unit_tag: bool,
    #[serde(default = "default_true")]
    full_stack_traces: bool,
    #[serde(default)]
    pipeline: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    project: ProjectConfig,
    #[serde(default)]
    server: ServerConfig,
    store: StoreConfig,
}

fn default_true() -> bool {
    true
}

impl ListenerConfig {
    /// The location of the repository config, relative to the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/testdock.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not present from `.config/testdock.toml` in
    /// the given workspace root.
    ///
    /// If no file is specified and the workspace root has no config, the default config is used.
    /// A relative store directory is resolved against the workspace root.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        workspace_root: &Utf8Path,
    ) -> Result<Self, ConfigReadError> {
        let (file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(file.as_str(), FileFormat::Toml).required(false);
                (file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let mut config = Self::build_and_deserialize(&builder, file.as_str())?;
        if config.store.dir.is_relative() {
            config.store.dir = workspace_root.join(&config.store.dir);
        }
        Ok(config)
    }

    /// Reads the config from a TOML string, layered on top of the default config.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigReadError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build_and_deserialize(&builder, "<string>")
    }

    /// Returns true if the listener should do nothing at all.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Returns true if finished runs should be published.
    pub fn publish(&self) -> bool {
        self.publish
    }

    /// Returns true if finished runs should be saved locally.
    pub fn save(&self) -> bool {
        self.save
    }

    /// Returns the default category, if one is configured and non-empty.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|category| !category.is_empty())
    }

    /// Returns the tags added to every test.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the tickets added to every test.
    pub fn tickets(&self) -> &BTreeSet<String> {
        &self.tickets
    }

    /// Returns true if the implicit `unit` tag is added to every test.
    pub fn implicit_unit_tag(&self) -> bool {
        self.implicit_unit_tag
    }

    /// Returns true if failures are rendered with full stack traces.
    pub fn full_stack_traces(&self) -> bool {
        self.full_stack_traces
    }

    /// Returns the pipeline label.
    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }

    /// Returns the stage label.
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Returns the project configuration.
    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// Returns the server configuration.
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Returns the local store configuration.
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Sets whether the listener is disabled.
    pub fn set_disabled(&mut self, disabled: bool) -> &mut Self {
        self.disabled = disabled;
        self
    }

    /// Sets whether finished runs are published.
    pub fn set_publish(&mut self, publish: bool) -> &mut Self {
        self.publish = publish;
        self
    }

    /// Sets whether finished runs are saved.
    pub fn set_save(&mut self, save: bool) -> &mut Self {
        self.save = save;
        self
    }

    /// Sets the default category.
    pub fn set_category(&mut self, category: impl Into<String>) -> &mut Self {
        self.category = Some(category.into());
        self
    }

    /// Adds tags applied to every test.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds tickets applied to every test.
    pub fn add_tickets(&mut self, tickets: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.tickets.extend(tickets.into_iter().map(Into::into));
        self
    }

    /// Sets whether the implicit `unit` tag is added to every test.
    pub fn set_implicit_unit_tag(&mut self, implicit_unit_tag: bool) -> &mut Self {
        self.implicit_unit_tag = implicit_unit_tag;
        self
    }

    /// Sets whether failures are rendered with full stack traces.
    pub fn set_full_stack_traces(&mut self, full_stack_traces: bool) -> &mut Self {
        self.full_stack_traces = full_stack_traces;
        self
    }

    /// Sets the project API identifier.
    pub fn set_project_api_id(&mut self, api_id: impl Into<String>) -> &mut Self {
        self.project.api_id = Some(api_id.into());
        self
    }

    /// Sets the project version.
    pub fn set_project_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.project.version = Some(version.into());
        self
    }

    /// Sets the pipeline label.
    pub fn set_pipeline(&mut self, pipeline: impl Into<String>) -> &mut Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    /// Sets the stage label.
    pub fn set_stage(&mut self, stage: impl Into<String>) -> &mut Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the URL runs are published to.
    pub fn set_server_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.server.url = Some(url.into());
        self
    }

    /// Sets the directory runs are saved to.
    pub fn set_store_dir(&mut self, dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.store.dir = dir.into();
        self
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize(
        builder: &ConfigBuilder<DefaultState>,
        source_name: &str,
    ) -> Result<Self, ConfigReadError> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigReadError::new(source_name, error))?;

        let mut unknown = BTreeSet::new();
        let config: Self = serde_ignored::deserialize(config, |path: serde_ignored::Path| {
            unknown.insert(path.to_string());
        })
        .map_err(|error| ConfigReadError::new(source_name, error))?;

        if !unknown.is_empty() {
            let keys: Vec<_> = unknown.into_iter().collect();
            warn!(
                "in config {source_name}, ignoring unknown configuration keys: {}",
                keys.join(", "),
            );
        }

        Ok(config)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::from_toml_str("").expect("default config should be valid")
    }
}

/// Identifies the project that runs belong to.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default)]
    api_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl ProjectConfig {
    /// Returns the project API identifier, if set and non-empty.
    pub fn api_id(&self) -> Option<&str> {
        self.api_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the project version.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Where finished runs are published to.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    api_token: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_token: None,
            timeout: default_timeout(),
        }
    }
}

impl ServerConfig {
    /// Returns the URL runs are POSTed to.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    /// Returns the API token sent with each request.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    /// Returns the timeout for a single publish request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Where finished runs are saved to.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    dir: Utf8PathBuf,
}

impl StoreConfig {
    /// Returns the directory runs are saved under.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

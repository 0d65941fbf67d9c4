// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunStore;
use crate::errors::SaveRunError;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use testdock_metadata::TestRun;
use tracing::info;

/// The directory used for runs that have no project API identifier.
const NO_PROJECT_DIR: &str = "no-project";

/// Saves runs as pretty-printed JSON files under a directory.
///
/// Each run is written to `<dir>/<project-api-id>/run-<start time>.json`. Files are written
/// atomically, so readers never observe a partially written run.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: Utf8PathBuf,
}

impl FileStore {
    /// Creates a store rooted at the given directory. The directory is created on first save.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the root directory of this store.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the path a run is saved to.
    pub fn run_path(&self, run: &TestRun) -> Utf8PathBuf {
        let project = run.project_api_id.as_deref().unwrap_or(NO_PROJECT_DIR);
        let file_name = format!(
            "run-{}.json",
            run.context.started_at.format("%Y%m%dT%H%M%S%.3f%z")
        );
        self.dir.join(project).join(file_name)
    }
}

impl RunStore for FileStore {
    fn save(&mut self, run: &TestRun) -> Result<(), SaveRunError> {
        let path = self.run_path(run);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| SaveRunError::CreateDir {
                path: parent.to_owned(),
                error,
            })?;
        }

        let json = serde_json::to_string_pretty(run).map_err(|error| SaveRunError::Serialize {
            path: path.clone(),
            error,
        })?;

        atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| SaveRunError::Write {
                path: path.clone(),
                error: match error {
                    atomicwrites::Error::Internal(error) | atomicwrites::Error::User(error) => error,
                },
            })?;

        info!("saved test run with {} results to `{path}`", run.results.len());
        Ok(())
    }
}

//! Scoped working directory for one reconciliation pass.
//!
//! The engine exchanges everything through files, so each pass gets a fresh
//! temporary directory holding the cluster document and any carried state.
//! The directory is removed when the workspace is dropped, which covers
//! every exit path of a pass, including caller-side timeouts that unwind
//! through it. A removal failure is logged and never masks the outcome of
//! the pass itself.

use std::{
    fs,
    io::ErrorKind,
    path::Path,
};

use snafu::{ResultExt, Snafu};
use tempfile::TempDir;

use crate::engine::{CLUSTER_CONFIG_FILE, CLUSTER_STATE_FILE, KUBE_CONFIG_FILE};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create the scoped workspace"))]
    CreateWorkspace { source: std::io::Error },

    #[snafu(display("failed to write {name} into the workspace"))]
    WriteFile {
        name: &'static str,
        source: std::io::Error,
    },

    #[snafu(display("failed to read {name} from the workspace"))]
    ReadFile {
        name: &'static str,
        source: std::io::Error,
    },
}

pub struct ScopedWorkspace {
    // Taken in drop so the removal outcome can be logged.
    dir: Option<TempDir>,
}

impl ScopedWorkspace {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("anchorage-")
            .tempdir()
            .context(CreateWorkspaceSnafu)?;
        tracing::debug!(path = %dir.path().display(), "created scoped workspace");
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .expect("workspace directory lives until drop")
            .path()
    }

    pub fn write_cluster_config(&self, content: &str) -> Result<()> {
        self.write(CLUSTER_CONFIG_FILE, content)
    }

    pub fn write_cluster_state(&self, content: &str) -> Result<()> {
        self.write(CLUSTER_STATE_FILE, content)
    }

    pub fn write_kube_config(&self, content: &str) -> Result<()> {
        self.write(KUBE_CONFIG_FILE, content)
    }

    /// Engine state left behind by the last invocation; `None` when the
    /// engine wrote none, which on read paths means the cluster is absent.
    pub fn read_cluster_state(&self) -> Result<Option<String>> {
        self.read(CLUSTER_STATE_FILE)
    }

    pub fn read_kube_config(&self) -> Result<Option<String>> {
        self.read(KUBE_CONFIG_FILE)
    }

    fn write(&self, name: &'static str, content: &str) -> Result<()> {
        fs::write(self.path().join(name), content).context(WriteFileSnafu { name })
    }

    fn read(&self, name: &'static str) -> Result<Option<String>> {
        match fs::read_to_string(self.path().join(name)) {
            Ok(content) => Ok(Some(content)),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::ReadFile { name, source }),
        }
    }
}

impl Drop for ScopedWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_owned();
            if let Err(error) = dir.close() {
                tracing::warn!(path = %path.display(), %error, "failed to remove scoped workspace");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_round_trip_through_the_workspace() {
        let workspace = ScopedWorkspace::create().expect("workspace creates");
        workspace
            .write_cluster_state("opaque-state-blob")
            .expect("state writes");

        assert_eq!(
            workspace.read_cluster_state().expect("state reads"),
            Some("opaque-state-blob".to_owned())
        );
        assert_eq!(workspace.read_kube_config().expect("absent file reads"), None);
    }

    #[test]
    fn dropping_the_workspace_removes_the_directory() {
        let workspace = ScopedWorkspace::create().expect("workspace creates");
        let path = workspace.path().to_owned();
        workspace
            .write_cluster_config("nodes: []\n")
            .expect("config writes");
        assert!(path.exists());

        drop(workspace);
        assert!(!path.exists());
    }
}
